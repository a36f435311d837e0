//! The pushdown automaton driving grammar-checked codecs.
//!
//! The parser owns a symbol stack over a shared grammar. Codecs call
//! [`Parser::advance`] with the terminal they are about to process; the
//! parser pops and expands symbols until the terminal matches, surfacing
//! any action that needs the codec (union tag reads, default-value
//! decoder swaps, writer-field skips, JSON structure hooks) as a returned
//! [`Advance`] value for the caller to perform before re-entering.
//!
//! When the stack empties, the next advance re-pushes the root production,
//! so one parser instance processes consecutive datums of the same schema.

use std::sync::Arc;

use bytes::Bytes;

use super::symbol::{Grammar, ProdRef, Symbol, Terminal};
use crate::error::CodecError;

/// Outcome of one parser step.
#[derive(Debug)]
pub enum Advance {
    /// The expected terminal (or, for a promotion, the writer's terminal
    /// the codec must read instead) was matched.
    Matched(Terminal),
    /// A writer union tag must be read; pass it to
    /// [`Parser::select_branch`].
    NeedUnionTag,
    /// Start reading from the given pre-encoded default bytes.
    BeginDefault(Bytes),
    /// Return to the live input.
    EndDefault,
    /// Consume the writer data described by this symbol without
    /// surfacing it.
    Skip(Symbol),
    /// A JSON structure hook.
    Hook(Hook),
}

/// Structure hooks surfaced to token codecs.
#[derive(Debug)]
pub enum Hook {
    RecordStart,
    RecordEnd,
    FieldName(Arc<str>),
    UnionEnd,
}

/// Outcome of a [`Parser::field_order`] step.
#[derive(Debug)]
pub enum FieldOrderStep {
    /// The record mark was reached; fields decode in this reader-index
    /// order.
    Ready(Arc<[usize]>),
    /// An action must be performed first.
    Action(Advance),
}

/// Pushdown parser over a compiled grammar.
#[derive(Debug)]
pub struct Parser {
    grammar: Arc<Grammar>,
    stack: Vec<Symbol>,
}

impl Parser {
    pub fn new(grammar: Arc<Grammar>) -> Self {
        Self {
            grammar,
            stack: Vec::new(),
        }
    }

    /// The grammar this parser runs.
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Drop all parsing state; the next advance starts a fresh datum.
    pub fn reset(&mut self) {
        self.stack.clear();
    }

    fn push_production(&mut self, r: ProdRef) {
        // Productions are stored in execution order; push in reverse so
        // the first symbol ends on top.
        let symbols = self.grammar.production(r);
        self.stack.reserve(symbols.len());
        for symbol in symbols.iter().rev() {
            self.stack.push(symbol.clone());
        }
    }

    fn violation(expected: &str, found: &Symbol) -> CodecError {
        CodecError::GrammarViolation(format!(
            "expected {}, but the schema requires {}",
            expected,
            found.describe()
        ))
    }

    /// Pop symbols until `expected` (or a promotion targeting it) is
    /// matched, surfacing codec-facing actions along the way.
    pub fn advance(&mut self, expected: Terminal) -> Result<Advance, CodecError> {
        loop {
            let Some(top) = self.stack.last_mut() else {
                let root = self.grammar.root();
                self.push_production(root);
                continue;
            };
            match top {
                Symbol::Terminal(t) => {
                    if *t == expected {
                        self.stack.pop();
                        return Ok(Advance::Matched(expected));
                    }
                    let found = Symbol::Terminal(*t);
                    return Err(Self::violation(&expected.to_string(), &found));
                }
                Symbol::Promote { from, to } => {
                    if *to == expected {
                        let from = *from;
                        self.stack.pop();
                        return Ok(Advance::Matched(from));
                    }
                    return Err(CodecError::GrammarViolation(format!(
                        "expected {}, but the schema requires a {} promotion",
                        expected, to
                    )));
                }
                Symbol::Indirect(r) => {
                    let r = *r;
                    self.stack.pop();
                    self.push_production(r);
                }
                Symbol::Repeater { count, items, .. } => {
                    if *count > 0 {
                        *count -= 1;
                        let items = *items;
                        self.push_production(items);
                    } else {
                        return Err(CodecError::GrammarViolation(format!(
                            "expected {}, but no items remain in the current block",
                            expected
                        )));
                    }
                }
                Symbol::WriterUnion => {
                    self.stack.pop();
                    return Ok(Advance::NeedUnionTag);
                }
                Symbol::DefaultStart(bytes) => {
                    let bytes = bytes.clone();
                    self.stack.pop();
                    return Ok(Advance::BeginDefault(bytes));
                }
                Symbol::DefaultEnd => {
                    self.stack.pop();
                    return Ok(Advance::EndDefault);
                }
                Symbol::SkipStart => {
                    self.stack.pop();
                    let skipped = self.stack.pop().ok_or_else(|| {
                        CodecError::GrammarViolation(
                            "skip mark with nothing to skip".to_string(),
                        )
                    })?;
                    return Ok(Advance::Skip(skipped));
                }
                // Record annotations are consumed by field_order when the
                // caller wants them and ignored otherwise.
                Symbol::RecordMark | Symbol::FieldOrder(_) => {
                    self.stack.pop();
                }
                Symbol::RecordStart => {
                    self.stack.pop();
                    return Ok(Advance::Hook(Hook::RecordStart));
                }
                Symbol::RecordEnd => {
                    self.stack.pop();
                    return Ok(Advance::Hook(Hook::RecordEnd));
                }
                Symbol::FieldName(name) => {
                    let name = name.clone();
                    self.stack.pop();
                    return Ok(Advance::Hook(Hook::FieldName(name)));
                }
                Symbol::UnionEnd => {
                    self.stack.pop();
                    return Ok(Advance::Hook(Hook::UnionEnd));
                }
                Symbol::Incompatible(message) => {
                    return Err(CodecError::Incompatible(message.to_string()));
                }
                found @ (Symbol::SizeCheck(_)
                | Symbol::Alternative { .. }
                | Symbol::UnionAdjust { .. }
                | Symbol::EnumAdjust { .. }
                | Symbol::EnumLabels { .. }) => {
                    let found = found.clone();
                    return Err(Self::violation(&expected.to_string(), &found));
                }
            }
        }
    }

    /// Process pending symbols that consume no input value: record
    /// annotations, default brackets, and writer-field skips. Returns
    /// `None` once the top of the stack needs a value (or the stack is
    /// empty).
    pub fn process_implicit(&mut self) -> Result<Option<Advance>, CodecError> {
        loop {
            let Some(top) = self.stack.last() else {
                return Ok(None);
            };
            match top {
                Symbol::RecordMark | Symbol::FieldOrder(_) => {
                    self.stack.pop();
                }
                Symbol::Indirect(r) => {
                    let r = *r;
                    self.stack.pop();
                    self.push_production(r);
                }
                Symbol::DefaultStart(bytes) => {
                    let bytes = bytes.clone();
                    self.stack.pop();
                    return Ok(Some(Advance::BeginDefault(bytes)));
                }
                Symbol::DefaultEnd => {
                    self.stack.pop();
                    return Ok(Some(Advance::EndDefault));
                }
                Symbol::SkipStart => {
                    self.stack.pop();
                    let skipped = self.stack.pop().ok_or_else(|| {
                        CodecError::GrammarViolation(
                            "skip mark with nothing to skip".to_string(),
                        )
                    })?;
                    return Ok(Some(Advance::Skip(skipped)));
                }
                Symbol::RecordStart => {
                    self.stack.pop();
                    return Ok(Some(Advance::Hook(Hook::RecordStart)));
                }
                Symbol::RecordEnd => {
                    self.stack.pop();
                    return Ok(Some(Advance::Hook(Hook::RecordEnd)));
                }
                Symbol::FieldName(name) => {
                    let name = name.clone();
                    self.stack.pop();
                    return Ok(Some(Advance::Hook(Hook::FieldName(name))));
                }
                Symbol::UnionEnd => {
                    self.stack.pop();
                    return Ok(Some(Advance::Hook(Hook::UnionEnd)));
                }
                Symbol::Incompatible(message) => {
                    return Err(CodecError::Incompatible(message.to_string()));
                }
                _ => return Ok(None),
            }
        }
    }

    /// Advance to the next record mark and return its field order.
    pub fn field_order(&mut self) -> Result<FieldOrderStep, CodecError> {
        loop {
            let Some(top) = self.stack.last_mut() else {
                let root = self.grammar.root();
                self.push_production(root);
                continue;
            };
            match top {
                Symbol::RecordMark => {
                    self.stack.pop();
                    match self.stack.pop() {
                        Some(Symbol::FieldOrder(order)) => {
                            return Ok(FieldOrderStep::Ready(order));
                        }
                        other => {
                            return Err(CodecError::GrammarViolation(format!(
                                "record mark without field order ({})",
                                other.map(|s| s.describe()).unwrap_or_default()
                            )));
                        }
                    }
                }
                Symbol::Indirect(r) => {
                    let r = *r;
                    self.stack.pop();
                    self.push_production(r);
                }
                Symbol::Repeater { count, items, .. } => {
                    if *count > 0 {
                        *count -= 1;
                        let items = *items;
                        self.push_production(items);
                    } else {
                        return Err(CodecError::GrammarViolation(
                            "field order requested but no items remain".to_string(),
                        ));
                    }
                }
                Symbol::WriterUnion => {
                    self.stack.pop();
                    return Ok(FieldOrderStep::Action(Advance::NeedUnionTag));
                }
                Symbol::DefaultStart(bytes) => {
                    let bytes = bytes.clone();
                    self.stack.pop();
                    return Ok(FieldOrderStep::Action(Advance::BeginDefault(bytes)));
                }
                Symbol::DefaultEnd => {
                    self.stack.pop();
                    return Ok(FieldOrderStep::Action(Advance::EndDefault));
                }
                Symbol::SkipStart => {
                    self.stack.pop();
                    let skipped = self.stack.pop().ok_or_else(|| {
                        CodecError::GrammarViolation(
                            "skip mark with nothing to skip".to_string(),
                        )
                    })?;
                    return Ok(FieldOrderStep::Action(Advance::Skip(skipped)));
                }
                Symbol::Incompatible(message) => {
                    return Err(CodecError::Incompatible(message.to_string()));
                }
                found => {
                    let found = found.clone();
                    return Err(Self::violation("record field order", &found));
                }
            }
        }
    }

    /// Assert that the next symbol is a size check for exactly `n`.
    pub fn assert_size(&mut self, n: usize) -> Result<(), CodecError> {
        match self.stack.pop() {
            Some(Symbol::SizeCheck(m)) if m == n => Ok(()),
            Some(Symbol::SizeCheck(m)) => Err(CodecError::GrammarViolation(format!(
                "fixed size mismatch: schema declares {}, caller used {}",
                m, n
            ))),
            other => Err(CodecError::GrammarViolation(format!(
                "size assertion against {}",
                other.map(|s| s.describe()).unwrap_or_default()
            ))),
        }
    }

    /// Assert that `n` is below the next size check's operand.
    pub fn assert_less_than(&mut self, n: usize) -> Result<(), CodecError> {
        match self.stack.pop() {
            Some(Symbol::SizeCheck(m)) if n < m => Ok(()),
            Some(Symbol::SizeCheck(m)) => Err(CodecError::OutOfRange(format!(
                "ordinal {} out of range ({} allowed)",
                n, m
            ))),
            other => Err(CodecError::GrammarViolation(format!(
                "range assertion against {}",
                other.map(|s| s.describe()).unwrap_or_default()
            ))),
        }
    }

    /// Configure the item count of the repeater on top of the stack.
    pub fn set_repeat_count(&mut self, n: u64) -> Result<(), CodecError> {
        match self.stack.last_mut() {
            Some(Symbol::Repeater { count, .. }) => {
                if *count != 0 {
                    return Err(CodecError::GrammarViolation(format!(
                        "new item count set with {} items outstanding",
                        count
                    )));
                }
                *count = n;
                Ok(())
            }
            other => Err(CodecError::GrammarViolation(format!(
                "not at an item boundary ({})",
                other.map(|s| s.describe()).unwrap_or_default()
            ))),
        }
    }

    /// True when the top of the stack is a repeater.
    pub fn at_repeater(&self) -> bool {
        matches!(self.stack.last(), Some(Symbol::Repeater { .. }))
    }

    /// Pop the repeater ending an array or map; its count must be zero.
    pub fn pop_repeater(&mut self) -> Result<(), CodecError> {
        match self.stack.last() {
            Some(Symbol::Repeater { count: 0, .. }) => {
                self.stack.pop();
                Ok(())
            }
            Some(Symbol::Repeater { count, .. }) => Err(CodecError::GrammarViolation(format!(
                "container closed with {} items outstanding",
                count
            ))),
            other => Err(CodecError::GrammarViolation(format!(
                "container end without an open container ({})",
                other.map(|s| s.describe()).unwrap_or_default()
            ))),
        }
    }

    /// Pop the repeater regardless of its count, returning its item and
    /// skip productions. Used by the skip paths, which consume remaining
    /// items outside the parser stack.
    pub fn take_repeater(&mut self) -> Result<(ProdRef, Option<ProdRef>, bool), CodecError> {
        match self.stack.pop() {
            Some(Symbol::Repeater {
                items,
                skipper,
                is_array,
                ..
            }) => Ok((items, skipper, is_array)),
            other => Err(CodecError::GrammarViolation(format!(
                "skip without an open container ({})",
                other.map(|s| s.describe()).unwrap_or_default()
            ))),
        }
    }

    /// Replace the alternative on top of the stack with its `index`-th
    /// branch.
    pub fn select_branch(&mut self, index: usize) -> Result<(), CodecError> {
        match self.stack.pop() {
            Some(Symbol::Alternative { branches, .. }) => {
                let branch = branches.get(index).copied().ok_or_else(|| {
                    CodecError::OutOfRange(format!(
                        "union branch {} out of range ({} branches)",
                        index,
                        branches.len()
                    ))
                })?;
                self.push_production(branch);
                Ok(())
            }
            other => Err(CodecError::GrammarViolation(format!(
                "branch selection against {}",
                other.map(|s| s.describe()).unwrap_or_default()
            ))),
        }
    }

    /// Branch labels of the alternative on top of the stack, for codecs
    /// that encode branches by name.
    pub fn alternative_labels(&self) -> Result<Arc<[Arc<str>]>, CodecError> {
        match self.stack.last() {
            Some(Symbol::Alternative {
                labels: Some(labels),
                ..
            }) => Ok(labels.clone()),
            other => Err(CodecError::GrammarViolation(format!(
                "branch labels requested from {}",
                other.map(|s| s.describe()).unwrap_or_default()
            ))),
        }
    }

    /// Pop a union adjustment: push its production and return the reader
    /// branch index.
    pub fn union_adjust(&mut self) -> Result<usize, CodecError> {
        match self.stack.pop() {
            Some(Symbol::UnionAdjust { branch, production }) => {
                self.push_production(production);
                Ok(branch)
            }
            other => Err(CodecError::GrammarViolation(format!(
                "union adjustment against {}",
                other.map(|s| s.describe()).unwrap_or_default()
            ))),
        }
    }

    /// Pop an enum adjustment and map a writer ordinal to the reader
    /// ordinal.
    pub fn enum_adjust(&mut self, writer_ordinal: usize) -> Result<usize, CodecError> {
        match self.stack.pop() {
            Some(Symbol::EnumAdjust { mapping }) => mapping
                .get(writer_ordinal)
                .copied()
                .ok_or_else(|| {
                    CodecError::OutOfRange(format!(
                        "enum ordinal {} out of range ({} symbols)",
                        writer_ordinal,
                        mapping.len()
                    ))
                })?
                .ok_or_else(|| {
                    CodecError::Incompatible(format!(
                        "writer enum ordinal {} has no reader symbol",
                        writer_ordinal
                    ))
                }),
            other => Err(CodecError::GrammarViolation(format!(
                "enum adjustment against {}",
                other.map(|s| s.describe()).unwrap_or_default()
            ))),
        }
    }

    /// Pop an enum label table.
    pub fn enum_labels(&mut self) -> Result<Arc<[Arc<str>]>, CodecError> {
        match self.stack.pop() {
            Some(Symbol::EnumLabels { symbols }) => Ok(symbols),
            other => Err(CodecError::GrammarViolation(format!(
                "enum labels requested from {}",
                other.map(|s| s.describe()).unwrap_or_default()
            ))),
        }
    }
}
