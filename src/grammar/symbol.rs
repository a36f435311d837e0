//! Symbols, productions, and the grammar arena.
//!
//! A schema compiles to a set of productions: ordered symbol sequences in
//! execution order (the first symbol is consumed first). Productions live
//! in a per-grammar arena and reference each other through [`ProdRef`]
//! indices, so recursive schemas become index cycles instead of owning
//! cycles. A recursive walk reserves its arena slot before descending and
//! fills it afterwards; any self-reference discovered mid-walk simply
//! records the reserved index.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

/// A terminal symbol: the value kinds an encoder or decoder can ask the
/// grammar to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes,
    Fixed,
    Enum,
    ArrayStart,
    ArrayEnd,
    MapStart,
    MapEnd,
    Union,
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Terminal::Null => "null",
            Terminal::Boolean => "boolean",
            Terminal::Int => "int",
            Terminal::Long => "long",
            Terminal::Float => "float",
            Terminal::Double => "double",
            Terminal::String => "string",
            Terminal::Bytes => "bytes",
            Terminal::Fixed => "fixed",
            Terminal::Enum => "enum",
            Terminal::ArrayStart => "array-start",
            Terminal::ArrayEnd => "array-end",
            Terminal::MapStart => "map-start",
            Terminal::MapEnd => "map-end",
            Terminal::Union => "union",
        };
        f.write_str(name)
    }
}

/// Index of a production inside its grammar's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProdRef(pub(crate) usize);

/// One grammar symbol.
///
/// Terminals are matched against the caller's expectations; everything
/// else is consumed by the parser itself or surfaced to the driving codec
/// as an action.
#[derive(Debug, Clone)]
pub enum Symbol {
    /// A terminal to be matched by `advance`.
    Terminal(Terminal),
    /// Operand for the size assertions that follow `Fixed` and `Enum`
    /// terminals.
    SizeCheck(usize),
    /// Array or map iteration. `items` parses one element; `skipper`, when
    /// present, parses one element of the writer-only encoding and is used
    /// when the element is skipped rather than surfaced. The count is only
    /// meaningful on stacked copies.
    Repeater {
        items: ProdRef,
        skipper: Option<ProdRef>,
        is_array: bool,
        count: u64,
    },
    /// Union branch table; `select_branch` replaces it with one branch.
    /// Labels are carried by the JSON grammar for wrapper objects.
    Alternative {
        branches: Arc<[ProdRef]>,
        labels: Option<Arc<[Arc<str>]>>,
    },
    /// Expands to another production (shared sub-grammars, recursion).
    Indirect(ProdRef),
    /// Numeric widening: the writer encoded `from`, the reader asked for
    /// `to`; the decoder reads with the writer's kind and widens.
    Promote { from: Terminal, to: Terminal },
    /// The writer encoded a union the reader does not see: read the tag
    /// and dispatch to the matching branch.
    WriterUnion,
    /// The reader expects a union but the writer encoded a plain value:
    /// report `branch` and continue with `production`.
    UnionAdjust { branch: usize, production: ProdRef },
    /// Maps writer enum ordinals to reader ordinals; `None` marks a
    /// writer symbol with no reader counterpart.
    EnumAdjust { mapping: Arc<[Option<usize>]> },
    /// Enum symbol names, for codecs that encode enums by name.
    EnumLabels { symbols: Arc<[Arc<str>]> },
    /// The next symbol (or indirect production) covers writer data with
    /// no reader counterpart; consume it without surfacing values.
    SkipStart,
    /// Begin reading from the pre-encoded default bytes instead of the
    /// live input.
    DefaultStart(Bytes),
    /// Return to the live input.
    DefaultEnd,
    /// Reader-index order in which the record's fields will be decoded.
    FieldOrder(Arc<[usize]>),
    /// Marks the start of a resolved record.
    RecordMark,
    /// JSON object hooks emitted around records.
    RecordStart,
    RecordEnd,
    /// JSON field-name hook emitted before each record field.
    FieldName(Arc<str>),
    /// Closes the JSON union wrapper object.
    UnionEnd,
    /// An unresolvable (writer, reader) pair; fails when reached.
    Incompatible(Arc<str>),
}

impl Symbol {
    /// Short description used in grammar violation messages.
    pub fn describe(&self) -> String {
        match self {
            Symbol::Terminal(t) => t.to_string(),
            Symbol::SizeCheck(n) => format!("size-check({})", n),
            Symbol::Repeater { is_array, .. } => {
                if *is_array {
                    "array-items".to_string()
                } else {
                    "map-items".to_string()
                }
            }
            Symbol::Alternative { .. } => "union-branches".to_string(),
            Symbol::Indirect(_) => "subgrammar".to_string(),
            Symbol::Promote { from, to } => format!("{}->{}", from, to),
            Symbol::WriterUnion => "writer-union".to_string(),
            Symbol::UnionAdjust { .. } => "union-adjust".to_string(),
            Symbol::EnumAdjust { .. } => "enum-adjust".to_string(),
            Symbol::EnumLabels { .. } => "enum-labels".to_string(),
            Symbol::SkipStart => "skip".to_string(),
            Symbol::DefaultStart(_) => "default-start".to_string(),
            Symbol::DefaultEnd => "default-end".to_string(),
            Symbol::FieldOrder(_) => "field-order".to_string(),
            Symbol::RecordMark => "record".to_string(),
            Symbol::RecordStart => "record-start".to_string(),
            Symbol::RecordEnd => "record-end".to_string(),
            Symbol::FieldName(n) => format!("field({})", n),
            Symbol::UnionEnd => "union-end".to_string(),
            Symbol::Incompatible(_) => "incompatible".to_string(),
        }
    }
}

/// An ordered symbol sequence in execution order.
pub type Production = Vec<Symbol>;

/// A compiled grammar: the production arena plus its entry points.
#[derive(Debug)]
pub struct Grammar {
    productions: Vec<Production>,
    root: ProdRef,
    /// Writer-only grammar root, present on resolving grammars.
    backup: Option<ProdRef>,
}

impl Grammar {
    pub(crate) fn new(productions: Vec<Production>, root: ProdRef, backup: Option<ProdRef>) -> Self {
        Self {
            productions,
            root,
            backup,
        }
    }

    /// The root production pushed for each datum.
    pub fn root(&self) -> ProdRef {
        self.root
    }

    /// The writer-only root of a resolving grammar.
    pub fn backup(&self) -> Option<ProdRef> {
        self.backup
    }

    /// Resolve a production reference.
    pub fn production(&self, r: ProdRef) -> &[Symbol] {
        &self.productions[r.0]
    }

    /// Number of productions in the arena.
    pub fn len(&self) -> usize {
        self.productions.len()
    }

    /// True when the arena is empty (never the case for built grammars).
    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }
}

/// Arena under construction.
///
/// `reserve` hands out a slot index before a recursive walk; `fill`
/// completes it afterwards. This realizes placeholder patching without a
/// separate fixup traversal.
#[derive(Debug, Default)]
pub(crate) struct GrammarBuilder {
    productions: Vec<Production>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an empty slot to be filled later.
    pub fn reserve(&mut self) -> ProdRef {
        self.productions.push(Vec::new());
        ProdRef(self.productions.len() - 1)
    }

    /// Complete a reserved slot.
    pub fn fill(&mut self, r: ProdRef, production: Production) {
        self.productions[r.0] = production;
    }

    /// Store a finished production and return its reference.
    pub fn intern(&mut self, production: Production) -> ProdRef {
        self.productions.push(production);
        ProdRef(self.productions.len() - 1)
    }

    /// Inspect a stored production.
    pub fn get(&self, r: ProdRef) -> &Production {
        &self.productions[r.0]
    }

    /// Number of productions stored so far.
    pub fn len(&self) -> usize {
        self.productions.len()
    }

    /// Finish the arena.
    pub fn build(self, root: ProdRef, backup: Option<ProdRef>) -> Grammar {
        Grammar::new(self.productions, root, backup)
    }
}
