//! The resolving decoder: reads writer-encoded data with reader-schema
//! semantics.
//!
//! Construction compiles the resolving grammar for the (writer, reader)
//! pair. At decode time the grammar drives everything the reader cannot
//! see in the byte stream: numeric promotions (the decoder reads with the
//! writer's type and widens), skipped writer fields, injected reader
//! defaults (a scratch binary decoder over the pre-encoded default bytes
//! temporarily replaces the live input), enum ordinal remapping, and
//! union adjustment in both directions.

use std::sync::Arc;

use super::binary::BinaryDecoder;
use super::skip::{skip_production, skip_symbol};
use super::Decoder;
use crate::error::{CodecError, SchemaError};
use crate::grammar::{resolving_grammar, Advance, FieldOrderStep, Grammar, Parser, Terminal};
use crate::schema::Schema;

/// Decoder that resolves a writer schema against a reader schema.
pub struct ResolvingDecoder {
    base: Box<dyn Decoder>,
    /// Live decoders saved while reading from default bytes.
    saved: Vec<Box<dyn Decoder>>,
    parser: Parser,
    grammar: Arc<Grammar>,
}

impl ResolvingDecoder {
    /// Build a resolving decoder over `base`, which carries data encoded
    /// under `writer`; reads observe `reader` semantics.
    ///
    /// # Errors
    /// Fails when the schemas cannot be resolved at construction time
    /// (a reader field with neither writer counterpart nor default, or a
    /// malformed default). Branch-level incompatibilities surface later,
    /// at the first read that touches them.
    pub fn new(
        writer: &Arc<Schema>,
        reader: &Arc<Schema>,
        base: Box<dyn Decoder>,
    ) -> Result<Self, SchemaError> {
        let grammar = resolving_grammar(writer, reader)?;
        Ok(Self {
            base,
            saved: Vec::new(),
            parser: Parser::new(Arc::clone(&grammar)),
            grammar,
        })
    }

    /// Reader-index order in which the current record's fields must be
    /// read. Callers read fields in exactly this order.
    pub fn field_order(&mut self) -> Result<Arc<[usize]>, CodecError> {
        loop {
            match self.parser.field_order()? {
                FieldOrderStep::Ready(order) => return Ok(order),
                FieldOrderStep::Action(action) => self.perform(action)?,
            }
        }
    }

    /// Process pending non-value work: trailing default brackets and
    /// writer-field skips. Called between container items and after a
    /// datum completes.
    pub fn drain(&mut self) -> Result<(), CodecError> {
        while let Some(action) = self.parser.process_implicit()? {
            self.perform(action)?;
        }
        Ok(())
    }

    /// Abandon any partially decoded datum: restore the live input and
    /// clear the parser so the next read starts a fresh datum.
    pub fn reset(&mut self) {
        while let Some(live) = self.saved.pop() {
            self.base = live;
        }
        self.parser.reset();
    }

    fn perform(&mut self, action: Advance) -> Result<(), CodecError> {
        match action {
            Advance::NeedUnionTag => {
                let tag = self.base.read_union_index()?;
                self.parser.select_branch(tag)
            }
            Advance::BeginDefault(bytes) => {
                let scratch: Box<dyn Decoder> = Box::new(BinaryDecoder::from_bytes(bytes));
                self.saved.push(std::mem::replace(&mut self.base, scratch));
                Ok(())
            }
            Advance::EndDefault => {
                let live = self.saved.pop().ok_or_else(|| {
                    CodecError::GrammarViolation("default bracket underflow".to_string())
                })?;
                self.base = live;
                Ok(())
            }
            Advance::Skip(symbol) => skip_symbol(&mut *self.base, &self.grammar, &symbol),
            Advance::Matched(t) => Err(CodecError::GrammarViolation(format!(
                "unconsumed {} while resolving",
                t
            ))),
            Advance::Hook(hook) => Err(CodecError::GrammarViolation(format!(
                "unexpected structure hook {:?} while resolving",
                hook
            ))),
        }
    }

    /// Advance to `expected`, performing grammar actions; returns the
    /// terminal to actually read from the writer data (differing from
    /// `expected` exactly when a promotion applies).
    fn advance(&mut self, expected: Terminal) -> Result<Terminal, CodecError> {
        loop {
            match self.parser.advance(expected)? {
                Advance::Matched(found) => return Ok(found),
                action => self.perform(action)?,
            }
        }
    }

    fn skip_container(&mut self, start: Terminal, end: Terminal) -> Result<u64, CodecError> {
        self.advance(start)?;
        let is_array = matches!(start, Terminal::ArrayStart);
        let mut count = if is_array {
            self.base.skip_array()?
        } else {
            self.base.skip_map()?
        };
        let (items, skipper, _) = self.parser.take_repeater()?;
        let item_production = skipper.unwrap_or(items);
        while count > 0 {
            for _ in 0..count {
                skip_production(&mut *self.base, &self.grammar, item_production)?;
            }
            count = if is_array {
                self.base.skip_array()?
            } else {
                self.base.skip_map()?
            };
        }
        self.advance(end)?;
        Ok(0)
    }
}

impl Decoder for ResolvingDecoder {
    fn read_null(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::Null)?;
        self.base.read_null()
    }

    fn read_bool(&mut self) -> Result<bool, CodecError> {
        self.advance(Terminal::Boolean)?;
        self.base.read_bool()
    }

    fn read_int(&mut self) -> Result<i32, CodecError> {
        self.advance(Terminal::Int)?;
        self.base.read_int()
    }

    fn read_long(&mut self) -> Result<i64, CodecError> {
        match self.advance(Terminal::Long)? {
            Terminal::Int => Ok(self.base.read_int()? as i64),
            _ => self.base.read_long(),
        }
    }

    fn read_float(&mut self) -> Result<f32, CodecError> {
        match self.advance(Terminal::Float)? {
            Terminal::Int => Ok(self.base.read_int()? as f32),
            Terminal::Long => Ok(self.base.read_long()? as f32),
            _ => self.base.read_float(),
        }
    }

    fn read_double(&mut self) -> Result<f64, CodecError> {
        match self.advance(Terminal::Double)? {
            Terminal::Int => Ok(self.base.read_int()? as f64),
            Terminal::Long => Ok(self.base.read_long()? as f64),
            Terminal::Float => Ok(self.base.read_float()? as f64),
            _ => self.base.read_double(),
        }
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        self.advance(Terminal::String)?;
        self.base.read_string()
    }

    fn skip_string(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::String)?;
        self.base.skip_string()
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        self.advance(Terminal::Bytes)?;
        self.base.read_bytes()
    }

    fn skip_bytes(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::Bytes)?;
        self.base.skip_bytes()
    }

    fn read_fixed(&mut self, n: usize) -> Result<Vec<u8>, CodecError> {
        self.advance(Terminal::Fixed)?;
        self.parser.assert_size(n)?;
        self.base.read_fixed(n)
    }

    fn skip_fixed(&mut self, n: usize) -> Result<(), CodecError> {
        self.advance(Terminal::Fixed)?;
        self.parser.assert_size(n)?;
        self.base.skip_fixed(n)
    }

    fn read_enum(&mut self) -> Result<usize, CodecError> {
        self.advance(Terminal::Enum)?;
        let writer_ordinal = self.base.read_enum()?;
        self.parser.enum_adjust(writer_ordinal)
    }

    fn array_start(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::ArrayStart)?;
        let count = self.base.array_start()?;
        if count == 0 {
            self.parser.pop_repeater()?;
            self.advance(Terminal::ArrayEnd)?;
        } else {
            self.parser.set_repeat_count(count)?;
        }
        Ok(count)
    }

    fn array_next(&mut self) -> Result<u64, CodecError> {
        self.drain()?;
        let count = self.base.array_next()?;
        if count == 0 {
            self.parser.pop_repeater()?;
            self.advance(Terminal::ArrayEnd)?;
        } else {
            self.parser.set_repeat_count(count)?;
        }
        Ok(count)
    }

    fn skip_array(&mut self) -> Result<u64, CodecError> {
        self.skip_container(Terminal::ArrayStart, Terminal::ArrayEnd)
    }

    fn map_start(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::MapStart)?;
        let count = self.base.map_start()?;
        if count == 0 {
            self.parser.pop_repeater()?;
            self.advance(Terminal::MapEnd)?;
        } else {
            self.parser.set_repeat_count(count)?;
        }
        Ok(count)
    }

    fn map_next(&mut self) -> Result<u64, CodecError> {
        self.drain()?;
        let count = self.base.map_next()?;
        if count == 0 {
            self.parser.pop_repeater()?;
            self.advance(Terminal::MapEnd)?;
        } else {
            self.parser.set_repeat_count(count)?;
        }
        Ok(count)
    }

    fn skip_map(&mut self) -> Result<u64, CodecError> {
        self.skip_container(Terminal::MapStart, Terminal::MapEnd)
    }

    /// Returns the reader's branch index for the union value, which may
    /// differ from the writer's tag.
    fn read_union_index(&mut self) -> Result<usize, CodecError> {
        self.advance(Terminal::Union)?;
        self.parser.union_adjust()
    }
}
