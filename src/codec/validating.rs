//! Grammar-checked wrappers over a base codec.
//!
//! Every operation first advances the validating grammar, so a call
//! sequence that does not match the schema fails with a grammar violation
//! before any bytes move.

use std::sync::Arc;

use super::skip::{skip_production, skip_symbol};
use super::{Decoder, Encoder};
use crate::error::{CodecError, SchemaError};
use crate::grammar::{validating_grammar, Advance, Grammar, Parser, Terminal};
use crate::schema::Schema;

/// Decoder that validates the caller's read sequence against a schema.
#[derive(Debug)]
pub struct ValidatingDecoder<D> {
    base: D,
    parser: Parser,
    grammar: Arc<Grammar>,
}

impl<D: Decoder> ValidatingDecoder<D> {
    /// Wrap `base` so that reads are checked against `schema`.
    pub fn new(schema: &Arc<Schema>, base: D) -> Result<Self, SchemaError> {
        let grammar = validating_grammar(schema)?;
        Ok(Self {
            parser: Parser::new(Arc::clone(&grammar)),
            grammar,
            base,
        })
    }

    /// Unwrap the base decoder.
    pub fn into_inner(self) -> D {
        self.base
    }

    fn advance(&mut self, expected: Terminal) -> Result<(), CodecError> {
        loop {
            match self.parser.advance(expected)? {
                Advance::Matched(_) => return Ok(()),
                Advance::Skip(symbol) => {
                    skip_symbol(&mut self.base, &self.grammar, &symbol)?;
                }
                other => {
                    return Err(CodecError::GrammarViolation(format!(
                        "unexpected parser action {:?} while validating",
                        other
                    )));
                }
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
                skip_production(&mut self.base, &self.grammar, item_production)?;
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

impl<D: Decoder> Decoder for ValidatingDecoder<D> {
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
        self.advance(Terminal::Long)?;
        self.base.read_long()
    }

    fn read_float(&mut self) -> Result<f32, CodecError> {
        self.advance(Terminal::Float)?;
        self.base.read_float()
    }

    fn read_double(&mut self) -> Result<f64, CodecError> {
        self.advance(Terminal::Double)?;
        self.base.read_double()
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
        let ordinal = self.base.read_enum()?;
        self.parser.assert_less_than(ordinal)?;
        Ok(ordinal)
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

    fn read_union_index(&mut self) -> Result<usize, CodecError> {
        self.advance(Terminal::Union)?;
        let branch = self.base.read_union_index()?;
        self.parser.select_branch(branch)?;
        Ok(branch)
    }
}

/// Encoder that validates the caller's write sequence against a schema.
#[derive(Debug)]
pub struct ValidatingEncoder<E> {
    base: E,
    parser: Parser,
}

impl<E: Encoder> ValidatingEncoder<E> {
    /// Wrap `base` so that writes are checked against `schema`.
    pub fn new(schema: &Arc<Schema>, base: E) -> Result<Self, SchemaError> {
        let grammar = validating_grammar(schema)?;
        Ok(Self {
            parser: Parser::new(grammar),
            base,
        })
    }

    /// Unwrap the base encoder.
    pub fn into_inner(self) -> E {
        self.base
    }

    fn advance(&mut self, expected: Terminal) -> Result<(), CodecError> {
        match self.parser.advance(expected)? {
            Advance::Matched(_) => Ok(()),
            other => Err(CodecError::GrammarViolation(format!(
                "unexpected parser action {:?} while validating",
                other
            ))),
        }
    }
}

impl<E: Encoder> Encoder for ValidatingEncoder<E> {
    fn write_null(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::Null)?;
        self.base.write_null()
    }

    fn write_bool(&mut self, v: bool) -> Result<(), CodecError> {
        self.advance(Terminal::Boolean)?;
        self.base.write_bool(v)
    }

    fn write_int(&mut self, v: i32) -> Result<(), CodecError> {
        self.advance(Terminal::Int)?;
        self.base.write_int(v)
    }

    fn write_long(&mut self, v: i64) -> Result<(), CodecError> {
        self.advance(Terminal::Long)?;
        self.base.write_long(v)
    }

    fn write_float(&mut self, v: f32) -> Result<(), CodecError> {
        self.advance(Terminal::Float)?;
        self.base.write_float(v)
    }

    fn write_double(&mut self, v: f64) -> Result<(), CodecError> {
        self.advance(Terminal::Double)?;
        self.base.write_double(v)
    }

    fn write_string(&mut self, v: &str) -> Result<(), CodecError> {
        self.advance(Terminal::String)?;
        self.base.write_string(v)
    }

    fn write_bytes(&mut self, v: &[u8]) -> Result<(), CodecError> {
        self.advance(Terminal::Bytes)?;
        self.base.write_bytes(v)
    }

    fn write_fixed(&mut self, v: &[u8]) -> Result<(), CodecError> {
        self.advance(Terminal::Fixed)?;
        self.parser.assert_size(v.len())?;
        self.base.write_fixed(v)
    }

    fn write_enum(&mut self, ordinal: usize) -> Result<(), CodecError> {
        self.advance(Terminal::Enum)?;
        self.parser.assert_less_than(ordinal)?;
        self.base.write_enum(ordinal)
    }

    fn array_start(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::ArrayStart)?;
        self.base.array_start()
    }

    fn array_end(&mut self) -> Result<(), CodecError> {
        self.parser.pop_repeater()?;
        self.advance(Terminal::ArrayEnd)?;
        self.base.array_end()
    }

    fn map_start(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::MapStart)?;
        self.base.map_start()
    }

    fn map_end(&mut self) -> Result<(), CodecError> {
        self.parser.pop_repeater()?;
        self.advance(Terminal::MapEnd)?;
        self.base.map_end()
    }

    fn set_item_count(&mut self, n: u64) -> Result<(), CodecError> {
        self.parser.set_repeat_count(n)?;
        self.base.set_item_count(n)
    }

    fn start_item(&mut self) -> Result<(), CodecError> {
        if !self.parser.at_repeater() {
            return Err(CodecError::GrammarViolation(
                "item started outside an array or map".to_string(),
            ));
        }
        self.base.start_item()
    }

    fn write_union_index(&mut self, branch: usize) -> Result<(), CodecError> {
        self.advance(Terminal::Union)?;
        self.parser.select_branch(branch)?;
        self.base.write_union_index(branch)
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        self.base.flush()
    }
}
