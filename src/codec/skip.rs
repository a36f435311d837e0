//! Grammar-directed skipping of encoded values.
//!
//! Writer data the reader never sees (projected-away record fields,
//! remaining array items after a skip) is consumed by interpreting the
//! writer-only productions against the base decoder's skip operations,
//! without touching the parser stack.

use super::Decoder;
use crate::error::CodecError;
use crate::grammar::{Grammar, ProdRef, Symbol, Terminal};

/// Skip the value described by one symbol (a bare terminal or an
/// indirect production).
pub(crate) fn skip_symbol<D: Decoder + ?Sized>(
    decoder: &mut D,
    grammar: &Grammar,
    symbol: &Symbol,
) -> Result<(), CodecError> {
    skip_symbols(decoder, grammar, std::slice::from_ref(symbol))
}

/// Skip the value described by a production.
pub(crate) fn skip_production<D: Decoder + ?Sized>(
    decoder: &mut D,
    grammar: &Grammar,
    production: ProdRef,
) -> Result<(), CodecError> {
    skip_symbols(decoder, grammar, grammar.production(production))
}

fn skip_symbols<D: Decoder + ?Sized>(
    decoder: &mut D,
    grammar: &Grammar,
    symbols: &[Symbol],
) -> Result<(), CodecError> {
    let mut i = 0;
    while i < symbols.len() {
        match &symbols[i] {
            Symbol::Terminal(t) => match t {
                Terminal::Null => {}
                Terminal::Boolean => {
                    decoder.read_bool()?;
                }
                Terminal::Int => {
                    decoder.read_int()?;
                }
                Terminal::Long => {
                    decoder.read_long()?;
                }
                Terminal::Float => {
                    decoder.read_float()?;
                }
                Terminal::Double => {
                    decoder.read_double()?;
                }
                Terminal::String => decoder.skip_string()?,
                Terminal::Bytes => decoder.skip_bytes()?,
                Terminal::Fixed => {
                    i += 1;
                    let Some(Symbol::SizeCheck(n)) = symbols.get(i) else {
                        return Err(CodecError::GrammarViolation(
                            "fixed without a size while skipping".to_string(),
                        ));
                    };
                    decoder.skip_fixed(*n)?;
                }
                Terminal::Enum => {
                    let ordinal = decoder.read_enum()?;
                    if let Some(Symbol::SizeCheck(m)) = symbols.get(i + 1) {
                        if ordinal >= *m {
                            return Err(CodecError::OutOfRange(format!(
                                "enum ordinal {} out of range ({} symbols)",
                                ordinal, m
                            )));
                        }
                        i += 1;
                    }
                }
                Terminal::Union => {
                    let tag = decoder.read_union_index()?;
                    i += 1;
                    let Some(Symbol::Alternative { branches, .. }) = symbols.get(i) else {
                        return Err(CodecError::GrammarViolation(
                            "union without branches while skipping".to_string(),
                        ));
                    };
                    let branch = branches.get(tag).copied().ok_or_else(|| {
                        CodecError::OutOfRange(format!(
                            "union branch {} out of range ({} branches)",
                            tag,
                            branches.len()
                        ))
                    })?;
                    skip_symbols(decoder, grammar, grammar.production(branch))?;
                }
                Terminal::ArrayStart | Terminal::MapStart => {
                    let is_array = matches!(t, Terminal::ArrayStart);
                    i += 1;
                    let Some(Symbol::Repeater { items, skipper, .. }) = symbols.get(i) else {
                        return Err(CodecError::GrammarViolation(
                            "container without items while skipping".to_string(),
                        ));
                    };
                    let item_production = skipper.unwrap_or(*items);
                    loop {
                        let count = if is_array {
                            decoder.skip_array()?
                        } else {
                            decoder.skip_map()?
                        };
                        if count == 0 {
                            break;
                        }
                        for _ in 0..count {
                            skip_symbols(decoder, grammar, grammar.production(item_production))?;
                        }
                    }
                    i += 1;
                    let end = if is_array {
                        Terminal::ArrayEnd
                    } else {
                        Terminal::MapEnd
                    };
                    if !matches!(symbols.get(i), Some(Symbol::Terminal(e)) if *e == end) {
                        return Err(CodecError::GrammarViolation(
                            "unterminated container while skipping".to_string(),
                        ));
                    }
                }
                Terminal::ArrayEnd | Terminal::MapEnd => {
                    return Err(CodecError::GrammarViolation(
                        "stray container end while skipping".to_string(),
                    ));
                }
            },
            Symbol::Indirect(r) => {
                skip_symbols(decoder, grammar, grammar.production(*r))?;
            }
            Symbol::SizeCheck(_) | Symbol::RecordMark | Symbol::FieldOrder(_) => {}
            Symbol::Promote { from, .. } => match from {
                Terminal::Int => {
                    decoder.read_int()?;
                }
                Terminal::Long => {
                    decoder.read_long()?;
                }
                Terminal::Float => {
                    decoder.read_float()?;
                }
                _ => {
                    return Err(CodecError::GrammarViolation(
                        "unexpected promotion while skipping".to_string(),
                    ));
                }
            },
            Symbol::Incompatible(message) => {
                return Err(CodecError::Incompatible(message.to_string()));
            }
            other => {
                return Err(CodecError::GrammarViolation(format!(
                    "cannot skip {}",
                    other.describe()
                )));
            }
        }
        i += 1;
    }
    Ok(())
}
