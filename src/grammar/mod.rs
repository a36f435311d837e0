//! Schema-to-grammar compilation and the pushdown parser.
//!
//! Encoders and decoders do not interpret schemas directly: a schema (or
//! a writer/reader schema pair) compiles to a grammar of symbol
//! productions, and a pushdown parser drives every codec operation
//! against that grammar.

mod parser;
mod resolving;
mod symbol;
mod validating;

pub use parser::{Advance, FieldOrderStep, Hook, Parser};
pub use resolving::resolving_grammar;
pub use symbol::{Grammar, ProdRef, Production, Symbol, Terminal};
pub use validating::{json_grammar, validating_grammar};
