//! Error types for schema construction and codec operations.

use std::io;
use thiserror::Error;

/// Errors raised while building, parsing, or resolving schemas.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Schema JSON is syntactically or structurally invalid
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// Schema JSON parsing error
    #[error("Parse error: {0}")]
    ParseError(String),
    /// A record field or enum symbol name occurs more than once
    #[error("Duplicate name: {0}")]
    DuplicateName(String),
    /// A named-type reference was never declared
    #[error("Reference to undeclared type: {0}")]
    UnknownType(String),
    /// A named-type back-reference outlived its declaration
    #[error("Named type '{0}' no longer exists")]
    DanglingReference(String),
    /// Writer and reader schemas cannot be resolved against each other
    #[error("Incompatible schemas: {0}")]
    Incompatible(String),
    /// A field default value does not match the field's type
    #[error("Invalid default value: {0}")]
    InvalidDefault(String),
}

/// Errors raised while encoding or decoding data.
///
/// All of these are terminal for the stream: after a failure the
/// encoder or decoder must not be reused.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The call sequence does not match the schema grammar
    #[error("Grammar violation: {0}")]
    GrammarViolation(String),
    /// Resolution reached a (writer, reader) pair with no valid mapping
    #[error("Incompatible schemas: {0}")]
    Incompatible(String),
    /// A numeric value is out of range for its target type
    #[error("Value out of range: {0}")]
    OutOfRange(String),
    /// Unexpected end of input
    #[error("Unexpected end of input")]
    UnexpectedEof,
    /// Varint exceeds the 10-byte limit
    #[error("Invalid varint encoding")]
    InvalidVarint,
    /// Malformed data for the expected type
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// String is not valid UTF-8
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// IO error from the underlying byte source or sink
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Schema error surfaced during codec construction
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}
