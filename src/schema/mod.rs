//! Avro schema types, JSON parsing, and the resolves-to relation.

mod parser;
mod resolve;
mod types;

pub use parser::{parse_schema, SchemaParser};
pub use resolve::{resolve, Resolution};
pub use types::{EnumSchema, FieldSchema, FixedSchema, NamedRef, RecordSchema, Schema};
