//! Grammar-driven Avro codec.
//!
//! This library compiles Avro schemas into parsing grammars and drives
//! binary and JSON encoders/decoders against them, so that every encode
//! or decode call is checked against the schema, and data written under
//! one schema can be read under another (field reordering, default
//! injection, numeric promotion, union adjustment).
//!
//! # Reading with schema resolution
//!
//! ```
//! use contrail::codec::{BinaryDecoder, BinaryEncoder, Encoder};
//! use contrail::codec::ResolvingDecoder;
//! use contrail::schema::parse_schema;
//! use contrail::value::read_resolved;
//!
//! // Writer encodes {re: 3, im: 5} ...
//! let writer = parse_schema(r#"{
//!     "type": "record", "name": "C",
//!     "fields": [
//!         {"name": "re", "type": "long"},
//!         {"name": "im", "type": "long"}
//!     ]
//! }"#).unwrap();
//! let mut enc = BinaryEncoder::buffered();
//! enc.write_long(3).unwrap();
//! enc.write_long(5).unwrap();
//! let bytes = enc.into_bytes();
//!
//! // ... the reader only wants the real part.
//! let reader = parse_schema(r#"{
//!     "type": "record", "name": "C",
//!     "fields": [{"name": "re", "type": "long"}]
//! }"#).unwrap();
//! let mut dec = ResolvingDecoder::new(
//!     &writer, &reader, Box::new(BinaryDecoder::from_slice(&bytes)),
//! ).unwrap();
//! let datum = read_resolved(&mut dec, &reader).unwrap();
//! assert!(matches!(datum, contrail::value::Datum::Record(_)));
//! ```

pub mod codec;
pub mod error;
pub mod grammar;
pub mod io;
pub mod schema;
pub mod value;

// Re-export main types
pub use codec::{
    BinaryDecoder, BinaryEncoder, Decoder, Encoder, JsonDecoder, JsonEncoder, ResolvingDecoder,
    ValidatingDecoder, ValidatingEncoder,
};
pub use error::{CodecError, SchemaError};
pub use grammar::{json_grammar, resolving_grammar, validating_grammar, Grammar, Parser, Terminal};
pub use io::{ByteSink, ByteSource, MemorySink, MemorySource, ReaderSource, WriterSink};
pub use schema::{
    parse_schema, resolve, EnumSchema, FieldSchema, FixedSchema, NamedRef, RecordSchema,
    Resolution, Schema, SchemaParser,
};
pub use value::{datum_from_json, read_datum, read_resolved, write_datum, Datum, RecordDatum};
