//! Encoder and decoder contracts plus their implementations.
//!
//! [`Decoder`] and [`Encoder`] define the leaf operation set shared by the
//! binary and JSON codecs. The validating wrappers and the resolving
//! decoder drive a grammar in front of these operations so that the call
//! sequence is checked against a schema.

mod binary;
mod json;
mod resolving;
mod skip;
mod validating;
pub mod zigzag;

pub use binary::{BinaryDecoder, BinaryEncoder};
pub use json::{JsonDecoder, JsonEncoder};
pub use resolving::ResolvingDecoder;
pub use validating::{ValidatingDecoder, ValidatingEncoder};

use crate::error::CodecError;

/// Leaf decode operations over some wire representation.
///
/// Array and map reading is block oriented: `array_start` returns the
/// number of items in the first block, the caller reads that many items
/// and then calls `array_next` for the following block, until a count of
/// zero ends the sequence.
pub trait Decoder {
    /// Decode a null value (consumes nothing on the binary wire).
    fn read_null(&mut self) -> Result<(), CodecError>;
    /// Decode a boolean.
    fn read_bool(&mut self) -> Result<bool, CodecError>;
    /// Decode a 32-bit signed integer.
    fn read_int(&mut self) -> Result<i32, CodecError>;
    /// Decode a 64-bit signed integer.
    fn read_long(&mut self) -> Result<i64, CodecError>;
    /// Decode a 32-bit float.
    fn read_float(&mut self) -> Result<f32, CodecError>;
    /// Decode a 64-bit float.
    fn read_double(&mut self) -> Result<f64, CodecError>;
    /// Decode a UTF-8 string.
    fn read_string(&mut self) -> Result<String, CodecError>;
    /// Skip a string without materializing it.
    fn skip_string(&mut self) -> Result<(), CodecError>;
    /// Decode a length-prefixed byte sequence.
    fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError>;
    /// Skip a byte sequence without materializing it.
    fn skip_bytes(&mut self) -> Result<(), CodecError>;
    /// Decode exactly `n` raw bytes.
    fn read_fixed(&mut self, n: usize) -> Result<Vec<u8>, CodecError>;
    /// Skip exactly `n` raw bytes.
    fn skip_fixed(&mut self, n: usize) -> Result<(), CodecError>;
    /// Decode an enum ordinal.
    fn read_enum(&mut self) -> Result<usize, CodecError>;
    /// Begin an array; returns the first block's item count.
    fn array_start(&mut self) -> Result<u64, CodecError>;
    /// Continue an array; returns the next block's item count.
    fn array_next(&mut self) -> Result<u64, CodecError>;
    /// Skip array blocks that carry a byte size; returns the item count
    /// of the first block that must be skipped item by item, or zero when
    /// the array end was reached.
    fn skip_array(&mut self) -> Result<u64, CodecError>;
    /// Begin a map; returns the first block's entry count.
    fn map_start(&mut self) -> Result<u64, CodecError>;
    /// Continue a map; returns the next block's entry count.
    fn map_next(&mut self) -> Result<u64, CodecError>;
    /// Skip map blocks that carry a byte size; same contract as
    /// `skip_array`.
    fn skip_map(&mut self) -> Result<u64, CodecError>;
    /// Decode a union branch index.
    fn read_union_index(&mut self) -> Result<usize, CodecError>;
}

/// Leaf encode operations over some wire representation.
///
/// Arrays and maps are written as `array_start`, then for each block
/// `set_item_count` followed by `start_item` + item writes, then
/// `array_end`.
pub trait Encoder {
    /// Encode a null value.
    fn write_null(&mut self) -> Result<(), CodecError>;
    /// Encode a boolean.
    fn write_bool(&mut self, v: bool) -> Result<(), CodecError>;
    /// Encode a 32-bit signed integer.
    fn write_int(&mut self, v: i32) -> Result<(), CodecError>;
    /// Encode a 64-bit signed integer.
    fn write_long(&mut self, v: i64) -> Result<(), CodecError>;
    /// Encode a 32-bit float.
    fn write_float(&mut self, v: f32) -> Result<(), CodecError>;
    /// Encode a 64-bit float.
    fn write_double(&mut self, v: f64) -> Result<(), CodecError>;
    /// Encode a UTF-8 string.
    fn write_string(&mut self, v: &str) -> Result<(), CodecError>;
    /// Encode a length-prefixed byte sequence.
    fn write_bytes(&mut self, v: &[u8]) -> Result<(), CodecError>;
    /// Encode raw bytes of a fixed-size value.
    fn write_fixed(&mut self, v: &[u8]) -> Result<(), CodecError>;
    /// Encode an enum ordinal.
    fn write_enum(&mut self, ordinal: usize) -> Result<(), CodecError>;
    /// Begin an array.
    fn array_start(&mut self) -> Result<(), CodecError>;
    /// End an array.
    fn array_end(&mut self) -> Result<(), CodecError>;
    /// Begin a map.
    fn map_start(&mut self) -> Result<(), CodecError>;
    /// End a map.
    fn map_end(&mut self) -> Result<(), CodecError>;
    /// Announce the number of items in the next block.
    fn set_item_count(&mut self, n: u64) -> Result<(), CodecError>;
    /// Mark the start of the next item.
    fn start_item(&mut self) -> Result<(), CodecError>;
    /// Encode a union branch index.
    fn write_union_index(&mut self, branch: usize) -> Result<(), CodecError>;
    /// Commit any buffered output.
    fn flush(&mut self) -> Result<(), CodecError>;
}
