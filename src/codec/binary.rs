//! Avro binary codec.
//!
//! Implements the Avro 1.x binary encoding:
//! - `null` occupies zero bytes;
//! - `boolean` is one byte, 0x00 or 0x01;
//! - `int` and `long` are zig-zag varints;
//! - `float` and `double` are little-endian IEEE 754;
//! - `string` and `bytes` are a long length followed by raw bytes;
//! - `fixed` is exactly its declared size in raw bytes;
//! - arrays and maps are block sequences: a long item count (negative
//!   counts are followed by a long byte size usable for skipping),
//!   terminated by a zero count;
//! - unions are a long branch index before the branch value;
//! - enums are a long ordinal.

use bytes::Bytes;

use super::zigzag::{read_zigzag, write_zigzag};
use super::{Decoder, Encoder};
use crate::error::CodecError;
use crate::io::{ByteSink, ByteSource, MemorySink, MemorySource};

/// Decoder for Avro binary data over any byte source.
#[derive(Debug)]
pub struct BinaryDecoder<S> {
    source: S,
}

impl<S: ByteSource> BinaryDecoder<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Unwrap the underlying byte source.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Total number of bytes consumed so far.
    pub fn byte_count(&self) -> u64 {
        self.source.byte_count()
    }

    /// Read one block count; for the negative form, the byte size is
    /// consumed and discarded.
    fn read_block_count(&mut self) -> Result<u64, CodecError> {
        let count = read_zigzag(&mut self.source)?;
        if count >= 0 {
            return Ok(count as u64);
        }
        let byte_size = read_zigzag(&mut self.source)?;
        if byte_size < 0 {
            return Err(CodecError::InvalidData(format!(
                "Negative block byte size: {}",
                byte_size
            )));
        }
        count
            .checked_neg()
            .map(|n| n as u64)
            .ok_or_else(|| CodecError::InvalidData("Block count overflow".to_string()))
    }

    /// Skip sized blocks; returns the item count of the first unsized
    /// block, or zero at the end marker.
    fn skip_blocks(&mut self) -> Result<u64, CodecError> {
        loop {
            let count = read_zigzag(&mut self.source)?;
            if count == 0 {
                return Ok(0);
            }
            if count > 0 {
                return Ok(count as u64);
            }
            let byte_size = read_zigzag(&mut self.source)?;
            if byte_size < 0 {
                return Err(CodecError::InvalidData(format!(
                    "Negative block byte size: {}",
                    byte_size
                )));
            }
            self.source.skip(byte_size as u64)?;
        }
    }

    fn read_length(&mut self) -> Result<usize, CodecError> {
        let len = read_zigzag(&mut self.source)?;
        if len < 0 {
            return Err(CodecError::InvalidData(format!(
                "Negative length: {}",
                len
            )));
        }
        Ok(len as usize)
    }
}

impl BinaryDecoder<MemorySource> {
    /// Decode from a shared in-memory buffer.
    pub fn from_bytes(data: Bytes) -> Self {
        Self::new(MemorySource::new(data))
    }

    /// Decode from a byte slice (copied).
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(MemorySource::from(data))
    }
}

impl<S: ByteSource> Decoder for BinaryDecoder<S> {
    fn read_null(&mut self) -> Result<(), CodecError> {
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.source.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidData(format!(
                "Invalid boolean value: {}, expected 0 or 1",
                other
            ))),
        }
    }

    fn read_int(&mut self) -> Result<i32, CodecError> {
        let long = read_zigzag(&mut self.source)?;
        if long < i32::MIN as i64 || long > i32::MAX as i64 {
            return Err(CodecError::OutOfRange(format!(
                "{} does not fit in int",
                long
            )));
        }
        Ok(long as i32)
    }

    fn read_long(&mut self) -> Result<i64, CodecError> {
        read_zigzag(&mut self.source)
    }

    fn read_float(&mut self) -> Result<f32, CodecError> {
        let mut buf = [0u8; 4];
        self.source.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    fn read_double(&mut self) -> Result<f64, CodecError> {
        let mut buf = [0u8; 8];
        self.source.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        let bytes = self.read_bytes()?;
        Ok(String::from_utf8(bytes)?)
    }

    fn skip_string(&mut self) -> Result<(), CodecError> {
        self.skip_bytes()
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_length()?;
        let mut buf = vec![0u8; len];
        self.source.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn skip_bytes(&mut self) -> Result<(), CodecError> {
        let len = self.read_length()?;
        self.source.skip(len as u64)
    }

    fn read_fixed(&mut self, n: usize) -> Result<Vec<u8>, CodecError> {
        let mut buf = vec![0u8; n];
        self.source.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn skip_fixed(&mut self, n: usize) -> Result<(), CodecError> {
        self.source.skip(n as u64)
    }

    fn read_enum(&mut self) -> Result<usize, CodecError> {
        let ordinal = read_zigzag(&mut self.source)?;
        if ordinal < 0 {
            return Err(CodecError::OutOfRange(format!(
                "Negative enum ordinal: {}",
                ordinal
            )));
        }
        Ok(ordinal as usize)
    }

    fn array_start(&mut self) -> Result<u64, CodecError> {
        self.read_block_count()
    }

    fn array_next(&mut self) -> Result<u64, CodecError> {
        self.read_block_count()
    }

    fn skip_array(&mut self) -> Result<u64, CodecError> {
        self.skip_blocks()
    }

    fn map_start(&mut self) -> Result<u64, CodecError> {
        self.read_block_count()
    }

    fn map_next(&mut self) -> Result<u64, CodecError> {
        self.read_block_count()
    }

    fn skip_map(&mut self) -> Result<u64, CodecError> {
        self.skip_blocks()
    }

    fn read_union_index(&mut self) -> Result<usize, CodecError> {
        let index = read_zigzag(&mut self.source)?;
        if index < 0 {
            return Err(CodecError::OutOfRange(format!(
                "Negative union branch index: {}",
                index
            )));
        }
        Ok(index as usize)
    }
}

/// Encoder producing Avro binary data into any byte sink.
#[derive(Debug)]
pub struct BinaryEncoder<K> {
    sink: K,
}

impl<K: ByteSink> BinaryEncoder<K> {
    pub fn new(sink: K) -> Self {
        Self { sink }
    }

    /// Unwrap the underlying sink.
    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Total number of bytes written so far.
    pub fn byte_count(&self) -> u64 {
        self.sink.byte_count()
    }
}

impl BinaryEncoder<MemorySink> {
    /// Encode into a growable in-memory buffer.
    pub fn buffered() -> Self {
        Self::new(MemorySink::new())
    }

    /// Consume the encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.sink.into_bytes()
    }
}

impl<K: ByteSink> Encoder for BinaryEncoder<K> {
    fn write_null(&mut self) -> Result<(), CodecError> {
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> Result<(), CodecError> {
        self.sink.write_all(&[v as u8])
    }

    fn write_int(&mut self, v: i32) -> Result<(), CodecError> {
        write_zigzag(&mut self.sink, v as i64)
    }

    fn write_long(&mut self, v: i64) -> Result<(), CodecError> {
        write_zigzag(&mut self.sink, v)
    }

    fn write_float(&mut self, v: f32) -> Result<(), CodecError> {
        self.sink.write_all(&v.to_le_bytes())
    }

    fn write_double(&mut self, v: f64) -> Result<(), CodecError> {
        self.sink.write_all(&v.to_le_bytes())
    }

    fn write_string(&mut self, v: &str) -> Result<(), CodecError> {
        self.write_bytes(v.as_bytes())
    }

    fn write_bytes(&mut self, v: &[u8]) -> Result<(), CodecError> {
        write_zigzag(&mut self.sink, v.len() as i64)?;
        self.sink.write_all(v)
    }

    fn write_fixed(&mut self, v: &[u8]) -> Result<(), CodecError> {
        self.sink.write_all(v)
    }

    fn write_enum(&mut self, ordinal: usize) -> Result<(), CodecError> {
        write_zigzag(&mut self.sink, ordinal as i64)
    }

    fn array_start(&mut self) -> Result<(), CodecError> {
        Ok(())
    }

    fn array_end(&mut self) -> Result<(), CodecError> {
        write_zigzag(&mut self.sink, 0)
    }

    fn map_start(&mut self) -> Result<(), CodecError> {
        Ok(())
    }

    fn map_end(&mut self) -> Result<(), CodecError> {
        write_zigzag(&mut self.sink, 0)
    }

    fn set_item_count(&mut self, n: u64) -> Result<(), CodecError> {
        if n > 0 {
            write_zigzag(&mut self.sink, n as i64)?;
        }
        Ok(())
    }

    fn start_item(&mut self) -> Result<(), CodecError> {
        Ok(())
    }

    fn write_union_index(&mut self, branch: usize) -> Result<(), CodecError> {
        write_zigzag(&mut self.sink, branch as i64)
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        self.sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder(bytes: &[u8]) -> BinaryDecoder<MemorySource> {
        BinaryDecoder::from_slice(bytes)
    }

    #[test]
    fn test_null_consumes_nothing() {
        let mut d = decoder(&[0x01]);
        d.read_null().unwrap();
        assert_eq!(d.byte_count(), 0);
    }

    #[test]
    fn test_bool_strictness() {
        assert!(!decoder(&[0x00]).read_bool().unwrap());
        assert!(decoder(&[0x01]).read_bool().unwrap());
        assert!(matches!(
            decoder(&[0x02]).read_bool(),
            Err(CodecError::InvalidData(_))
        ));
    }

    #[test]
    fn test_int_wire_format() {
        // 42 zig-zags to 84 = 0x54
        let mut e = BinaryEncoder::buffered();
        e.write_int(42).unwrap();
        assert_eq!(e.into_bytes(), vec![0x54]);
        assert_eq!(decoder(&[0x54]).read_int().unwrap(), 42);
    }

    #[test]
    fn test_long_minus_one() {
        let mut e = BinaryEncoder::buffered();
        e.write_long(-1).unwrap();
        assert_eq!(e.into_bytes(), vec![0x01]);
        assert_eq!(decoder(&[0x01]).read_long().unwrap(), -1);
    }

    #[test]
    fn test_int_range_check() {
        let mut e = BinaryEncoder::buffered();
        e.write_long(i64::from(i32::MAX) + 1).unwrap();
        let bytes = e.into_bytes();
        assert!(matches!(
            decoder(&bytes).read_int(),
            Err(CodecError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_float_double_le() {
        let mut e = BinaryEncoder::buffered();
        e.write_float(1.5).unwrap();
        e.write_double(-2.25).unwrap();
        let bytes = e.into_bytes();
        let mut d = decoder(&bytes);
        assert_eq!(d.read_float().unwrap(), 1.5);
        assert_eq!(d.read_double().unwrap(), -2.25);
    }

    #[test]
    fn test_string_round_trip() {
        let mut e = BinaryEncoder::buffered();
        e.write_string("héllo").unwrap();
        let bytes = e.into_bytes();
        let mut d = decoder(&bytes);
        assert_eq!(d.read_string().unwrap(), "héllo");
    }

    #[test]
    fn test_bytes_length_prefix() {
        let mut e = BinaryEncoder::buffered();
        e.write_bytes(&[0xDE, 0xAD]).unwrap();
        let bytes = e.into_bytes();
        assert_eq!(bytes, vec![0x04, 0xDE, 0xAD]);
    }

    #[test]
    fn test_fixed_raw() {
        let mut e = BinaryEncoder::buffered();
        e.write_fixed(&[1, 2, 3]).unwrap();
        let bytes = e.into_bytes();
        assert_eq!(bytes, vec![1, 2, 3]);
        let mut d = decoder(&bytes);
        assert_eq!(d.read_fixed(3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_array_blocks() {
        // One block of two items, then terminator.
        let mut e = BinaryEncoder::buffered();
        e.array_start().unwrap();
        e.set_item_count(2).unwrap();
        e.start_item().unwrap();
        e.write_int(1).unwrap();
        e.start_item().unwrap();
        e.write_int(2).unwrap();
        e.array_end().unwrap();
        let bytes = e.into_bytes();

        let mut d = decoder(&bytes);
        assert_eq!(d.array_start().unwrap(), 2);
        assert_eq!(d.read_int().unwrap(), 1);
        assert_eq!(d.read_int().unwrap(), 2);
        assert_eq!(d.array_next().unwrap(), 0);
    }

    #[test]
    fn test_negative_block_count_with_byte_size() {
        // count -2 (zigzag 3), byte size 2 (zigzag 4), two one-byte ints
        let bytes = [0x03, 0x04, 0x02, 0x04, 0x00];
        let mut d = decoder(&bytes);
        assert_eq!(d.array_start().unwrap(), 2);
        assert_eq!(d.read_int().unwrap(), 1);
        assert_eq!(d.read_int().unwrap(), 2);
        assert_eq!(d.array_next().unwrap(), 0);
    }

    #[test]
    fn test_skip_array_uses_byte_size() {
        let bytes = [0x03, 0x04, 0x02, 0x04, 0x00, 0x2A];
        let mut d = decoder(&bytes);
        assert_eq!(d.skip_array().unwrap(), 0);
        assert_eq!(d.read_int().unwrap(), 21);
    }

    #[test]
    fn test_union_index() {
        let mut e = BinaryEncoder::buffered();
        e.write_union_index(1).unwrap();
        e.write_string("x").unwrap();
        let bytes = e.into_bytes();
        let mut d = decoder(&bytes);
        assert_eq!(d.read_union_index().unwrap(), 1);
        assert_eq!(d.read_string().unwrap(), "x");
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(
            decoder(&[]).read_bool(),
            Err(CodecError::UnexpectedEof)
        ));
        assert!(matches!(
            decoder(&[0x04, 0xFF]).read_bytes(),
            Err(CodecError::UnexpectedEof)
        ));
    }
}
