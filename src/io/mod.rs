//! Byte source and sink abstractions for the binary codec.
//!
//! The binary encoder and decoder operate against these traits rather than
//! concrete streams. Sized in-memory sources can skip without materializing
//! bytes, which is what makes `skip_*` operations on strings, bytes, and
//! fixed values cheap.

use bytes::Bytes;
use std::io::{Read, Write};

use crate::error::CodecError;

/// A consumable stream of bytes.
///
/// Implementations track the total number of bytes consumed so callers can
/// correlate failures with stream offsets.
pub trait ByteSource {
    /// Fill `buf` completely or fail with `UnexpectedEof`.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), CodecError>;

    /// Read a single byte.
    fn read_byte(&mut self) -> Result<u8, CodecError> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    /// Advance past `n` bytes without materializing them.
    fn skip(&mut self, n: u64) -> Result<(), CodecError>;

    /// Total number of bytes consumed so far.
    fn byte_count(&self) -> u64;
}

/// A byte stream accepting encoded output.
pub trait ByteSink {
    /// Write all of `buf`.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), CodecError>;

    /// Commit any buffered output.
    fn flush(&mut self) -> Result<(), CodecError>;

    /// Total number of bytes written so far.
    fn byte_count(&self) -> u64;
}

/// In-memory byte source over a shared buffer.
///
/// Cloning the backing `Bytes` is cheap, so the same buffer can feed many
/// decoders (the resolving decoder uses this for pre-encoded defaults).
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
    pos: usize,
}

impl MemorySource {
    pub fn new(data: Bytes) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(Bytes::from(data))
    }
}

impl From<&[u8]> for MemorySource {
    fn from(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }
}

impl ByteSource for MemorySource {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), CodecError> {
        if self.remaining() < buf.len() {
            return Err(CodecError::UnexpectedEof);
        }
        buf.copy_from_slice(&self.data[self.pos..self.pos + buf.len()]);
        self.pos += buf.len();
        Ok(())
    }

    fn skip(&mut self, n: u64) -> Result<(), CodecError> {
        if (self.remaining() as u64) < n {
            return Err(CodecError::UnexpectedEof);
        }
        self.pos += n as usize;
        Ok(())
    }

    fn byte_count(&self) -> u64 {
        self.pos as u64
    }
}

/// Byte source wrapping any `std::io::Read`.
///
/// Skipping falls back to buffered discard since generic readers cannot
/// seek.
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: R,
    count: u64,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }

    /// Unwrap the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), CodecError> {
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                CodecError::UnexpectedEof
            } else {
                CodecError::Io(e)
            }
        })?;
        self.count += buf.len() as u64;
        Ok(())
    }

    fn skip(&mut self, n: u64) -> Result<(), CodecError> {
        let mut remaining = n;
        let mut scratch = [0u8; 512];
        while remaining > 0 {
            let chunk = remaining.min(scratch.len() as u64) as usize;
            self.read_exact(&mut scratch[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }

    fn byte_count(&self) -> u64 {
        self.count
    }
}

/// Growable in-memory byte sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    data: Vec<u8>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the sink and return its contents.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Borrow the bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl ByteSink for MemorySink {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), CodecError> {
        self.data.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        Ok(())
    }

    fn byte_count(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Byte sink wrapping any `std::io::Write`.
#[derive(Debug)]
pub struct WriterSink<W> {
    inner: W,
    count: u64,
}

impl<W: Write> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteSink for WriterSink<W> {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), CodecError> {
        self.inner.write_all(buf)?;
        self.count += buf.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        self.inner.flush()?;
        Ok(())
    }

    fn byte_count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_read_and_skip() {
        let mut src = MemorySource::from(&[1u8, 2, 3, 4, 5][..]);
        let mut buf = [0u8; 2];
        src.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2]);
        src.skip(2).unwrap();
        assert_eq!(src.read_byte().unwrap(), 5);
        assert_eq!(src.byte_count(), 5);
        assert!(matches!(src.read_byte(), Err(CodecError::UnexpectedEof)));
    }

    #[test]
    fn test_memory_source_skip_past_end() {
        let mut src = MemorySource::from(&[1u8, 2][..]);
        assert!(matches!(src.skip(3), Err(CodecError::UnexpectedEof)));
    }

    #[test]
    fn test_reader_source_counts_bytes() {
        let data = vec![9u8; 1024];
        let mut src = ReaderSource::new(&data[..]);
        src.skip(1000).unwrap();
        let mut buf = [0u8; 24];
        src.read_exact(&mut buf).unwrap();
        assert_eq!(src.byte_count(), 1024);
    }

    #[test]
    fn test_memory_sink_roundtrip() {
        let mut sink = MemorySink::new();
        sink.write_all(&[1, 2, 3]).unwrap();
        sink.write_all(&[4]).unwrap();
        assert_eq!(sink.byte_count(), 4);
        assert_eq!(sink.into_bytes(), vec![1, 2, 3, 4]);
    }
}
