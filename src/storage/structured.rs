//! Structured binary I/O.
//!
//! All integers are little-endian. Strings and byte strings carry a `u32`
//! length prefix. A read that runs out of input reports
//! [`FlashError::Corrupted`] instead of a bare I/O error, because every
//! structure read through here has a known length.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{FlashError, Result};

/// A structured writer for binary data.
#[derive(Debug)]
pub struct StructWriter<W: Write> {
    writer: W,
    position: u64,
}

impl<W: Write> StructWriter<W> {
    /// Create a new structured writer.
    pub fn new(writer: W) -> Self {
        StructWriter {
            writer,
            position: 0,
        }
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.position += 4;
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.position += 8;
        Ok(())
    }

    /// Write a f64 value (little-endian).
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.writer.write_f64::<LittleEndian>(value)?;
        self.position += 8;
        Ok(())
    }

    /// Write a string with a u32 length prefix.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Write raw bytes with a u32 length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        let length = u32::try_from(value.len())
            .map_err(|_| FlashError::invalid_argument("byte string longer than u32::MAX"))?;
        self.write_u32(length)?;
        self.write_raw(value)
    }

    /// Write raw bytes without length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        self.position += value.len() as u64;
        Ok(())
    }

    /// Get the current position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Get a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// A structured reader for binary data.
#[derive(Debug)]
pub struct StructReader<R: Read> {
    reader: R,
    position: u64,
}

impl<R: Read> StructReader<R> {
    /// Create a new structured reader.
    pub fn new(reader: R) -> Self {
        StructReader {
            reader,
            position: 0,
        }
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self.reader.read_u32::<LittleEndian>().map_err(eof_to_corrupted)?;
        self.position += 4;
        Ok(value)
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        let value = self.reader.read_u64::<LittleEndian>().map_err(eof_to_corrupted)?;
        self.position += 8;
        Ok(value)
    }

    /// Read a f64 value (little-endian).
    pub fn read_f64(&mut self) -> Result<f64> {
        let value = self.reader.read_f64::<LittleEndian>().map_err(eof_to_corrupted)?;
        self.position += 8;
        Ok(value)
    }

    /// Read a u32 value, or `None` on a clean end of input.
    ///
    /// Input ending inside the value is still corruption.
    pub fn try_read_u32(&mut self) -> Result<Option<u32>> {
        let mut buf = [0u8; 4];
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        match filled {
            0 => Ok(None),
            4 => {
                self.position += 4;
                Ok(Some(u32::from_le_bytes(buf)))
            }
            n => Err(FlashError::corrupted(format!(
                "input ended after {n} bytes of a 4-byte length"
            ))),
        }
    }

    /// Read a string with a u32 length prefix.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|e| FlashError::corrupted(format!("Invalid UTF-8: {e}")))
    }

    /// Read bytes with a u32 length prefix.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let length = self.read_u32()? as usize;
        self.read_raw(length)
    }

    /// Read exactly `length` raw bytes.
    pub fn read_raw(&mut self, length: usize) -> Result<Vec<u8>> {
        // A corrupted length must not turn into a huge allocation.
        let mut bytes = Vec::with_capacity(length.min(1 << 16));
        let read = (&mut self.reader)
            .take(length as u64)
            .read_to_end(&mut bytes)?;
        if read != length {
            return Err(FlashError::corrupted(format!(
                "expected {length} bytes, found {read}"
            )));
        }
        self.position += length as u64;
        Ok(bytes)
    }

    /// Get the current position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Get a mutable reference to the underlying reader.
    ///
    /// Reading or seeking through it leaves [`position`](Self::position) stale.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

fn eof_to_corrupted(err: io::Error) -> FlashError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        FlashError::corrupted("unexpected end of input")
    } else {
        FlashError::Io(err)
    }
}
