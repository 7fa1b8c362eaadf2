//! Segment record format.
//!
//! A segment file is a sequence of `[u32 keyLen][key][u32 dataLen][data]`
//! records sorted by key, with no header or trailer.

use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{FlashError, Result};
use crate::storage::{Storage, StorageInput, StructReader, StructWriter};

/// Fixed bytes of a record besides its key and data.
pub const RECORD_OVERHEAD: u64 = 8;

/// One decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub data: Vec<u8>,
}

impl Record {
    /// Bytes this record occupies on disk.
    pub fn encoded_len(&self) -> u64 {
        self.key.len() as u64 + self.data.len() as u64 + RECORD_OVERHEAD
    }
}

/// Writes records sequentially.
pub struct RecordWriter<W: Write> {
    writer: StructWriter<W>,
    count: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W) -> Self {
        RecordWriter {
            writer: StructWriter::new(writer),
            count: 0,
        }
    }

    /// Append one record. Keys must arrive in ascending order.
    pub fn write(&mut self, key: &str, data: &[u8]) -> Result<()> {
        self.writer.write_string(key)?;
        self.writer.write_bytes(data)?;
        self.count += 1;
        Ok(())
    }

    /// Number of records written.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Byte offset at which the next record starts.
    pub fn offset(&self) -> u64 {
        self.writer.position()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Sequential cursor over the records of a segment file.
///
/// The cursor reads a key first so callers can decide whether to fetch or
/// skip the data section.
pub struct RecordReader<R: Read + Seek> {
    reader: StructReader<R>,
    offset: u64,
    pending: Option<Pending>,
}

/// Lengths of the record whose key was read but whose data was not.
#[derive(Debug, Clone, Copy)]
struct Pending {
    key_len: usize,
    data_len: u32,
}

impl Pending {
    fn encoded_len(&self) -> u64 {
        self.key_len as u64 + self.data_len as u64 + RECORD_OVERHEAD
    }
}

impl RecordReader<Box<dyn StorageInput>> {
    /// Open a cursor over the named segment file.
    pub fn open(storage: &dyn Storage, name: &str) -> Result<Self> {
        Ok(RecordReader::new(storage.open_input(name)?))
    }
}

impl<R: Read + Seek> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        RecordReader {
            reader: StructReader::new(reader),
            offset: 0,
            pending: None,
        }
    }

    /// Offset of the record the cursor will read next, or of the current
    /// record while its data is still pending.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next key, or `None` at the end of the file.
    ///
    /// A pending data section is skipped first.
    pub fn next_key(&mut self) -> Result<Option<String>> {
        self.skip_data()?;

        let key_len = match self.reader.try_read_u32()? {
            Some(len) => len as usize,
            None => return Ok(None),
        };
        let key_bytes = self.reader.read_raw(key_len)?;
        let key = String::from_utf8(key_bytes)
            .map_err(|e| FlashError::corrupted(format!("record key is not UTF-8: {e}")))?;

        let data_len = self.reader.read_u32()?;
        self.pending = Some(Pending { key_len, data_len });
        Ok(Some(key))
    }

    /// Length of the current record's data section.
    pub fn data_len(&self) -> Option<u32> {
        self.pending.map(|pending| pending.data_len)
    }

    /// Read the current record's data section.
    pub fn read_data(&mut self) -> Result<Vec<u8>> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| FlashError::index("record data requested before its key"))?;
        let data = self.reader.read_raw(pending.data_len as usize)?;
        self.offset += pending.encoded_len();
        Ok(data)
    }

    /// Skip over the current record's data section without reading it.
    pub fn skip_data(&mut self) -> Result<()> {
        if let Some(pending) = self.pending.take() {
            let data_len = pending.data_len as u64;
            let skipped = io::copy(&mut self.reader.get_mut().take(data_len), &mut io::sink())?;
            if skipped != data_len {
                return Err(FlashError::corrupted(format!(
                    "record data of {data_len} bytes truncated after {skipped}"
                )));
            }
            self.offset += pending.encoded_len();
        }
        Ok(())
    }

    /// Read the next full record.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        match self.next_key()? {
            Some(key) => {
                let data = self.read_data()?;
                Ok(Some(Record { key, data }))
            }
            None => Ok(None),
        }
    }

    /// Read the record starting at `offset`.
    pub fn record_at(&mut self, offset: u64) -> Result<Option<Record>> {
        self.reader.get_mut().seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        self.pending = None;
        self.next_record()
    }

    /// Read the raw bytes in `[start, end)`.
    pub fn read_block(&mut self, start: u64, end: u64) -> Result<Vec<u8>> {
        if end < start {
            return Err(FlashError::corrupted(format!(
                "block end {end} precedes its start {start}"
            )));
        }
        self.reader.get_mut().seek(SeekFrom::Start(start))?;
        self.pending = None;
        let block = self.reader.read_raw((end - start) as usize)?;
        self.offset = end;
        Ok(block)
    }
}

/// Linearly scan a block of whole records for `key`, returning its data.
pub fn scan_block(block: &[u8], key: &str) -> Result<Option<Vec<u8>>> {
    let mut pos = 0usize;
    while pos < block.len() {
        let key_len = read_len(block, pos)?;
        pos += 4;
        let key_bytes = slice(block, pos, key_len)?;
        pos += key_len;

        let data_len = read_len(block, pos)?;
        pos += 4;
        let data = slice(block, pos, data_len)?;
        pos += data_len;

        if key_bytes == key.as_bytes() {
            return Ok(Some(data.to_vec()));
        }
    }
    Ok(None)
}

fn read_len(block: &[u8], pos: usize) -> Result<usize> {
    Ok(LittleEndian::read_u32(slice(block, pos, 4)?) as usize)
}

fn slice(block: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    pos.checked_add(len)
        .and_then(|end| block.get(pos..end))
        .ok_or_else(|| {
            FlashError::corrupted(format!(
                "record at byte {pos} overruns its {} byte block",
                block.len()
            ))
        })
}

/// Count the records of a segment file without reading their data.
pub fn count_records(storage: &dyn Storage, name: &str) -> Result<usize> {
    let mut reader = RecordReader::open(storage, name)?;
    let mut count = 0;
    while reader.next_key()?.is_some() {
        count += 1;
    }
    Ok(count)
}
