//! Sequential reading of an encoded posting list.

use std::io::Cursor;
use std::sync::Arc;

use ahash::AHashSet;
use byteorder::{ByteOrder, LittleEndian};

use crate::error::{FlashError, Result};
use crate::storage::StructReader;

/// Streams the postings of one segment's list in ascending id order,
/// skipping tombstoned documents.
#[derive(Debug)]
pub struct PostingReader {
    reader: StructReader<Cursor<Vec<u8>>>,
    num_docs: u32,
    live_docs: u32,
    remaining: u32,
    invalid: Arc<AHashSet<u64>>,
}

impl PostingReader {
    pub fn new(data: Vec<u8>, invalid: Arc<AHashSet<u64>>) -> Result<Self> {
        let len = data.len() as u64;
        let num_docs = match data.get(..4) {
            Some(header) => LittleEndian::read_u32(header),
            None => return Err(FlashError::corrupted("posting list without header")),
        };

        let expected = 4 + num_docs as u64 * 12;
        if expected != len {
            return Err(FlashError::corrupted(format!(
                "posting list of {num_docs} documents needs {expected} bytes, found {len}"
            )));
        }

        let live_docs = if invalid.is_empty() {
            num_docs
        } else {
            data[4..]
                .chunks_exact(12)
                .filter(|posting| !invalid.contains(&LittleEndian::read_u64(&posting[..8])))
                .count() as u32
        };

        let mut reader = StructReader::new(Cursor::new(data));
        reader.read_u32()?;
        Ok(PostingReader {
            reader,
            num_docs,
            live_docs,
            remaining: num_docs,
            invalid,
        })
    }

    /// Documents listed in the header, tombstoned ones included.
    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    /// Documents not tombstoned.
    pub fn live_docs(&self) -> u32 {
        self.live_docs
    }

    /// Next live `(doc_id, frequency)`.
    pub fn next(&mut self) -> Result<Option<(u64, u32)>> {
        while self.remaining > 0 {
            self.remaining -= 1;
            let doc_id = self.reader.read_u64()?;
            let frequency = self.reader.read_u32()?;
            if !self.invalid.contains(&doc_id) {
                return Ok(Some((doc_id, frequency)));
            }
        }
        Ok(None)
    }
}
