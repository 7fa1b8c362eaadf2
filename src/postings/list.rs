//! Posting lists.

use ahash::AHashSet;

use crate::error::{FlashError, Result};
use crate::storage::StructReader;

/// A document id with the number of times a term occurs in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: u64,
    pub frequency: u32,
}

/// The postings of one term, kept sorted by document id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// A list holding a single posting.
    pub fn single(doc_id: u64, frequency: u32) -> Self {
        PostingList {
            postings: vec![Posting { doc_id, frequency }],
        }
    }

    /// Add `frequency` occurrences in `doc_id`.
    pub fn add(&mut self, doc_id: u64, frequency: u32) {
        match self.postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
            Ok(pos) => {
                let posting = &mut self.postings[pos];
                posting.frequency = posting.frequency.saturating_add(frequency);
            }
            Err(pos) => self.postings.insert(pos, Posting { doc_id, frequency }),
        }
    }

    /// Remove the posting of `doc_id`. Returns whether one existed.
    pub fn delete(&mut self, doc_id: u64) -> bool {
        match self.postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
            Ok(pos) => {
                self.postings.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Merge every posting of `other` into this list.
    pub fn union(&mut self, other: &PostingList) {
        for posting in &other.postings {
            self.add(posting.doc_id, posting.frequency);
        }
    }

    pub fn get(&self, doc_id: u64) -> Option<u32> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|pos| self.postings[pos].frequency)
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Postings in ascending id order.
    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    /// `[u32 n]([u64 docID][u32 frequency])*`, ascending by id.
    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(4 + self.postings.len() * 12);
        data.extend_from_slice(&(self.postings.len() as u32).to_le_bytes());
        for posting in &self.postings {
            data.extend_from_slice(&posting.doc_id.to_le_bytes());
            data.extend_from_slice(&posting.frequency.to_le_bytes());
        }
        data
    }

    /// Decode a list, dropping the ids in `invalid`.
    pub fn decode(data: &[u8], invalid: &AHashSet<u64>) -> Result<Self> {
        let mut reader = StructReader::new(data);
        let count = reader.read_u32()? as usize;

        let expected = 4 + count as u64 * 12;
        if expected != data.len() as u64 {
            return Err(FlashError::corrupted(format!(
                "posting list of {count} documents needs {expected} bytes, found {}",
                data.len()
            )));
        }

        let mut postings = Vec::with_capacity(count);
        for _ in 0..count {
            let doc_id = reader.read_u64()?;
            let frequency = reader.read_u32()?;
            if !invalid.contains(&doc_id) {
                postings.push(Posting { doc_id, frequency });
            }
        }
        postings.sort_unstable_by_key(|p| p.doc_id);
        Ok(PostingList { postings })
    }
}
