//! Segment payload for posting lists, keyed by term.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use ahash::AHashSet;

use crate::error::{FlashError, Result};
use crate::partition::Payload;
use crate::postings::PostingList;
use crate::storage::{StructReader, StructWriter};

/// Posting lists keyed by term. Deletions are keyed by document id and
/// tombstone that id in every list of a disk segment.
#[derive(Debug)]
pub struct PostingPayload;

pub(crate) fn parse_doc_id(key: &str) -> Result<u64> {
    key.parse::<u64>()
        .map_err(|e| FlashError::invalid_argument(format!("document id {key:?}: {e}")))
}

impl Payload for PostingPayload {
    type Entry = PostingList;
    type Tombstone = u64;

    fn encode(entry: &PostingList) -> Vec<u8> {
        entry.encode()
    }

    fn decode(_term: &str, data: &[u8], tombstones: &AHashSet<u64>) -> Result<Option<PostingList>> {
        let list = PostingList::decode(data, tombstones)?;
        Ok((!list.is_empty()).then_some(list))
    }

    fn absorb(existing: &mut PostingList, incoming: PostingList) {
        existing.union(&incoming);
    }

    fn combine(_term: &str, entries: Vec<PostingList>) -> Result<Option<PostingList>> {
        let mut entries = entries.into_iter();
        let Some(mut merged) = entries.next() else {
            return Ok(None);
        };
        for entry in entries {
            merged.union(&entry);
        }
        Ok((!merged.is_empty()).then_some(merged))
    }

    fn tombstone(doc_id: &str) -> Result<u64> {
        parse_doc_id(doc_id)
    }

    fn purge(entries: &mut BTreeMap<String, PostingList>, doc_id: &str) -> Result<usize> {
        let doc_id = parse_doc_id(doc_id)?;
        let mut removed = 0;
        entries.retain(|_, list| {
            if list.delete(doc_id) {
                removed += 1;
            }
            !list.is_empty()
        });
        Ok(removed)
    }

    fn write_tombstone<W: Write>(doc_id: &u64, writer: &mut StructWriter<W>) -> Result<()> {
        writer.write_u64(*doc_id)
    }

    fn read_tombstone<R: Read>(reader: &mut StructReader<R>) -> Result<u64> {
        reader.read_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purge_removes_doc_everywhere() {
        let mut entries = BTreeMap::new();
        let mut shared = PostingList::single(1, 2);
        shared.add(2, 1);
        entries.insert("cat".to_string(), shared);
        entries.insert("dog".to_string(), PostingList::single(1, 1));
        entries.insert("emu".to_string(), PostingList::single(3, 1));

        assert_eq!(PostingPayload::purge(&mut entries, "1").unwrap(), 2);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["cat"].get(2), Some(1));
        assert!(!entries.contains_key("dog"));
    }

    #[test]
    fn test_decode_fully_tombstoned_is_none() {
        let data = PostingList::single(4, 1).encode();
        let tombstones: AHashSet<u64> = [4].into_iter().collect();
        assert_eq!(PostingPayload::decode("t", &data, &tombstones).unwrap(), None);
    }

    #[test]
    fn test_combine_sums_frequencies() {
        let mut second = PostingList::single(1, 4);
        second.add(7, 1);
        let merged = PostingPayload::combine("t", vec![PostingList::single(1, 1), second])
            .unwrap()
            .unwrap();
        assert_eq!(merged.get(1), Some(5));
        assert_eq!(merged.get(7), Some(1));
    }

    #[test]
    fn test_bad_doc_id_key() {
        assert!(PostingPayload::tombstone("not-a-number").is_err());
    }
}
