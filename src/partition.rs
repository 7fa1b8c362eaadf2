//! Segmented on-disk storage shared by the postings and the doclist.
//!
//! A [`Collector`] owns one memory [`Segment`] and any number of disk
//! segments, each with a sparse [`Dictionary`]. What the records contain is
//! decided by a [`Payload`] implementation.

pub mod collector;
pub mod dictionary;
pub mod merger;
pub mod payload;
pub mod record;
pub mod segment;

pub use collector::{Collector, SegmentBuffer};
pub use dictionary::Dictionary;
pub use merger::Merger;
pub use payload::{Payload, Tombstones};
pub use record::{Record, RecordReader, RecordWriter};
pub use segment::Segment;

#[cfg(test)]
pub(crate) mod testing {
    //! Small payloads for exercising the segment machinery.

    use std::collections::BTreeMap;
    use std::io::{Read, Write};

    use ahash::AHashSet;

    use crate::config::SegmentConfig;
    use crate::error::{FlashError, Result};
    use crate::partition::Payload;
    use crate::storage::{StructReader, StructWriter};

    pub fn text_segment_config(limit: usize) -> SegmentConfig {
        SegmentConfig {
            limit,
            block_size: 64,
            deletion_ratio: 0.1,
        }
    }

    /// String values; duplicates concatenate with `+`.
    #[derive(Debug)]
    pub struct TextPayload;

    impl Payload for TextPayload {
        type Entry = String;
        type Tombstone = String;

        fn encode(entry: &String) -> Vec<u8> {
            entry.as_bytes().to_vec()
        }

        fn decode(key: &str, data: &[u8], tombstones: &AHashSet<String>) -> Result<Option<String>> {
            if tombstones.contains(key) {
                return Ok(None);
            }
            String::from_utf8(data.to_vec())
                .map(Some)
                .map_err(|e| FlashError::corrupted(e.to_string()))
        }

        fn absorb(existing: &mut String, incoming: String) {
            existing.push('+');
            existing.push_str(&incoming);
        }

        fn combine(_key: &str, entries: Vec<String>) -> Result<Option<String>> {
            Ok(Some(entries.join("+")))
        }

        fn tombstone(key: &str) -> Result<String> {
            Ok(key.to_string())
        }

        fn purge(entries: &mut BTreeMap<String, String>, key: &str) -> Result<usize> {
            Ok(entries.remove(key).map_or(0, |_| 1))
        }

        fn write_tombstone<W: Write>(tombstone: &String, writer: &mut StructWriter<W>) -> Result<()> {
            writer.write_string(tombstone)
        }

        fn read_tombstone<R: Read>(reader: &mut StructReader<R>) -> Result<String> {
            reader.read_string()
        }
    }

    /// Like [`TextPayload`] but a key may live in one segment only.
    #[derive(Debug)]
    pub struct UniquePayload;

    impl Payload for UniquePayload {
        type Entry = String;
        type Tombstone = String;

        fn encode(entry: &String) -> Vec<u8> {
            TextPayload::encode(entry)
        }

        fn decode(key: &str, data: &[u8], tombstones: &AHashSet<String>) -> Result<Option<String>> {
            TextPayload::decode(key, data, tombstones)
        }

        fn absorb(existing: &mut String, incoming: String) {
            *existing = incoming;
        }

        fn combine(key: &str, mut entries: Vec<String>) -> Result<Option<String>> {
            if entries.len() > 1 {
                return Err(FlashError::collision(format!("key {key} in {} segments", entries.len())));
            }
            Ok(entries.pop())
        }

        fn tombstone(key: &str) -> Result<String> {
            Ok(key.to_string())
        }

        fn purge(entries: &mut BTreeMap<String, String>, key: &str) -> Result<usize> {
            TextPayload::purge(entries, key)
        }

        fn write_tombstone<W: Write>(tombstone: &String, writer: &mut StructWriter<W>) -> Result<()> {
            writer.write_string(tombstone)
        }

        fn read_tombstone<R: Read>(reader: &mut StructReader<R>) -> Result<String> {
            reader.read_string()
        }
    }
}
