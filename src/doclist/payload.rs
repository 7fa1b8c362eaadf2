//! Segment payloads of the doclist and of its path index.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use ahash::AHashSet;

use crate::doclist::Document;
use crate::error::{FlashError, Result};
use crate::partition::Payload;
use crate::postings::payload::parse_doc_id;
use crate::storage::{StructReader, StructWriter};

fn unique<E>(key: &str, mut entries: Vec<E>) -> Result<Option<E>> {
    if entries.len() > 1 {
        return Err(FlashError::collision(format!(
            "{} live entries for key {key:?}",
            entries.len()
        )));
    }
    Ok(entries.pop())
}

/// Documents keyed by the decimal form of their id.
#[derive(Debug)]
pub struct DocPayload;

impl Payload for DocPayload {
    type Entry = Document;
    type Tombstone = u64;

    fn encode(doc: &Document) -> Vec<u8> {
        doc.encode()
    }

    fn decode(_key: &str, data: &[u8], tombstones: &AHashSet<u64>) -> Result<Option<Document>> {
        let doc = Document::decode(data)?;
        Ok((!tombstones.contains(&doc.id)).then_some(doc))
    }

    fn absorb(existing: &mut Document, incoming: Document) {
        *existing = incoming;
    }

    fn combine(key: &str, entries: Vec<Document>) -> Result<Option<Document>> {
        unique(key, entries)
    }

    fn tombstone(key: &str) -> Result<u64> {
        parse_doc_id(key)
    }

    fn purge(entries: &mut BTreeMap<String, Document>, key: &str) -> Result<usize> {
        Ok(usize::from(entries.remove(key).is_some()))
    }

    fn write_tombstone<W: Write>(id: &u64, writer: &mut StructWriter<W>) -> Result<()> {
        writer.write_u64(*id)
    }

    fn read_tombstone<R: Read>(reader: &mut StructReader<R>) -> Result<u64> {
        reader.read_u64()
    }
}

/// Document ids keyed by path.
#[derive(Debug)]
pub struct IdPayload;

impl Payload for IdPayload {
    type Entry = u64;
    type Tombstone = String;

    fn encode(id: &u64) -> Vec<u8> {
        id.to_le_bytes().to_vec()
    }

    fn decode(path: &str, data: &[u8], tombstones: &AHashSet<String>) -> Result<Option<u64>> {
        let bytes: [u8; 8] = data.try_into().map_err(|_| {
            FlashError::corrupted(format!("id of {path:?} has {} bytes", data.len()))
        })?;
        if tombstones.contains(path) {
            return Ok(None);
        }
        Ok(Some(u64::from_le_bytes(bytes)))
    }

    fn absorb(existing: &mut u64, incoming: u64) {
        *existing = incoming;
    }

    fn combine(path: &str, entries: Vec<u64>) -> Result<Option<u64>> {
        unique(path, entries)
    }

    fn tombstone(path: &str) -> Result<String> {
        Ok(path.to_string())
    }

    fn purge(entries: &mut BTreeMap<String, u64>, path: &str) -> Result<usize> {
        Ok(usize::from(entries.remove(path).is_some()))
    }

    fn write_tombstone<W: Write>(path: &String, writer: &mut StructWriter<W>) -> Result<()> {
        writer.write_string(path)
    }

    fn read_tombstone<R: Read>(reader: &mut StructReader<R>) -> Result<String> {
        reader.read_string()
    }
}
