//! Sparse block dictionary over a sorted segment file.
//!
//! The dictionary remembers the offset of roughly one record per
//! `block_size` bytes, plus the first and the last record. A lookup costs
//! one binary search over the indexed keys and at most one block read.

use std::io::Write;

use ahash::AHashMap;
use log::debug;

use crate::error::{FlashError, Result};
use crate::partition::record::{RECORD_OVERHEAD, RecordReader, scan_block};
use crate::storage::{Storage, StructReader, StructWriter, read_all};

/// Offsets of selected keys within one segment file.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    block_size: u64,
    entries: AHashMap<String, u64>,
    keys: Vec<String>,
}

impl Dictionary {
    /// Name of the dictionary file belonging to `segment`.
    pub fn file_name(segment: &str) -> String {
        format!("{segment}.dict")
    }

    /// Build the dictionary with one forward scan over `segment`.
    pub fn build(storage: &dyn Storage, segment: &str, block_size: u64) -> Result<Self> {
        let mut reader = RecordReader::open(storage, segment)?;
        let mut entries = AHashMap::new();

        // Bytes left before the next record gets indexed.
        let mut remaining: i64 = 0;
        let mut last: Option<(String, u64)> = None;

        while let Some(key) = reader.next_key()? {
            let offset = reader.offset();
            let data_len = reader.data_len().unwrap_or_default() as u64;
            let record_len = (key.len() as u64 + data_len + RECORD_OVERHEAD) as i64;

            remaining -= record_len;
            if remaining <= 0 {
                entries.insert(key.clone(), offset);
                remaining = block_size as i64;
            }
            last = Some((key, offset));
        }

        if let Some((key, offset)) = last {
            entries.insert(key, offset);
        }

        debug!(
            "Built dictionary for {segment}: {} entries, block size {block_size}",
            entries.len()
        );
        Ok(Self::from_entries(block_size, entries))
    }

    /// Load a previously saved dictionary file.
    pub fn load(storage: &dyn Storage, name: &str, block_size: u64) -> Result<Self> {
        let data = read_all(storage, name)?;
        let mut reader = StructReader::new(data.as_slice());

        let count = reader.read_u32()?;
        let mut entries = AHashMap::with_capacity((count as usize).min(1 << 16));
        for _ in 0..count {
            let key = reader.read_string()?;
            let offset = reader.read_u64()?;
            entries.insert(key, offset);
        }

        if reader.position() != data.len() as u64 {
            return Err(FlashError::corrupted(format!(
                "dictionary {name} has {} trailing bytes",
                data.len() as u64 - reader.position()
            )));
        }

        Ok(Self::from_entries(block_size, entries))
    }

    /// Load the dictionary of `segment`, building and saving it if its file
    /// does not exist.
    pub fn open(storage: &dyn Storage, segment: &str, block_size: u64) -> Result<Self> {
        let name = Self::file_name(segment);
        if storage.file_exists(&name) {
            Self::load(storage, &name, block_size)
        } else {
            let dictionary = Self::build(storage, segment, block_size)?;
            dictionary.save(storage, &name)?;
            Ok(dictionary)
        }
    }

    /// Rebuild the dictionary of `segment` from scratch and save it.
    pub fn rebuild(storage: &dyn Storage, segment: &str, block_size: u64) -> Result<Self> {
        storage.delete_file(&Self::file_name(segment))?;
        Self::open(storage, segment, block_size)
    }

    /// Write `[u32 n]([u32 keyLen][key][u64 offset])*` in key order.
    pub fn save(&self, storage: &dyn Storage, name: &str) -> Result<()> {
        let mut writer = StructWriter::new(Vec::new());
        writer.write_u32(self.keys.len() as u32)?;
        for key in &self.keys {
            writer.write_string(key)?;
            writer.write_u64(self.entries[key])?;
        }

        let mut output = storage.create_output(name)?;
        output.write_all(&writer.into_inner())?;
        output.close()
    }

    /// Look up the data section stored for `key` in `segment`.
    pub fn get(&self, storage: &dyn Storage, segment: &str, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(&offset) = self.entries.get(key) {
            let mut reader = RecordReader::open(storage, segment)?;
            return match reader.record_at(offset)? {
                Some(record) if record.key == key => Ok(Some(record.data)),
                Some(record) => Err(FlashError::corrupted(format!(
                    "dictionary of {segment} maps {key:?} to a record keyed {:?}",
                    record.key
                ))),
                None => Err(FlashError::corrupted(format!(
                    "dictionary of {segment} points past the end of the file"
                ))),
            };
        }

        // Index of the first indexed key greater than `key`.
        let upper = self.keys.partition_point(|indexed| indexed.as_str() < key);
        if upper == 0 || upper == self.keys.len() {
            return Ok(None);
        }

        let start = self.entries[&self.keys[upper - 1]];
        let end = self.entries[&self.keys[upper]];
        let mut reader = RecordReader::open(storage, segment)?;
        let block = reader.read_block(start, end)?;
        scan_block(&block, key)
    }

    /// Number of indexed keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Indexed keys in ascending order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    fn from_entries(block_size: u64, entries: AHashMap<String, u64>) -> Self {
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Dictionary {
            block_size,
            entries,
            keys,
        }
    }
}
