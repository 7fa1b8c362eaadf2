//! Segments: the generation-numbered units a collector is made of.
//!
//! Generation 0 is the mutable memory segment. Every other generation is an
//! immutable sorted file on storage, accompanied by a sparse dictionary and
//! a set of tombstones that filter its records until garbage collection
//! rewrites it.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use log::debug;

use crate::config::SegmentConfig;
use crate::error::{FlashError, Result};
use crate::partition::dictionary::Dictionary;
use crate::partition::payload::{Payload, Tombstones};
use crate::partition::record::{RecordReader, RecordWriter, count_records};
use crate::storage::{Storage, StorageInput, StructReader, StructWriter, read_all};

/// One segment of a collector.
#[derive(Debug)]
pub struct Segment<P: Payload> {
    storage: Arc<dyn Storage>,
    extension: String,
    generation: u32,
    config: SegmentConfig,
    entries: BTreeMap<String, P::Entry>,
    tombstones: Arc<Tombstones<P>>,
    size: usize,
    deleted: usize,
    dictionary: Option<Dictionary>,
}

impl<P: Payload> Segment<P> {
    /// File name of the data file of generation `generation`.
    pub fn file_name(extension: &str, generation: u32) -> String {
        if generation == 0 {
            format!("temp.{extension}")
        } else {
            format!("part_{generation}.{extension}")
        }
    }

    /// Create an empty memory segment.
    pub fn memory(storage: Arc<dyn Storage>, extension: &str, config: SegmentConfig) -> Self {
        Segment {
            storage,
            extension: extension.to_string(),
            generation: 0,
            config,
            entries: BTreeMap::new(),
            tombstones: Arc::new(Tombstones::<P>::default()),
            size: 0,
            deleted: 0,
            dictionary: None,
        }
    }

    /// Wrap a freshly written disk file holding `records` records.
    pub fn from_file(
        storage: Arc<dyn Storage>,
        extension: &str,
        generation: u32,
        config: SegmentConfig,
        records: usize,
    ) -> Result<Self> {
        let mut segment = Self::memory(storage, extension, config);
        segment.generation = generation;
        segment.size = records;
        segment.dictionary = Some(Dictionary::rebuild(
            segment.storage.as_ref(),
            &segment.name(),
            config.block_size,
        )?);
        Ok(segment)
    }

    /// Reopen a segment persisted by an earlier process.
    ///
    /// A memory segment reloads its overflow file, if any; a disk segment
    /// reopens its dictionary and counts its records.
    pub fn load(
        storage: Arc<dyn Storage>,
        extension: &str,
        generation: u32,
        config: SegmentConfig,
    ) -> Result<Self> {
        let mut segment = Self::memory(storage, extension, config);
        segment.generation = generation;
        segment.load_info()?;

        let name = segment.name();
        if generation == 0 {
            if segment.storage.file_exists(&name) {
                segment.load_data()?;
            }
        } else {
            segment.size = count_records(segment.storage.as_ref(), &name)?;
            segment.dictionary = Some(Dictionary::open(
                segment.storage.as_ref(),
                &name,
                config.block_size,
            )?);
        }

        Ok(segment)
    }

    /// Name of the segment's data file.
    pub fn name(&self) -> String {
        Self::file_name(&self.extension, self.generation)
    }

    /// Name of the segment's info file.
    pub fn info_name(&self) -> String {
        format!("{}.info", self.name())
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_memory(&self) -> bool {
        self.generation == 0
    }

    /// Additions held in memory, or records held on disk.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Deletions recorded since the segment was last rewritten.
    pub fn deleted(&self) -> usize {
        self.deleted
    }

    /// Number of distinct keys held in memory.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn full(&self) -> bool {
        self.size >= self.config.limit
    }

    pub fn entries(&self) -> &BTreeMap<String, P::Entry> {
        &self.entries
    }

    pub fn tombstones(&self) -> Arc<Tombstones<P>> {
        Arc::clone(&self.tombstones)
    }

    pub fn deletion_threshold(&self) -> f64 {
        self.config.deletion_threshold(self.generation)
    }

    /// Insert an entry into the memory segment.
    pub fn add(&mut self, key: &str, entry: P::Entry) -> Result<()> {
        if !self.is_memory() {
            return Err(FlashError::index(format!(
                "cannot insert into immutable segment {}",
                self.name()
            )));
        }

        match self.entries.get_mut(key) {
            Some(existing) => P::absorb(existing, entry),
            None => {
                self.entries.insert(key.to_string(), entry);
            }
        }
        self.size += 1;
        Ok(())
    }

    /// Raw data section stored for `key`.
    pub fn get_buffer(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.is_memory() {
            return Ok(self.entries.get(key).map(P::encode));
        }

        match &self.dictionary {
            Some(dictionary) => dictionary.get(self.storage.as_ref(), &self.name(), key),
            None => Ok(None),
        }
    }

    /// Decoded live entry stored for `key`.
    pub fn get_entry(&self, key: &str) -> Result<Option<P::Entry>> {
        if self.is_memory() {
            return Ok(self.entries.get(key).cloned());
        }

        match self.get_buffer(key)? {
            Some(data) => P::decode(key, &data, &self.tombstones),
            None => Ok(None),
        }
    }

    /// Delete `key` from this segment.
    ///
    /// Memory segments drop the key directly. Disk segments record a
    /// tombstone and are rewritten once the tombstones exceed the deletion
    /// threshold.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        if self.is_memory() {
            let removed = P::purge(&mut self.entries, key)?;
            self.size = self.size.saturating_sub(removed);
            return Ok(());
        }

        let tombstone = P::tombstone(key)?;
        if Arc::make_mut(&mut self.tombstones).insert(tombstone) {
            self.deleted += 1;
        }

        if self.deleted > self.deletion_threshold() as usize {
            self.collect_garbage()?;
        }
        Ok(())
    }

    /// Write every entry, sorted by key, to the segment's data file while
    /// keeping them in memory. Returns the number of records written.
    pub fn persist(&self) -> Result<usize> {
        let mut writer = RecordWriter::new(Vec::new());
        for (key, entry) in &self.entries {
            writer.write(key, &P::encode(entry))?;
        }
        let count = writer.count();

        let mut output = self.storage.create_output(&self.name())?;
        output.write_all(&writer.into_inner())?;
        output.close()?;
        Ok(count)
    }

    /// Turn a persisted memory segment into disk generation `generation`
    /// by renaming its data file.
    ///
    /// The entries are released only after the file has been renamed and
    /// indexed, so a failure leaves the memory segment as it was.
    pub fn promote(&mut self, generation: u32) -> Result<()> {
        let old_name = self.name();
        let old_info = self.info_name();
        let new_name = Self::file_name(&self.extension, generation);

        self.storage.rename_file(&old_name, &new_name)?;
        let dictionary =
            Dictionary::rebuild(self.storage.as_ref(), &new_name, self.config.block_size)?;
        self.storage.delete_file(&old_info)?;

        self.generation = generation;
        self.size = self.entries.len();
        self.entries.clear();
        self.dictionary = Some(dictionary);
        debug!("Promoted {old_name} to {new_name} ({} records)", self.size);
        Ok(())
    }

    /// Open a sequential cursor over the data file.
    pub fn reader(&self) -> Result<RecordReader<Box<dyn StorageInput>>> {
        RecordReader::open(self.storage.as_ref(), &self.name())
    }

    /// Live entries whose key satisfies `predicate`, in key order.
    pub fn scan<F>(&self, predicate: F) -> Result<Vec<(String, P::Entry)>>
    where
        F: Fn(&str) -> bool,
    {
        if self.is_memory() {
            return Ok(self
                .entries
                .iter()
                .filter(|(key, _)| predicate(key))
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect());
        }

        let mut matches = Vec::new();
        let mut reader = self.reader()?;
        while let Some(key) = reader.next_key()? {
            if !predicate(&key) {
                continue;
            }
            let data = reader.read_data()?;
            if let Some(entry) = P::decode(&key, &data, &self.tombstones)? {
                matches.push((key, entry));
            }
        }
        Ok(matches)
    }

    /// Rewrite the data file without tombstoned content.
    pub fn collect_garbage(&mut self) -> Result<()> {
        let name = self.name();
        let temp_name = format!("{name}.temp");
        let before = self.size;

        let mut writer = RecordWriter::new(Vec::new());
        let mut reader = self.reader()?;
        while let Some(record) = reader.next_record()? {
            if let Some(entry) = P::decode(&record.key, &record.data, &self.tombstones)? {
                writer.write(&record.key, &P::encode(&entry))?;
            }
        }
        drop(reader);

        let survivors = writer.count();
        let mut output = self.storage.create_output(&temp_name)?;
        output.write_all(&writer.into_inner())?;
        output.close()?;
        self.storage.rename_file(&temp_name, &name)?;

        self.tombstones = Arc::new(Tombstones::<P>::default());
        self.deleted = 0;
        self.size = survivors;
        self.rebuild_dictionary()?;
        self.save_info()?;

        debug!(
            "Garbage collected {name}: {before} records before, {survivors} after"
        );
        Ok(())
    }

    /// Write `[u32 deleted][u32 n][tombstone]*` to the info file.
    pub fn save_info(&self) -> Result<()> {
        let mut writer = StructWriter::new(Vec::new());
        writer.write_u32(self.deleted as u32)?;
        writer.write_u32(self.tombstones.len() as u32)?;
        for tombstone in self.tombstones.iter() {
            P::write_tombstone(tombstone, &mut writer)?;
        }

        let mut output = self.storage.create_output(&self.info_name())?;
        output.write_all(&writer.into_inner())?;
        output.close()
    }

    /// Remove the data, dictionary and info files.
    pub fn delete_files(&self) -> Result<()> {
        let name = self.name();
        self.storage.delete_file(&name)?;
        self.storage.delete_file(&Dictionary::file_name(&name))?;
        self.storage.delete_file(&self.info_name())
    }

    fn rebuild_dictionary(&mut self) -> Result<()> {
        self.dictionary = Some(Dictionary::rebuild(
            self.storage.as_ref(),
            &self.name(),
            self.config.block_size,
        )?);
        Ok(())
    }

    fn load_info(&mut self) -> Result<()> {
        let name = self.info_name();
        if !self.storage.file_exists(&name) {
            return Ok(());
        }

        let data = read_all(self.storage.as_ref(), &name)?;
        let mut reader = StructReader::new(data.as_slice());
        self.deleted = reader.read_u32()? as usize;

        let count = reader.read_u32()?;
        let tombstones = Arc::make_mut(&mut self.tombstones);
        for _ in 0..count {
            tombstones.insert(P::read_tombstone(&mut reader)?);
        }
        Ok(())
    }

    fn load_data(&mut self) -> Result<()> {
        let mut reader = self.reader()?;
        while let Some(record) = reader.next_record()? {
            if let Some(entry) = P::decode(&record.key, &record.data, &self.tombstones)? {
                self.entries.insert(record.key, entry);
                self.size += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::testing::{TextPayload, text_segment_config};
    use crate::storage::memory::MemoryStorage;

    fn storage() -> Arc<dyn Storage> {
        Arc::new(MemoryStorage::new_default())
    }

    fn memory_with(storage: &Arc<dyn Storage>, pairs: &[(&str, &str)]) -> Segment<TextPayload> {
        let mut segment = Segment::memory(Arc::clone(storage), "text", text_segment_config(100));
        for (key, value) in pairs {
            segment.add(key, value.to_string()).unwrap();
        }
        segment
    }

    #[test]
    fn test_file_names() {
        assert_eq!(Segment::<TextPayload>::file_name("postings", 0), "temp.postings");
        assert_eq!(Segment::<TextPayload>::file_name("doclist.ids", 3), "part_3.doclist.ids");
    }

    #[test]
    fn test_memory_add_and_get() {
        let storage = storage();
        let segment = memory_with(&storage, &[("b", "2"), ("a", "1"), ("b", "3")]);

        assert_eq!(segment.size(), 3);
        assert_eq!(segment.len(), 2);
        assert_eq!(segment.get_entry("b").unwrap().as_deref(), Some("2+3"));
        assert_eq!(segment.get_buffer("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(segment.get_entry("c").unwrap(), None);
    }

    #[test]
    fn test_full() {
        let storage = storage();
        let mut segment = Segment::<TextPayload>::memory(storage, "text", text_segment_config(2));
        assert!(!segment.full());
        segment.add("a", "1".to_string()).unwrap();
        segment.add("a", "2".to_string()).unwrap();
        assert!(segment.full());
    }

    #[test]
    fn test_persist_and_promote() {
        let storage = storage();
        let mut segment = memory_with(&storage, &[("k2", "two"), ("k1", "one")]);

        assert_eq!(segment.persist().unwrap(), 2);
        assert_eq!(segment.len(), 2);
        assert!(storage.file_exists("temp.text"));

        segment.promote(1).unwrap();
        assert!(segment.is_empty());
        assert_eq!(segment.size(), 2);
        assert!(!storage.file_exists("temp.text"));
        assert!(storage.file_exists("part_1.text"));
        assert!(storage.file_exists("part_1.text.dict"));

        assert_eq!(segment.get_entry("k1").unwrap().as_deref(), Some("one"));
        assert_eq!(segment.get_entry("k2").unwrap().as_deref(), Some("two"));
        assert!(segment.add("k3", "three".to_string()).is_err());
    }

    #[test]
    fn test_failed_promote_keeps_entries() {
        let storage = storage();
        let mut segment = memory_with(&storage, &[("a", "1")]);

        // Nothing was persisted, so there is no data file to rename.
        assert!(segment.promote(1).is_err());
        assert!(segment.is_memory());
        assert_eq!(segment.get_entry("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_memory_delete_is_direct() {
        let storage = storage();
        let mut segment = memory_with(&storage, &[("a", "1"), ("b", "2")]);
        segment.delete("a").unwrap();

        assert_eq!(segment.get_entry("a").unwrap(), None);
        assert_eq!(segment.size(), 1);
        assert_eq!(segment.deleted(), 0);
    }

    #[test]
    fn test_disk_delete_tombstones_then_collects() {
        let storage = storage();
        let keys: Vec<String> = (0..20).map(|i| format!("k{i:02}")).collect();
        let mut segment = Segment::<TextPayload>::memory(
            Arc::clone(&storage),
            "text",
            text_segment_config(20),
        );
        for key in &keys {
            segment.add(key, format!("v{key}")).unwrap();
        }
        segment.persist().unwrap();
        segment.promote(1).unwrap();

        // Threshold is 1 * 20 * 0.1 = 2 deletions.
        segment.delete("k00").unwrap();
        segment.delete("k01").unwrap();
        assert_eq!(segment.deleted(), 2);
        assert_eq!(segment.size(), 20);
        assert_eq!(segment.get_entry("k00").unwrap(), None);
        assert!(segment.get_buffer("k00").unwrap().is_some());

        segment.delete("k02").unwrap();
        assert_eq!(segment.deleted(), 0);
        assert!(segment.tombstones().is_empty());
        assert_eq!(segment.size(), 17);
        assert_eq!(segment.get_buffer("k00").unwrap(), None);
        assert_eq!(segment.get_buffer("k02").unwrap(), None);
        assert!(!storage.file_exists("part_1.text.temp"));

        for key in &keys[3..] {
            assert_eq!(segment.get_entry(key).unwrap(), Some(format!("v{key}")));
        }
    }

    #[test]
    fn test_info_round_trip() {
        let storage = storage();
        let mut segment = memory_with(&storage, &[("a", "1"), ("b", "2"), ("c", "3")]);
        segment.persist().unwrap();
        segment.promote(2).unwrap();
        segment.delete("b").unwrap();
        segment.save_info().unwrap();

        let reloaded = Segment::<TextPayload>::load(
            Arc::clone(&storage),
            "text",
            2,
            text_segment_config(100),
        )
        .unwrap();
        assert_eq!(reloaded.size(), 3);
        assert_eq!(reloaded.deleted(), 1);
        assert_eq!(reloaded.get_entry("b").unwrap(), None);
        assert_eq!(reloaded.get_entry("c").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_persist_keeps_memory() {
        let storage = storage();
        let segment = memory_with(&storage, &[("x", "1")]);
        assert_eq!(segment.persist().unwrap(), 1);
        assert_eq!(segment.len(), 1);

        let reloaded =
            Segment::<TextPayload>::load(storage, "text", 0, text_segment_config(100)).unwrap();
        assert_eq!(reloaded.get_entry("x").unwrap().as_deref(), Some("1"));
        assert_eq!(reloaded.size(), 1);
    }

    #[test]
    fn test_scan_disk_and_memory() {
        let storage = storage();
        let mut segment = memory_with(&storage, &[("/a/1", "x"), ("/a/2", "y"), ("/b/1", "z")]);
        let in_memory = segment.scan(|key| key.starts_with("/a/")).unwrap();
        assert_eq!(in_memory.len(), 2);

        segment.persist().unwrap();
        segment.promote(1).unwrap();
        segment.delete("/a/2").unwrap();
        let on_disk = segment.scan(|key| key.starts_with("/a/")).unwrap();
        assert_eq!(on_disk, vec![("/a/1".to_string(), "x".to_string())]);
    }
}
