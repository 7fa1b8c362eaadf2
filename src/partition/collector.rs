//! The collector: one memory segment plus a set of disk segments.
//!
//! Flushing follows a generation ladder that behaves like incrementing a
//! binary counter. A written-out memory segment becomes generation 1 when that
//! slot is free; otherwise it is merged with the run of consecutive
//! generations `1..=L` into a single segment of generation `L + 1`. This
//! keeps at most one disk segment per generation and `O(log n)` segments
//! overall.

use std::io::Write;
use std::mem;
use std::sync::Arc;

use log::{debug, info};

use crate::config::SegmentConfig;
use crate::error::Result;
use crate::partition::merger::Merger;
use crate::partition::payload::{Payload, Tombstones};
use crate::partition::segment::Segment;
use crate::storage::{Storage, StructReader, StructWriter, read_all};

/// Raw data of one segment's record, with the tombstones that apply to it.
#[derive(Debug, Clone)]
pub struct SegmentBuffer<P: Payload> {
    pub data: Vec<u8>,
    pub tombstones: Arc<Tombstones<P>>,
}

/// Orchestrates flushing, merging and lookups across segments.
#[derive(Debug)]
pub struct Collector<P: Payload> {
    storage: Arc<dyn Storage>,
    extension: String,
    config: SegmentConfig,
    memory: Segment<P>,
    disk: Vec<Segment<P>>,
}

impl<P: Payload> Collector<P> {
    /// Create an empty collector for files with the given extension.
    pub fn new(storage: Arc<dyn Storage>, extension: &str, config: SegmentConfig) -> Self {
        Collector {
            memory: Segment::memory(Arc::clone(&storage), extension, config),
            storage,
            extension: extension.to_string(),
            config,
            disk: Vec::new(),
        }
    }

    /// Name of the collector info file.
    pub fn info_name(&self) -> String {
        format!("{}.info", self.extension)
    }

    /// Reload the segments listed in the collector info file.
    ///
    /// Returns `false` when no info file exists, leaving the collector empty.
    pub fn load(&mut self) -> Result<bool> {
        let name = self.info_name();
        if !self.storage.file_exists(&name) {
            debug!("No {name} found, starting empty");
            return Ok(false);
        }

        let data = read_all(self.storage.as_ref(), &name)?;
        let mut reader = StructReader::new(data.as_slice());
        let mut disk = Vec::new();
        while let Some(generation) = reader.try_read_u32()? {
            let segment = Segment::load(
                Arc::clone(&self.storage),
                &self.extension,
                generation,
                self.config,
            )?;
            if generation == 0 {
                self.memory = segment;
            } else {
                disk.push(segment);
            }
        }
        disk.sort_by_key(|segment| segment.generation());
        self.disk = disk;

        info!(
            "Loaded {} collector: generations {:?}, {} keys in memory",
            self.extension,
            self.generations(),
            self.memory.len()
        );
        Ok(true)
    }

    /// Add an entry, flushing the memory segment first if it is full.
    pub fn add(&mut self, key: &str, entry: P::Entry) -> Result<()> {
        if self.memory.full() {
            self.flush()?;
        }
        self.memory.add(key, entry)
    }

    /// Delete `key` from every segment.
    ///
    /// Disk segments emptied by garbage collection are removed.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        self.memory.delete(key)?;

        let mut kept = Vec::with_capacity(self.disk.len());
        for mut segment in mem::take(&mut self.disk) {
            segment.delete(key)?;
            if segment.size() == 0 {
                debug!("Removing emptied segment {}", segment.name());
                segment.delete_files()?;
            } else {
                kept.push(segment);
            }
        }
        self.disk = kept;
        Ok(())
    }

    /// Write out the memory segment and climb the generation ladder.
    ///
    /// The collector changes only once the new segment is complete. If the
    /// merge fails the memory segment and the run of disk segments are kept.
    pub fn flush(&mut self) -> Result<()> {
        let records = self.memory.persist()?;
        if records == 0 {
            self.memory.delete_files()?;
            self.memory = self.empty_memory();
            return Ok(());
        }

        self.disk.sort_by_key(|segment| segment.generation());
        let run = self
            .disk
            .iter()
            .enumerate()
            .take_while(|(i, segment)| segment.generation() == *i as u32 + 1)
            .count();

        if run == 0 {
            self.memory.promote(1)?;
            let fresh = self.empty_memory();
            let promoted = mem::replace(&mut self.memory, fresh);
            self.disk.insert(0, promoted);
            return Ok(());
        }

        let generation = run as u32 + 1;
        let output = Segment::<P>::file_name(&self.extension, generation);
        let mut inputs: Vec<&Segment<P>> = self.disk[..run].iter().collect();
        inputs.push(&self.memory);
        let count = Merger::new(Arc::clone(&self.storage), inputs).merge_into(&output)?;

        self.disk.drain(..run);
        self.memory = self.empty_memory();
        if count == 0 {
            self.storage.delete_file(&output)?;
        } else {
            let merged = Segment::from_file(
                Arc::clone(&self.storage),
                &self.extension,
                generation,
                self.config,
                count,
            )?;
            self.disk.push(merged);
            self.disk.sort_by_key(|segment| segment.generation());
        }
        Ok(())
    }

    /// Live entries for `key`, disk segments first, the memory segment last.
    pub fn entries(&self, key: &str) -> Result<Vec<P::Entry>> {
        let mut entries = Vec::new();
        for segment in self.segments() {
            if let Some(entry) = segment.get_entry(key)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Raw buffers for `key` from every segment holding it.
    pub fn buffers(&self, key: &str) -> Result<Vec<SegmentBuffer<P>>> {
        let mut buffers = Vec::new();
        for segment in self.segments() {
            if let Some(data) = segment.get_buffer(key)? {
                buffers.push(SegmentBuffer {
                    data,
                    tombstones: segment.tombstones(),
                });
            }
        }
        Ok(buffers)
    }

    /// Live entries of every segment whose key satisfies `predicate`.
    pub fn scan<F>(&self, predicate: F) -> Result<Vec<(String, P::Entry)>>
    where
        F: Fn(&str) -> bool,
    {
        let mut matches = Vec::new();
        for segment in self.segments() {
            matches.extend(segment.scan(&predicate)?);
        }
        Ok(matches)
    }

    /// Persist everything needed to reload the collector.
    ///
    /// The memory segment is written to its overflow file but keeps its
    /// entries, so the collector stays usable.
    pub fn clear_memory(&mut self) -> Result<()> {
        let mut writer = StructWriter::new(Vec::new());
        for segment in &self.disk {
            writer.write_u32(segment.generation())?;
        }
        writer.write_u32(self.memory.generation())?;

        let mut output = self.storage.create_output(&self.info_name())?;
        output.write_all(&writer.into_inner())?;
        output.close()?;

        let records = self.memory.persist()?;
        for segment in self.segments() {
            segment.save_info()?;
        }

        info!(
            "Saved {} collector: generations {:?}, {records} records in memory",
            self.extension,
            self.generations()
        );
        Ok(())
    }

    /// Generations of the disk segments in ascending order.
    pub fn generations(&self) -> Vec<u32> {
        self.disk.iter().map(Segment::generation).collect()
    }

    /// Number of distinct keys in the memory segment.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn memory(&self) -> &Segment<P> {
        &self.memory
    }

    pub fn disk_segments(&self) -> &[Segment<P>] {
        &self.disk
    }

    fn empty_memory(&self) -> Segment<P> {
        Segment::memory(Arc::clone(&self.storage), &self.extension, self.config)
    }

    fn segments(&self) -> impl Iterator<Item = &Segment<P>> {
        self.disk.iter().chain(std::iter::once(&self.memory))
    }
}
