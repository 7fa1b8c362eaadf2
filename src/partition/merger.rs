//! K-way merge of sorted segments.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::Write;
use std::sync::Arc;

use log::debug;

use crate::error::Result;
use crate::partition::payload::{Payload, Tombstones};
use crate::partition::record::{Record, RecordWriter};
use crate::partition::segment::Segment;
use crate::storage::Storage;

/// Head record of one input, ordered for a min-heap on key.
#[derive(Debug)]
struct HeadEntry {
    record: Record,
    input: usize,
}

impl PartialEq for HeadEntry {
    fn eq(&self, other: &Self) -> bool {
        self.record.key == other.record.key && self.input == other.input
    }
}

impl Eq for HeadEntry {}

impl PartialOrd for HeadEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeadEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so the smallest key (then the earliest input) is on top.
        other
            .record
            .key
            .cmp(&self.record.key)
            .then_with(|| other.input.cmp(&self.input))
    }
}

/// Merges the data files of several segments into one.
pub struct Merger<'a, P: Payload> {
    storage: Arc<dyn Storage>,
    inputs: Vec<&'a Segment<P>>,
}

impl<'a, P: Payload> Merger<'a, P> {
    pub fn new(storage: Arc<dyn Storage>, inputs: Vec<&'a Segment<P>>) -> Self {
        Merger { storage, inputs }
    }

    /// Merge every input into `output`, then delete the inputs' files.
    ///
    /// Entries sharing a key are decoded against their own segment's
    /// tombstones and handed together to [`Payload::combine`]. Returns the
    /// number of records written.
    pub fn merge_into(self, output: &str) -> Result<usize> {
        let mut readers = Vec::with_capacity(self.inputs.len());
        let mut tombstones: Vec<Arc<Tombstones<P>>> = Vec::with_capacity(self.inputs.len());
        let mut heap = BinaryHeap::with_capacity(self.inputs.len());

        for (input, segment) in self.inputs.iter().enumerate() {
            let mut reader = segment.reader()?;
            if let Some(record) = reader.next_record()? {
                heap.push(HeadEntry { record, input });
            }
            readers.push(reader);
            tombstones.push(segment.tombstones());
        }

        let mut writer = RecordWriter::new(Vec::new());
        while let Some(first) = heap.pop() {
            let key = first.record.key.clone();
            let mut selected = vec![first];
            while heap.peek().is_some_and(|head| head.record.key == key) {
                if let Some(head) = heap.pop() {
                    selected.push(head);
                }
            }

            let mut live = Vec::with_capacity(selected.len());
            for head in &selected {
                if let Some(entry) =
                    P::decode(&key, &head.record.data, &tombstones[head.input])?
                {
                    live.push(entry);
                }
            }

            if !live.is_empty()
                && let Some(entry) = P::combine(&key, live)?
            {
                writer.write(&key, &P::encode(&entry))?;
            }

            for head in selected {
                if let Some(record) = readers[head.input].next_record()? {
                    heap.push(HeadEntry {
                        record,
                        input: head.input,
                    });
                }
            }
        }
        drop(readers);

        let count = writer.count();
        let mut file = self.storage.create_output(output)?;
        file.write_all(&writer.into_inner())?;
        file.close()?;

        debug!(
            "Merged {} segments into {output} ({count} records)",
            self.inputs.len()
        );

        for segment in &self.inputs {
            segment.delete_files()?;
        }
        Ok(count)
    }
}
