//! Corpus statistics kept next to the doclist.

use serde::{Deserialize, Serialize};

use crate::error::{FlashError, Result};
use crate::storage::{Storage, StructReader, StructWriter, read_all, write_all};

/// Name of the statistics file.
pub const STATS_FILE: &str = "doclist.stats";

/// Document count and running mean of document lengths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DocStats {
    pub total_docs: u32,
    pub avg_length: f64,
}

impl DocStats {
    /// Account for a new document of `length` tokens.
    pub fn add(&mut self, length: u32) {
        let n = self.total_docs as f64;
        self.avg_length += (length as f64 - self.avg_length) / (n + 1.0);
        self.total_docs += 1;
    }

    /// Account for the removal of a document of `length` tokens.
    pub fn remove(&mut self, length: u32) {
        match self.total_docs {
            0 => {}
            1 => {
                self.total_docs = 0;
                self.avg_length = 0.0;
            }
            n => {
                let n = n as f64;
                self.avg_length = (self.avg_length * n - length as f64) / (n - 1.0);
                self.total_docs -= 1;
            }
        }
    }

    /// Read `doclist.stats`, or empty statistics if it does not exist.
    pub fn load(storage: &dyn Storage) -> Result<Self> {
        if !storage.file_exists(STATS_FILE) {
            return Ok(Self::default());
        }

        let data = read_all(storage, STATS_FILE)?;
        if data.len() != 12 {
            return Err(FlashError::corrupted(format!(
                "{STATS_FILE} has {} bytes, expected 12",
                data.len()
            )));
        }
        let mut reader = StructReader::new(data.as_slice());
        Ok(DocStats {
            total_docs: reader.read_u32()?,
            avg_length: reader.read_f64()?,
        })
    }

    /// `[u32 totalDocs][f64 avgLength]`.
    pub fn save(&self, storage: &dyn Storage) -> Result<()> {
        let mut writer = StructWriter::new(Vec::with_capacity(12));
        writer.write_u32(self.total_docs)?;
        writer.write_f64(self.avg_length)?;
        write_all(storage, STATS_FILE, &writer.into_inner())
    }
}
