//! Index configuration.
//!
//! Configuration is an explicit value handed to constructors. [`IndexConfig`]
//! is what users edit (and what the `flash` binary stores as JSON), while
//! [`SegmentConfig`] is the slice of it a single collector needs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FlashError, Result};
use crate::search::Bm25Config;

/// Name of the configuration file the `flash` binary keeps in the index directory.
pub const CONFIG_FILE_NAME: &str = "flash.json";

/// Default limit of entries held by the postings memory segment.
pub const DEFAULT_POSTINGS_SEGMENT_LIMIT: usize = 1 << 18;

/// Default limit of entries held by the doclist memory segments.
pub const DEFAULT_DOCLIST_SEGMENT_LIMIT: usize = 1 << 20;

/// Default byte distance between two sparse dictionary entries.
pub const DEFAULT_DICTIONARY_BLOCK_SIZE: u64 = 1 << 16;

/// Default fraction of `generation * limit` that may be tombstoned before
/// a disk segment is garbage collected.
pub const DEFAULT_DELETION_RATIO: f64 = 0.1;

/// Parameters for the segments of one collector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Number of additions after which the memory segment is flushed.
    pub limit: usize,
    /// Sparse dictionary block size in bytes.
    pub block_size: u64,
    /// See [`DEFAULT_DELETION_RATIO`].
    pub deletion_ratio: f64,
}

impl SegmentConfig {
    pub fn new(limit: usize) -> Self {
        SegmentConfig {
            limit,
            ..Default::default()
        }
    }

    /// Number of deletions a segment of `generation` tolerates before
    /// it is rewritten.
    pub fn deletion_threshold(&self, generation: u32) -> f64 {
        generation as f64 * self.limit as f64 * self.deletion_ratio
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        SegmentConfig {
            limit: DEFAULT_POSTINGS_SEGMENT_LIMIT,
            block_size: DEFAULT_DICTIONARY_BLOCK_SIZE,
            deletion_ratio: DEFAULT_DELETION_RATIO,
        }
    }
}

/// Configuration of a whole index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding all segment, dictionary, info and stats files.
    pub index_dir: PathBuf,

    /// Postings memory segment limit.
    pub postings_segment_limit: usize,

    /// Doclist (and id index) memory segment limit.
    pub doclist_segment_limit: usize,

    /// Sparse dictionary block size in bytes.
    pub dictionary_block_size: u64,

    /// Share of a segment that may be tombstoned before GC.
    pub deletion_ratio: f64,

    /// Capacity of the bounded queue between a tokenizer and the indexer.
    pub token_queue_capacity: usize,

    /// Skip files and directories whose name starts with a dot.
    pub skip_hidden: bool,

    /// Regular expressions of paths that are never indexed.
    pub blacklist: Vec<String>,

    /// Ranking parameters.
    pub bm25: Bm25Config,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            index_dir: PathBuf::from(".flash/index"),
            postings_segment_limit: DEFAULT_POSTINGS_SEGMENT_LIMIT,
            doclist_segment_limit: DEFAULT_DOCLIST_SEGMENT_LIMIT,
            dictionary_block_size: DEFAULT_DICTIONARY_BLOCK_SIZE,
            deletion_ratio: DEFAULT_DELETION_RATIO,
            token_queue_capacity: 100,
            skip_hidden: true,
            blacklist: Vec::new(),
            bm25: Bm25Config::default(),
        }
    }
}

impl IndexConfig {
    /// Create a default configuration rooted at `index_dir`.
    pub fn new<P: AsRef<Path>>(index_dir: P) -> Self {
        IndexConfig {
            index_dir: index_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: IndexConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.postings_segment_limit == 0 {
            return Err(FlashError::invalid_config(
                "postings_segment_limit must be greater than 0",
            ));
        }
        if self.doclist_segment_limit == 0 {
            return Err(FlashError::invalid_config(
                "doclist_segment_limit must be greater than 0",
            ));
        }
        if self.dictionary_block_size == 0 {
            return Err(FlashError::invalid_config(
                "dictionary_block_size must be greater than 0",
            ));
        }
        if !(self.deletion_ratio > 0.0 && self.deletion_ratio <= 1.0) {
            return Err(FlashError::invalid_config(format!(
                "deletion_ratio must be in (0, 1], got {}",
                self.deletion_ratio
            )));
        }
        if !(self.bm25.k1 >= 0.0 && self.bm25.k1.is_finite()) {
            return Err(FlashError::invalid_config(format!(
                "bm25.k1 must be a non-negative number, got {}",
                self.bm25.k1
            )));
        }
        if !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(FlashError::invalid_config(format!(
                "bm25.b must be in [0, 1], got {}",
                self.bm25.b
            )));
        }
        if self.token_queue_capacity == 0 {
            return Err(FlashError::invalid_config(
                "token_queue_capacity must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Segment parameters of the postings collector.
    pub fn postings_segment(&self) -> SegmentConfig {
        SegmentConfig {
            limit: self.postings_segment_limit,
            block_size: self.dictionary_block_size,
            deletion_ratio: self.deletion_ratio,
        }
    }

    /// Segment parameters of the doclist collectors.
    pub fn doclist_segment(&self) -> SegmentConfig {
        SegmentConfig {
            limit: self.doclist_segment_limit,
            block_size: self.dictionary_block_size,
            deletion_ratio: self.deletion_ratio,
        }
    }
}
