//! # flash
//!
//! The core of a desktop full-text search engine.
//!
//! ## Features
//!
//! - Segmented on-disk inverted index with a sparse block dictionary
//! - Generation ladder merging with `O(log n)` disk segments
//! - Tombstone deletion with threshold-triggered garbage collection
//! - BM25 ranking with MaxScore top-k pruning
//! - Pluggable storage backends

pub mod analysis;
pub mod cli;
pub mod config;
pub mod doclist;
pub mod error;
pub mod index;
pub mod partition;
pub mod postings;
pub mod search;
pub mod storage;

pub mod prelude {
    pub use crate::config::IndexConfig;
    pub use crate::doclist::Document;
    pub use crate::error::{FlashError, Result};
    pub use crate::index::{Index, IndexInfo};
    pub use crate::search::SearchHit;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
