//! Ranked retrieval over the postings and the doclist.

pub mod bm25;
pub mod cursor;
pub mod engine;

pub use bm25::{Bm25Config, Bm25Scorer};
pub use cursor::TermCursor;
pub use engine::{SearchEngine, SearchHit};
