//! Posting lists and their segment payload.

pub mod list;
pub mod payload;
pub mod reader;

pub use list::{Posting, PostingList};
pub use payload::PostingPayload;
pub use reader::PostingReader;

use crate::error::Result;
use crate::partition::Collector;

/// Extension of the postings segment files.
pub const POSTINGS_EXTENSION: &str = "postings";

/// One reader per segment holding `term`, disk segments first.
pub fn posting_readers(
    postings: &Collector<PostingPayload>,
    term: &str,
) -> Result<Vec<PostingReader>> {
    postings
        .buffers(term)?
        .into_iter()
        .map(|buffer| PostingReader::new(buffer.data, buffer.tombstones))
        .collect()
}
