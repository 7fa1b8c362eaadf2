//! Tokenizers turning files into term streams.

use std::fmt::Debug;
use std::path::Path;

use crate::analysis::TokenStream;
use crate::error::Result;

/// Produces the normalized terms of a file.
///
/// Opening the file happens before `tokenize` returns, so a missing or
/// unreadable path is reported as an error. Failures after that end the
/// stream early.
pub trait Tokenizer: Send + Sync + Debug {
    fn tokenize(&self, path: &Path) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod unicode_word;
