//! Unicode word tokenizer implementation.
//!
//! Splits text using the Unicode word boundary rules (UAX #29) and lowercases
//! every word. Punctuation and whitespace segments are dropped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::warn;
use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::tokenizer::Tokenizer;
use crate::analysis::{TokenStream, normalize};
use crate::error::Result;

/// Default capacity of the channel between the reading thread and the indexer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Reads a file line by line on a producer thread and emits its words.
#[derive(Clone, Debug)]
pub struct UnicodeWordTokenizer {
    capacity: usize,
}

impl Default for UnicodeWordTokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl UnicodeWordTokenizer {
    pub fn new(capacity: usize) -> Self {
        UnicodeWordTokenizer { capacity }
    }

    /// Normalized words of `text`, in order.
    pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
        text.unicode_words().map(normalize)
    }
}

impl Tokenizer for UnicodeWordTokenizer {
    fn tokenize(&self, path: &Path) -> Result<TokenStream> {
        let file = File::open(path)?;
        let display = path.display().to_string();

        Ok(TokenStream::spawn(self.capacity, move |sender| {
            let mut reader = BufReader::new(file);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) => return,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Stopped reading {display}: {e}");
                        return;
                    }
                }

                let text = String::from_utf8_lossy(&line);
                for word in Self::words(&text) {
                    if sender.send(word).is_err() {
                        return;
                    }
                }
            }
        }))
    }

    fn name(&self) -> &'static str {
        "unicode_word"
    }
}
