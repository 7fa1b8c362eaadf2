//! One ascending document stream per term, merged across segments.

use crate::error::Result;
use crate::postings::PostingReader;

#[derive(Debug)]
struct Head {
    reader: PostingReader,
    current: Option<(u64, u32)>,
}

/// Merges the posting readers of one term into a single ascending stream.
/// Frequencies of an id present in several segments are summed.
#[derive(Debug)]
pub struct TermCursor {
    heads: Vec<Head>,
    num_docs: u64,
    current: Option<(u64, u32)>,
}

impl TermCursor {
    pub fn new(readers: Vec<PostingReader>) -> Result<Self> {
        let num_docs = readers.iter().map(|r| r.live_docs() as u64).sum();
        let mut heads = Vec::with_capacity(readers.len());
        for mut reader in readers {
            let current = reader.next()?;
            heads.push(Head { reader, current });
        }

        let mut cursor = TermCursor {
            heads,
            num_docs,
            current: None,
        };
        cursor.settle();
        Ok(cursor)
    }

    /// Live documents listed by all readers, counted per segment.
    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    /// Current document, `None` once exhausted.
    pub fn doc(&self) -> Option<u64> {
        self.current.map(|(doc, _)| doc)
    }

    /// Frequency in the current document.
    pub fn frequency(&self) -> u32 {
        self.current.map_or(0, |(_, frequency)| frequency)
    }

    /// Move past the current document.
    pub fn advance(&mut self) -> Result<()> {
        let Some((doc, _)) = self.current else {
            return Ok(());
        };
        for head in &mut self.heads {
            if head.current.is_some_and(|(id, _)| id == doc) {
                head.current = head.reader.next()?;
            }
        }
        self.settle();
        Ok(())
    }

    /// Advance until the current document is at least `target`.
    pub fn skip_to(&mut self, target: u64) -> Result<()> {
        while self.doc().is_some_and(|doc| doc < target) {
            self.advance()?;
        }
        Ok(())
    }

    fn settle(&mut self) {
        let min = self
            .heads
            .iter()
            .filter_map(|head| head.current.map(|(id, _)| id))
            .min();

        self.current = min.map(|doc| {
            let frequency = self
                .heads
                .iter()
                .filter_map(|head| head.current)
                .filter(|(id, _)| *id == doc)
                .fold(0u32, |sum, (_, f)| sum.saturating_add(f));
            (doc, frequency)
        });
    }
}
