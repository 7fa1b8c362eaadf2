//! BM25 scoring.

use serde::{Deserialize, Serialize};

/// BM25 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Config {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Bm25Config { k1: 1.2, b: 0.75 }
    }
}

/// BM25 scorer for one query term.
#[derive(Debug, Clone)]
pub struct Bm25Scorer {
    /// Documents containing the term.
    doc_freq: u64,
    /// Documents in the index.
    total_docs: u64,
    avg_length: f64,
    config: Bm25Config,
}

impl Bm25Scorer {
    /// A non-positive `avg_length` is treated as 1.
    pub fn new(doc_freq: u64, total_docs: u64, avg_length: f64, config: Bm25Config) -> Self {
        Bm25Scorer {
            doc_freq,
            total_docs,
            avg_length: if avg_length > 0.0 { avg_length } else { 1.0 },
            config,
        }
    }

    /// `ln(N / Nt)`, with `Nt` capped at `N`.
    pub fn idf(&self) -> f64 {
        if self.doc_freq == 0 || self.total_docs == 0 {
            return 0.0;
        }
        let df = self.doc_freq.min(self.total_docs) as f64;
        (self.total_docs as f64 / df).ln()
    }

    fn tf(&self, term_freq: f64, length: f64) -> f64 {
        if term_freq == 0.0 {
            return 0.0;
        }
        let Bm25Config { k1, b } = self.config;
        let norm = (1.0 - b) + b * (length / self.avg_length);
        (term_freq * (k1 + 1.0)) / (term_freq + k1 * norm)
    }

    /// Contribution of a document of `length` tokens holding the term
    /// `term_freq` times.
    pub fn score(&self, term_freq: u32, length: u32) -> f64 {
        self.idf() * self.tf(term_freq as f64, length as f64)
    }

    /// Upper bound of [`score`](Self::score) as the frequency grows.
    pub fn max_score(&self) -> f64 {
        self.idf() * (self.config.k1 + 1.0)
    }
}
