//! Document-at-a-time BM25 ranking with MaxScore pruning.
//!
//! Every query term gets one [`TermCursor`]. Cursors wait in a min-heap
//! keyed by their current document; the cursors sharing the smallest
//! document are popped together, scored and advanced. Results live in a
//! min-heap of `k` entries seeded with zero-score placeholders, so its root
//! is the weakest hit that still makes the cut.
//!
//! After each document the active term with the smallest upper bound is
//! demoted when the weakest hit beats that bound plus the bounds of the
//! terms demoted earlier: such a term can no longer bring a new document
//! into the results on its own. Demoted terms stop driving iteration but
//! still add their score to documents reached by the active terms.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::analysis::query_terms;
use crate::doclist::DocList;
use crate::error::Result;
use crate::partition::Collector;
use crate::postings::{PostingPayload, posting_readers};
use crate::search::{Bm25Config, Bm25Scorer, TermCursor};

/// A ranked document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: u64,
    pub score: f64,
}

#[derive(Debug)]
struct TermState {
    cursor: TermCursor,
    scorer: Bm25Scorer,
    max_score: f64,
}

/// A result heap entry; `doc_id` is `None` for placeholders.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f64,
    doc_id: Option<u64>,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: lower scores come first
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.doc_id.cmp(&self.doc_id))
    }
}

/// Ranks the documents of an index for a free-text query.
#[derive(Debug)]
pub struct SearchEngine<'a> {
    postings: &'a Collector<PostingPayload>,
    docs: &'a DocList,
    config: Bm25Config,
}

impl<'a> SearchEngine<'a> {
    pub fn with_config(
        postings: &'a Collector<PostingPayload>,
        docs: &'a DocList,
        config: Bm25Config,
    ) -> Self {
        SearchEngine {
            postings,
            docs,
            config,
        }
    }

    /// Up to `k` documents sorted by descending score.
    ///
    /// Terms missing from the index are ignored. Documents scoring zero are
    /// never returned.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let terms = query_terms(query);
        let total_docs = self.docs.num_docs() as u64;
        if terms.is_empty() || k == 0 || total_docs == 0 {
            return Ok(Vec::new());
        }
        // No more than `total_docs` hits can exist.
        let k = k.min(self.docs.num_docs() as usize);
        let avg_length = self.docs.avg_length();

        let mut states = Vec::with_capacity(terms.len());
        for term in &terms {
            let readers = posting_readers(self.postings, term)?;
            if readers.is_empty() {
                continue;
            }
            let cursor = TermCursor::new(readers)?;
            if cursor.doc().is_none() {
                continue;
            }
            let scorer = Bm25Scorer::new(cursor.num_docs(), total_docs, avg_length, self.config);
            states.push(TermState {
                max_score: scorer.max_score(),
                cursor,
                scorer,
            });
        }

        let mut active: BinaryHeap<Reverse<(u64, usize)>> = states
            .iter()
            .enumerate()
            .filter_map(|(i, state)| state.cursor.doc().map(|doc| Reverse((doc, i))))
            .collect();
        let mut removed: Vec<usize> = Vec::new();
        let mut removed_max = 0.0;
        let mut results: BinaryHeap<Candidate> = (0..k)
            .map(|_| Candidate {
                score: 0.0,
                doc_id: None,
            })
            .collect();
        let mut participants = Vec::with_capacity(states.len());
        let mut scored = 0usize;

        while let Some(&Reverse((doc, _))) = active.peek() {
            participants.clear();
            while let Some(&Reverse((next, index))) = active.peek() {
                if next != doc {
                    break;
                }
                active.pop();
                participants.push(index);
            }

            if let Some(length) = self.docs.fetch(doc)?.map(|d| d.length) {
                let mut score = 0.0;
                for &index in &participants {
                    let state = &states[index];
                    score += state.scorer.score(state.cursor.frequency(), length);
                }
                for &index in &removed {
                    let state = &mut states[index];
                    state.cursor.skip_to(doc)?;
                    if state.cursor.doc() == Some(doc) {
                        score += state.scorer.score(state.cursor.frequency(), length);
                    }
                }

                scored += 1;
                let weakest = results.peek().map_or(0.0, |c| c.score);
                if score > weakest {
                    results.pop();
                    results.push(Candidate {
                        score,
                        doc_id: Some(doc),
                    });
                }
            }

            for &index in &participants {
                let cursor = &mut states[index].cursor;
                cursor.advance()?;
                if let Some(next) = cursor.doc() {
                    active.push(Reverse((next, index)));
                }
            }

            loop {
                let weakest = results.peek().map_or(0.0, |c| c.score);
                let Some(index) = active
                    .iter()
                    .map(|Reverse((_, index))| *index)
                    .min_by(|a, b| states[*a].max_score.total_cmp(&states[*b].max_score))
                else {
                    break;
                };
                if weakest <= states[index].max_score + removed_max {
                    break;
                }
                active.retain(|Reverse((_, i))| *i != index);
                removed_max += states[index].max_score;
                removed.push(index);
            }
        }

        let mut hits: Vec<SearchHit> = results
            .into_iter()
            .filter(|candidate| candidate.score > 0.0)
            .filter_map(|candidate| {
                candidate.doc_id.map(|doc_id| SearchHit {
                    doc_id,
                    score: candidate.score,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);

        debug!(
            "Query {query:?}: {} of {} terms matched, {scored} documents scored, {} pruned, {} hits",
            states.len(),
            terms.len(),
            removed.len(),
            hits.len()
        );
        Ok(hits)
    }
}
