//! The document list: id to document, path to id, and corpus statistics.
//!
//! Both maps are stored through their own [`Collector`], so they follow the
//! same flush, merge and garbage collection rules as the postings.

pub mod document;
pub mod payload;
pub mod stats;

use std::sync::Arc;

use log::debug;

use crate::config::SegmentConfig;
use crate::error::Result;
use crate::partition::Collector;
use crate::storage::Storage;

pub use document::Document;
pub use payload::{DocPayload, IdPayload};
pub use stats::{DocStats, STATS_FILE};

/// Extension of the document segment files.
pub const DOCLIST_EXTENSION: &str = "doclist";
/// Extension of the path index segment files.
pub const IDS_EXTENSION: &str = "doclist.ids";

#[derive(Debug)]
pub struct DocList {
    storage: Arc<dyn Storage>,
    docs: Collector<DocPayload>,
    ids: Collector<IdPayload>,
    stats: DocStats,
}

impl DocList {
    pub fn new(storage: Arc<dyn Storage>, config: SegmentConfig) -> Self {
        DocList {
            docs: Collector::new(Arc::clone(&storage), DOCLIST_EXTENSION, config),
            ids: Collector::new(Arc::clone(&storage), IDS_EXTENSION, config),
            storage,
            stats: DocStats::default(),
        }
    }

    /// Reload both collectors and the statistics. Returns `false` on a cold start.
    pub fn load(&mut self) -> Result<bool> {
        let docs = self.docs.load()?;
        let ids = self.ids.load()?;
        self.stats = DocStats::load(self.storage.as_ref())?;
        Ok(docs || ids)
    }

    pub fn add(&mut self, doc: Document) -> Result<()> {
        self.ids.add(&doc.path, doc.id)?;
        let length = doc.length;
        self.docs.add(&doc.id.to_string(), doc)?;
        self.stats.add(length);
        Ok(())
    }

    /// Delete document `id`. Returns the removed document, or `None` when it
    /// was not indexed.
    pub fn delete(&mut self, id: u64) -> Result<Option<Document>> {
        let Some(doc) = self.fetch(id)? else {
            return Ok(None);
        };

        self.docs.delete(&id.to_string())?;
        self.ids.delete(&doc.path)?;
        self.stats.remove(doc.length);
        debug!("Removed document {id} ({})", doc.path);
        Ok(Some(doc))
    }

    pub fn fetch(&self, id: u64) -> Result<Option<Document>> {
        Ok(self.docs.entries(&id.to_string())?.pop())
    }

    /// Id currently indexed for `path`.
    pub fn id_for_path(&self, path: &str) -> Result<Option<u64>> {
        Ok(self.ids.entries(path)?.pop())
    }

    /// Ids of the documents at `path` or beneath it, sorted by path.
    pub fn ids_matching(&self, path: &str) -> Result<Vec<(String, u64)>> {
        let root = path.trim_end_matches('/');
        let prefix = format!("{root}/");
        let mut matches = self
            .ids
            .scan(|key| key == root || key.starts_with(&prefix))?;
        matches.sort();
        matches.dedup();
        Ok(matches)
    }

    pub fn num_docs(&self) -> u32 {
        self.stats.total_docs
    }

    pub fn avg_length(&self) -> f64 {
        self.stats.avg_length
    }

    pub fn stats(&self) -> DocStats {
        self.stats
    }

    /// Persist both collectors and the statistics.
    pub fn clear_memory(&mut self) -> Result<()> {
        self.docs.clear_memory()?;
        self.ids.clear_memory()?;
        self.stats.save(self.storage.as_ref())
    }

    pub fn docs(&self) -> &Collector<DocPayload> {
        &self.docs
    }

    pub fn ids(&self) -> &Collector<IdPayload> {
        &self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::testing::text_segment_config;
    use crate::storage::memory::MemoryStorage;

    fn doclist(limit: usize) -> (Arc<dyn Storage>, DocList) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
        let docs = DocList::new(Arc::clone(&storage), text_segment_config(limit));
        (storage, docs)
    }

    #[test]
    fn test_add_fetch_delete() {
        let (_storage, mut docs) = doclist(2);
        docs.add(Document::new(1, "/a/one", 4)).unwrap();
        docs.add(Document::new(2, "/a/two", 8)).unwrap();
        docs.add(Document::new(3, "/b/three", 6)).unwrap();

        assert_eq!(docs.num_docs(), 3);
        assert!((docs.avg_length() - 6.0).abs() < 1e-9);
        assert_eq!(docs.fetch(2).unwrap(), Some(Document::new(2, "/a/two", 8)));
        assert_eq!(docs.id_for_path("/b/three").unwrap(), Some(3));

        let removed = docs.delete(1).unwrap();
        assert_eq!(removed.map(|d| d.path), Some("/a/one".to_string()));
        assert_eq!(docs.num_docs(), 2);
        assert!((docs.avg_length() - 7.0).abs() < 1e-9);
        assert_eq!(docs.fetch(1).unwrap(), None);
        assert_eq!(docs.id_for_path("/a/one").unwrap(), None);

        assert_eq!(docs.delete(99).unwrap(), None);
        assert_eq!(docs.num_docs(), 2);
    }

    #[test]
    fn test_ids_matching_prefix() {
        let (_storage, mut docs) = doclist(2);
        docs.add(Document::new(1, "/a/one", 1)).unwrap();
        docs.add(Document::new(2, "/a/two", 1)).unwrap();
        docs.add(Document::new(3, "/ab/three", 1)).unwrap();
        docs.add(Document::new(4, "/a", 1)).unwrap();

        let ids: Vec<u64> = docs
            .ids_matching("/a/")
            .unwrap()
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        assert_eq!(ids, vec![4, 1, 2]);
        assert_eq!(docs.ids_matching("/ab/three").unwrap().len(), 1);
        assert!(docs.ids_matching("/c").unwrap().is_empty());
    }

    #[test]
    fn test_readd_after_flush() {
        let (_storage, mut docs) = doclist(1);
        docs.add(Document::new(7, "/x", 2)).unwrap();
        docs.add(Document::new(8, "/y", 2)).unwrap();
        docs.delete(7).unwrap();
        docs.add(Document::new(7, "/x", 5)).unwrap();
        docs.add(Document::new(9, "/z", 1)).unwrap();

        assert_eq!(docs.fetch(7).unwrap(), Some(Document::new(7, "/x", 5)));
        assert_eq!(docs.id_for_path("/x").unwrap(), Some(7));
        assert_eq!(docs.num_docs(), 3);
    }

    #[test]
    fn test_clear_memory_and_load() {
        let (storage, mut docs) = doclist(2);
        for id in 1..=5 {
            docs.add(Document::new(id, format!("/d/{id}"), id as u32)).unwrap();
        }
        docs.delete(2).unwrap();
        docs.clear_memory().unwrap();

        let mut reloaded = DocList::new(Arc::clone(&storage), text_segment_config(2));
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.stats(), docs.stats());
        assert_eq!(reloaded.fetch(2).unwrap(), None);
        for id in [1, 3, 4, 5] {
            assert_eq!(reloaded.fetch(id).unwrap().map(|d| d.length), Some(id as u32));
        }
    }
}
