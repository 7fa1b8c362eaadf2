//! The index facade: postings plus doclist behind add, delete and search.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use flash::config::IndexConfig;
//! use flash::index::Index;
//! use flash::storage::memory::MemoryStorage;
//!
//! let storage = Arc::new(MemoryStorage::new_default());
//! let mut index = Index::with_storage(IndexConfig::default(), storage).unwrap();
//! index.add_document(1, "/notes/a.txt", ["hello", "world"].map(String::from)).unwrap();
//! index.add_document(2, "/notes/b.txt", ["goodbye", "world"].map(String::from)).unwrap();
//!
//! let hits = index.search("hello", 10);
//! assert_eq!(hits[0].doc_id, 1);
//! ```

pub mod blacklist;
pub mod identity;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::analysis::{Tokenizer, UnicodeWordTokenizer};
use crate::config::{CONFIG_FILE_NAME, IndexConfig};
use crate::doclist::{DocList, Document};
use crate::error::Result;
use crate::partition::Collector;
use crate::postings::{POSTINGS_EXTENSION, PostingList, PostingPayload, PostingReader, posting_readers};
use crate::search::{SearchEngine, SearchHit};
use crate::storage::Storage;
use crate::storage::file::{FileStorage, FileStorageConfig};

pub use blacklist::Blacklist;
pub use identity::{IdentityProvider, PathHashIdentity, default_identity};
#[cfg(unix)]
pub use identity::InodeIdentity;

/// Corpus summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub num_docs: u32,
    pub avg_length: f64,
}

#[derive(Debug)]
pub struct Index {
    config: IndexConfig,
    storage: Arc<dyn Storage>,
    postings: Collector<PostingPayload>,
    docs: DocList,
    tokenizer: Box<dyn Tokenizer>,
    identity: Box<dyn IdentityProvider>,
    blacklist: Blacklist,
}

impl Index {
    /// Open the index stored in `config.index_dir`, or start an empty one.
    pub fn open(config: IndexConfig) -> Result<Self> {
        let storage = FileStorage::new(FileStorageConfig::new(&config.index_dir))?;
        Self::with_storage(config, Arc::new(storage))
    }

    /// Open the index held by `storage`.
    pub fn with_storage(config: IndexConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        config.validate()?;
        let blacklist = Blacklist::from_patterns(&config.blacklist)?;

        let mut postings = Collector::new(
            Arc::clone(&storage),
            POSTINGS_EXTENSION,
            config.postings_segment(),
        );
        let mut docs = DocList::new(Arc::clone(&storage), config.doclist_segment());
        let loaded = postings.load()? | docs.load()?;

        if loaded {
            info!(
                "Opened index at {}: {} documents",
                config.index_dir.display(),
                docs.num_docs()
            );
        } else {
            info!("No index at {}, starting empty", config.index_dir.display());
        }

        Ok(Index {
            tokenizer: Box::new(UnicodeWordTokenizer::new(config.token_queue_capacity)),
            identity: default_identity(),
            config,
            storage,
            postings,
            docs,
            blacklist,
        })
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_identity(mut self, identity: Box<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    /// Index a file, or every file beneath a directory.
    ///
    /// Returns the number of documents indexed. Failures inside a directory
    /// are logged and skipped; a failure on `path` itself is returned.
    pub fn add(&mut self, path: &Path) -> Result<usize> {
        if self.is_blacklisted(path) {
            debug!("Skipping blacklisted {}", path.display());
            return Ok(0);
        }

        if fs::metadata(path)?.is_dir() {
            return Ok(self.add_dir(path));
        }
        self.add_file(path)?;
        Ok(1)
    }

    fn add_dir(&mut self, dir: &Path) -> usize {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping {}: {e}", dir.display());
                return 0;
            }
        };

        let mut paths: Vec<_> = entries.filter_map(|entry| entry.ok().map(|e| e.path())).collect();
        paths.sort();

        let mut added = 0;
        for path in paths {
            if self.config.skip_hidden && is_hidden(&path) {
                continue;
            }
            match self.add(&path) {
                Ok(count) => added += count,
                Err(e) => warn!("Skipping {}: {e}", path.display()),
            }
        }
        added
    }

    fn add_file(&mut self, path: &Path) -> Result<()> {
        let id = self.identity.identify(path)?;
        let tokens = self.tokenizer.tokenize(path)?;
        self.add_document(id, &path.to_string_lossy(), tokens)
    }

    /// Index an already tokenized document.
    ///
    /// A document previously stored under the same id or path is replaced.
    pub fn add_document<I>(&mut self, id: u64, path: &str, terms: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        if let Some(old) = self.docs.id_for_path(path)? {
            self.delete_id(old)?;
        }
        self.delete_id(id)?;

        let mut frequencies: BTreeMap<String, u32> = BTreeMap::new();
        let mut length = 0u32;
        for term in terms {
            length = length.saturating_add(1);
            *frequencies.entry(term).or_default() += 1;
        }

        for (term, frequency) in &frequencies {
            self.postings.add(term, PostingList::single(id, *frequency))?;
        }
        self.docs.add(Document::new(id, path, length))?;
        debug!("Indexed {path} as {id}: {length} tokens, {} terms", frequencies.len());
        Ok(())
    }

    /// Remove the documents at `path` or beneath it. Returns how many were
    /// removed.
    pub fn delete(&mut self, path: &Path) -> Result<usize> {
        let matches = self.docs.ids_matching(&path.to_string_lossy())?;
        let mut removed = 0;
        for (_, id) in matches {
            if self.delete_id(id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Remove document `id`. Returns `false` when it was not indexed.
    pub fn delete_id(&mut self, id: u64) -> Result<bool> {
        if self.docs.delete(id)?.is_none() {
            return Ok(false);
        }
        self.postings.delete(&id.to_string())?;
        Ok(true)
    }

    pub fn get_info(&self) -> IndexInfo {
        IndexInfo {
            num_docs: self.docs.num_docs(),
            avg_length: self.docs.avg_length(),
        }
    }

    pub fn get_doc_info(&self, id: u64) -> Result<Option<Document>> {
        self.docs.fetch(id)
    }

    /// Readers over every segment's posting list for `term`.
    pub fn posting_readers(&self, term: &str) -> Result<Vec<PostingReader>> {
        posting_readers(&self.postings, term)
    }

    /// Up to `k` ranked documents. Failures are logged and yield no hits.
    pub fn search(&self, query: &str, k: usize) -> Vec<SearchHit> {
        match self.try_search(query, k) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Search for {query:?} failed: {e}");
                Vec::new()
            }
        }
    }

    pub fn try_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        SearchEngine::with_config(&self.postings, &self.docs, self.config.bm25).search(query, k)
    }

    /// Write all pending in-memory state to storage.
    pub fn clear_memory(&mut self) -> Result<()> {
        self.postings.clear_memory()?;
        self.docs.clear_memory()?;
        self.storage.sync()
    }

    /// Delete every index file and start empty. A configuration file stored
    /// next to the index is kept.
    pub fn reset(&mut self) -> Result<()> {
        for name in self.storage.list_files()? {
            if name != CONFIG_FILE_NAME {
                self.storage.delete_file(&name)?;
            }
        }
        self.postings = Collector::new(
            Arc::clone(&self.storage),
            POSTINGS_EXTENSION,
            self.config.postings_segment(),
        );
        self.docs = DocList::new(Arc::clone(&self.storage), self.config.doclist_segment());
        info!("Reset index at {}", self.config.index_dir.display());
        Ok(())
    }

    /// Add a blacklist pattern. Returns `false` if it was already present.
    pub fn blacklist(&mut self, pattern: &str) -> Result<bool> {
        let added = self.blacklist.add(pattern)?;
        if added {
            self.config.blacklist.push(pattern.to_string());
        }
        Ok(added)
    }

    /// Remove a blacklist pattern. Returns `false` if it was not present.
    pub fn remove_blacklist(&mut self, pattern: &str) -> bool {
        self.config.blacklist.retain(|p| p != pattern);
        self.blacklist.remove(pattern)
    }

    pub fn blacklist_patterns(&self) -> Vec<String> {
        self.blacklist.patterns()
    }

    pub fn is_blacklisted(&self, path: &Path) -> bool {
        self.blacklist.contains(&path.to_string_lossy())
    }

    /// Directory holding the index files.
    pub fn path(&self) -> &Path {
        &self.config.index_dir
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn postings(&self) -> &Collector<PostingPayload> {
        &self.postings
    }

    pub fn docs(&self) -> &DocList {
        &self.docs
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::storage::memory::MemoryStorage;

    fn terms(text: &str) -> Vec<String> {
        UnicodeWordTokenizer::words(text).collect()
    }

    fn memory_index() -> Index {
        let storage = Arc::new(MemoryStorage::new_default());
        Index::with_storage(IndexConfig::default(), storage).unwrap()
    }

    #[test]
    fn test_add_document_and_search() {
        let mut index = memory_index();
        index.add_document(10, "/a", terms("red fish blue fish")).unwrap();
        index.add_document(20, "/b", terms("one fish")).unwrap();
        index.add_document(30, "/c", terms("two birds")).unwrap();

        assert_eq!(index.get_info().num_docs, 3);
        assert_eq!(index.get_doc_info(10).unwrap().map(|d| d.length), Some(4));

        let hits = index.search("fish", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(index.posting_readers("fish").unwrap().len(), 1);
        assert!(index.search("cat", 10).is_empty());
    }

    #[test]
    fn test_readd_same_path_supersedes() {
        let mut index = memory_index();
        index.add_document(1, "/a", terms("old words")).unwrap();
        index.add_document(3, "/c", terms("unrelated text")).unwrap();
        index.add_document(2, "/a", terms("new words")).unwrap();

        assert_eq!(index.get_info().num_docs, 2);
        assert_eq!(index.get_doc_info(1).unwrap(), None);
        assert_eq!(index.docs().id_for_path("/a").unwrap(), Some(2));
        assert!(index.search("old", 5).is_empty());

        let hits = index.search("new", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 2);
    }

    #[test]
    fn test_term_in_every_document_scores_nothing() {
        let mut index = memory_index();
        index.add_document(1, "/a", terms("only")).unwrap();
        assert!(index.search("only", 5).is_empty());
        assert_eq!(index.posting_readers("only").unwrap().len(), 1);
    }

    #[test]
    fn test_bm25_parameters_come_from_config() {
        let build = |config: IndexConfig| {
            let storage = Arc::new(MemoryStorage::new_default());
            let mut index = Index::with_storage(config, storage).unwrap();
            index.add_document(1, "/short", terms("cat")).unwrap();
            index.add_document(2, "/long", terms("cat dog dog dog")).unwrap();
            index.add_document(3, "/other", terms("bird")).unwrap();
            index.search("cat", 5)
        };

        let hits = build(IndexConfig::default());
        assert_eq!(hits[0].doc_id, 1);
        assert!(hits[0].score > hits[1].score);

        let mut config = IndexConfig::default();
        config.bm25.b = 0.0;
        let hits = build(config);
        assert_eq!(hits.len(), 2);
        assert!((hits[0].score - hits[1].score).abs() < 1e-12);
    }

    #[test]
    fn test_search_with_unbounded_limit() {
        let mut index = memory_index();
        index.add_document(1, "/a", terms("cat sat")).unwrap();
        index.add_document(2, "/b", terms("dog")).unwrap();

        let hits = index.search("cat", usize::MAX);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 1);
    }

    #[test]
    fn test_delete_directory_prefix() {
        let mut index = memory_index();
        index.add_document(1, "/docs/a", terms("alpha")).unwrap();
        index.add_document(2, "/docs/sub/b", terms("alpha beta")).unwrap();
        index.add_document(3, "/other/c", terms("alpha gamma")).unwrap();

        assert_eq!(index.delete(Path::new("/docs")).unwrap(), 2);
        assert_eq!(index.get_info().num_docs, 1);
        assert_eq!(index.search("beta", 5), Vec::new());
        assert_eq!(index.delete(Path::new("/missing")).unwrap(), 0);
    }

    #[test]
    fn test_add_files_from_disk() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("corpus");
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::write(root.join("a.txt"), "the quick brown fox").unwrap();
        fs::write(root.join("nested/b.txt"), "the lazy dog").unwrap();
        fs::write(root.join(".hidden/c.txt"), "fox fox fox").unwrap();
        fs::write(root.join("skip.log"), "fox").unwrap();

        let config = IndexConfig {
            blacklist: vec![r"\.log$".to_string()],
            ..IndexConfig::new(dir.path().join("index"))
        };
        let mut index = Index::open(config).unwrap().with_identity(Box::new(PathHashIdentity));

        assert_eq!(index.add(&root).unwrap(), 2);
        assert_eq!(index.get_info().num_docs, 2);

        let hits = index.search("fox", 10);
        assert_eq!(hits.len(), 1);
        let doc = index.get_doc_info(hits[0].doc_id).unwrap().unwrap();
        assert!(doc.path.ends_with("a.txt"));

        assert!(index.add(&root.join("missing.txt")).is_err());
        assert_eq!(index.get_info().num_docs, 2);
    }

    #[test]
    fn test_clear_memory_and_reopen() {
        let dir = TempDir::new().unwrap();
        let config = IndexConfig::new(dir.path());
        {
            let mut index = Index::open(config.clone()).unwrap();
            index.add_document(1, "/a", terms("persistent words")).unwrap();
            index.add_document(2, "/b", terms("other words")).unwrap();
            index.clear_memory().unwrap();
        }

        let index = Index::open(config).unwrap();
        assert_eq!(index.get_info().num_docs, 2);
        assert_eq!(index.search("persistent", 5)[0].doc_id, 1);
    }

    #[test]
    fn test_reset() {
        let mut index = memory_index();
        index.add_document(1, "/a", terms("gone soon")).unwrap();
        index.clear_memory().unwrap();
        index.reset().unwrap();

        assert_eq!(index.get_info().num_docs, 0);
        assert!(index.search("gone", 5).is_empty());
        assert!(index.storage.list_files().unwrap().is_empty());
    }

    #[test]
    fn test_blacklist_updates_config() {
        let mut index = memory_index();
        assert!(index.blacklist("/tmp/").unwrap());
        assert!(!index.blacklist("/tmp/").unwrap());
        assert!(index.is_blacklisted(Path::new("/tmp/x")));
        assert_eq!(index.config().blacklist, vec!["/tmp/"]);

        assert!(index.remove_blacklist("/tmp/"));
        assert!(index.config().blacklist.is_empty());
        assert!(index.blacklist_patterns().is_empty());
        assert!(index.blacklist("(").is_err());
    }
}
