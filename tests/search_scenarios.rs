#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use flash::analysis::UnicodeWordTokenizer;
    use flash::config::IndexConfig;
    use flash::index::Index;
    use flash::storage::memory::MemoryStorageConfig;
    use flash::storage::{StorageConfig, StorageFactory};

    const A: u64 = 101;
    const B: u64 = 102;
    const C: u64 = 103;

    fn small_config(limit: usize) -> IndexConfig {
        IndexConfig {
            postings_segment_limit: limit,
            doclist_segment_limit: limit,
            dictionary_block_size: 64,
            ..IndexConfig::default()
        }
    }

    fn animals(config: IndexConfig) -> Index {
        let storage =
            StorageFactory::create(StorageConfig::Memory(MemoryStorageConfig::default())).unwrap();
        let mut index = Index::with_storage(config, Arc::clone(&storage)).unwrap();
        for (id, path, text) in [
            (A, "/a", "the cat sat"),
            (B, "/b", "the cat ran"),
            (C, "/c", "a dog ran"),
        ] {
            let terms = UnicodeWordTokenizer::words(text).collect::<Vec<_>>();
            index.add_document(id, path, terms).unwrap();
        }
        index
    }

    #[test]
    fn test_cat_returns_both_cat_documents() {
        for config in [IndexConfig::default(), small_config(1), small_config(2)] {
            let index = animals(config);
            let hits = index.search("cat", 2);

            let mut ids: Vec<u64> = hits.iter().map(|h| h.doc_id).collect();
            ids.sort();
            assert_eq!(ids, vec![A, B]);
            assert!(hits[0].score > 0.0);
            assert!((hits[0].score - hits[1].score).abs() < 1e-12);
        }
    }

    #[test]
    fn test_dog_returns_only_c() {
        let index = animals(small_config(2));
        let hits = index.search("dog", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, C);
    }

    #[test]
    fn test_case_and_punctuation_are_normalized() {
        let index = animals(small_config(2));
        assert_eq!(index.search("DOG!", 10).len(), 1);
        assert!(index.search("", 10).is_empty());
        assert!(index.search("unicorn", 10).is_empty());
    }

    #[test]
    fn test_results_sorted_descending() {
        let storage =
            StorageFactory::create(StorageConfig::Memory(MemoryStorageConfig::default())).unwrap();
        let mut index = Index::with_storage(small_config(3), storage).unwrap();
        let texts = [
            "rust rust rust borrow",
            "rust borrow checker",
            "python garbage collector",
            "rust",
            "borrow checker lifetimes rust rust",
            "garbage",
        ];
        for (i, text) in texts.iter().enumerate() {
            let terms = UnicodeWordTokenizer::words(text).collect::<Vec<_>>();
            index
                .add_document(i as u64 + 1, &format!("/doc{i}"), terms)
                .unwrap();
        }

        let hits = index.search("rust borrow", 10);
        assert_eq!(hits.len(), 4);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_term_frequency_never_lowers_score() {
        // Same length, one more occurrence of the query term.
        let storage =
            StorageFactory::create(StorageConfig::Memory(MemoryStorageConfig::default())).unwrap();
        let mut index = Index::with_storage(small_config(2), storage).unwrap();
        let docs = [
            (1, "apple pear plum fig"),
            (2, "apple apple plum fig"),
            (3, "kiwi lime lemon date"),
        ];
        for (id, text) in docs {
            let terms = UnicodeWordTokenizer::words(text).collect::<Vec<_>>();
            index.add_document(id, &format!("/{id}"), terms).unwrap();
        }

        let hits = index.search("apple", 10);
        assert_eq!(hits[0].doc_id, 2);
        assert!(hits[0].score > hits[1].score);
    }
}
