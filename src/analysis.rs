//! Text analysis: tokenizers and term normalization.

pub mod token;
pub mod tokenizer;

pub use token::TokenStream;
pub use tokenizer::Tokenizer;
pub use tokenizer::unicode_word::UnicodeWordTokenizer;

/// Normalized form of a word as stored in the index.
pub fn normalize(word: &str) -> String {
    word.to_lowercase()
}

/// Distinct normalized terms of a query, in first-seen order.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in UnicodeWordTokenizer::words(query) {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}
