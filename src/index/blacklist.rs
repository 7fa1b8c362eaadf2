//! Path patterns excluded from indexing.

use regex::Regex;

use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    patterns: Vec<Regex>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut blacklist = Self::new();
        for pattern in patterns {
            blacklist.add(pattern.as_ref())?;
        }
        Ok(blacklist)
    }

    /// Add a pattern. Returns `false` if it was already present.
    pub fn add(&mut self, pattern: &str) -> Result<bool> {
        if self.patterns.iter().any(|re| re.as_str() == pattern) {
            return Ok(false);
        }
        self.patterns.push(Regex::new(pattern)?);
        Ok(true)
    }

    /// Remove a pattern. Returns `false` if it was not present.
    pub fn remove(&mut self, pattern: &str) -> bool {
        let before = self.patterns.len();
        self.patterns.retain(|re| re.as_str() != pattern);
        self.patterns.len() != before
    }

    pub fn patterns(&self) -> Vec<String> {
        self.patterns.iter().map(|re| re.as_str().to_string()).collect()
    }

    pub fn reset(&mut self) {
        self.patterns.clear();
    }

    /// Whether any pattern matches `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(path))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
