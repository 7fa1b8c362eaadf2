//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{FlashArgs, OutputFormat};
use crate::doclist::Document;
use crate::error::Result;

/// Plain-text rendering of a command result.
pub trait HumanOutput {
    fn human(&self) -> String;
}

/// Result structure for `add` and `delete`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateResult {
    pub documents: usize,
    pub failed: Vec<String>,
}

impl HumanOutput for UpdateResult {
    fn human(&self) -> String {
        let mut out = format!("{} documents", self.documents);
        for failure in &self.failed {
            out.push_str(&format!("\nfailed: {failure}"));
        }
        out
    }
}

/// One ranked document.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRow {
    pub doc_id: u64,
    pub score: f64,
    pub path: Option<String>,
}

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub hits: Vec<SearchRow>,
}

impl HumanOutput for SearchResults {
    fn human(&self) -> String {
        if self.hits.is_empty() {
            return format!("No results for {:?}", self.query);
        }
        self.hits
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                format!(
                    "{:>3}. {:.3}  {}",
                    i + 1,
                    hit.score,
                    hit.path.as_deref().unwrap_or("<unknown>")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Index statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexStats {
    pub index_dir: String,
    pub num_docs: u32,
    pub avg_length: f64,
    pub postings_generations: Vec<u32>,
    pub doclist_generations: Vec<u32>,
}

impl HumanOutput for IndexStats {
    fn human(&self) -> String {
        format!(
            "Index:      {}\nDocuments:  {}\nAvg length: {:.2}\nPostings:   generations {:?}\nDoclist:    generations {:?}",
            self.index_dir,
            self.num_docs,
            self.avg_length,
            self.postings_generations,
            self.doclist_generations
        )
    }
}

impl HumanOutput for Document {
    fn human(&self) -> String {
        format!("id:     {}\npath:   {}\nlength: {}", self.id, self.path, self.length)
    }
}

/// Result structure for blacklist commands.
#[derive(Debug, Serialize, Deserialize)]
pub struct BlacklistResult {
    pub changed: bool,
    pub patterns: Vec<String>,
}

impl HumanOutput for BlacklistResult {
    fn human(&self) -> String {
        if self.patterns.is_empty() {
            return "Blacklist is empty".to_string();
        }
        self.patterns.join("\n")
    }
}

/// Result structure for `reset`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResult {
    pub index_dir: String,
}

impl HumanOutput for ResetResult {
    fn human(&self) -> String {
        format!("Reset {}", self.index_dir)
    }
}

/// Output a result in the selected format.
pub fn output_result<T: Serialize + HumanOutput>(result: &T, args: &FlashArgs) -> Result<()> {
    println!("{}", render(result, args.output_format)?);
    Ok(())
}

pub fn render<T: Serialize + HumanOutput>(result: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(result.human()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
    }
}
