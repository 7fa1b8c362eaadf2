//! Command line argument parsing for the flash CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// flash - desktop full-text search
#[derive(Parser, Debug, Clone)]
#[command(name = "flash")]
#[command(about = "Index local files and search them with BM25 ranking")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct FlashArgs {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory holding the index files
    #[arg(long, env = "FLASH_INDEX_DIR", value_name = "DIR")]
    pub index_dir: Option<PathBuf>,

    /// Configuration file (JSON); defaults to <index-dir>/flash.json
    #[arg(short, long, env = "FLASH_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl FlashArgs {
    /// Effective verbosity: 0 errors only, 1 warnings (default), 2 info, 3+ debug.
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose.saturating_add(1)
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Index files or directories
    Add(PathsArgs),

    /// Remove files or directories from the index
    Delete(PathsArgs),

    /// Search the index
    Search(SearchArgs),

    /// Show index statistics
    Info,

    /// Show a stored document
    Doc(DocArgs),

    /// Manage path patterns that are never indexed
    Blacklist {
        #[command(subcommand)]
        action: BlacklistAction,
    },

    /// Delete every index file
    Reset,
}

#[derive(Parser, Debug, Clone)]
pub struct PathsArgs {
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Query words
    #[arg(value_name = "QUERY", required = true)]
    pub query: Vec<String>,

    /// Maximum number of results to return
    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: usize,
}

impl SearchArgs {
    pub fn query_string(&self) -> String {
        self.query.join(" ")
    }
}

#[derive(Parser, Debug, Clone)]
pub struct DocArgs {
    /// Document id
    pub id: u64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum BlacklistAction {
    /// Add a pattern
    Add { pattern: String },
    /// Remove a pattern
    Remove { pattern: String },
    /// List the patterns
    List,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    Human,
    /// JSON
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_command() {
        let args =
            FlashArgs::try_parse_from(["flash", "search", "red", "fish", "-n", "3"]).unwrap();

        if let Command::Search(search_args) = args.command {
            assert_eq!(search_args.query_string(), "red fish");
            assert_eq!(search_args.limit, 3);
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_add_requires_paths() {
        assert!(FlashArgs::try_parse_from(["flash", "add"]).is_err());

        let args = FlashArgs::try_parse_from(["flash", "add", "/a", "/b"]).unwrap();
        if let Command::Add(add_args) = args.command {
            assert_eq!(add_args.paths, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        } else {
            panic!("Expected Add command");
        }
    }

    #[test]
    fn test_blacklist_subcommands() {
        let args = FlashArgs::try_parse_from(["flash", "blacklist", "add", r"\.git/"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Blacklist {
                action: BlacklistAction::Add { ref pattern }
            } if pattern == r"\.git/"
        ));

        let args = FlashArgs::try_parse_from(["flash", "blacklist", "list"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Blacklist {
                action: BlacklistAction::List
            }
        ));
    }

    #[test]
    fn test_verbosity_levels() {
        let args = FlashArgs::try_parse_from(["flash", "info"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = FlashArgs::try_parse_from(["flash", "-vv", "info"]).unwrap();
        assert_eq!(args.verbosity(), 3);

        let args = FlashArgs::try_parse_from(["flash", "--quiet", "-v", "info"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_global_options() {
        let args = FlashArgs::try_parse_from([
            "flash",
            "--index-dir",
            "/tmp/idx",
            "--format",
            "json",
            "doc",
            "42",
        ])
        .unwrap();

        assert_eq!(args.index_dir, Some(PathBuf::from("/tmp/idx")));
        assert_eq!(args.output_format, OutputFormat::Json);
        assert!(matches!(args.command, Command::Doc(DocArgs { id: 42 })));
    }
}
