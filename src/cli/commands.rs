//! Command implementations for the flash CLI.

use std::path::{Path, PathBuf};

use log::debug;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::{CONFIG_FILE_NAME, IndexConfig};
use crate::error::{FlashError, Result};
use crate::index::Index;

/// Execute a CLI command.
pub fn execute_command(args: FlashArgs) -> Result<()> {
    let (config, config_path) = resolve_config(&args)?;
    let mut index = Index::open(config)?;

    match &args.command {
        Command::Add(paths) => update(&mut index, &paths.paths, &args, add_path),
        Command::Delete(paths) => update(&mut index, &paths.paths, &args, delete_path),
        Command::Search(search_args) => search(&index, search_args, &args),
        Command::Info => output_result(&stats(&index), &args),
        Command::Doc(doc_args) => match index.get_doc_info(doc_args.id)? {
            Some(doc) => output_result(&doc, &args),
            None => Err(FlashError::not_found(format!("document {}", doc_args.id))),
        },
        Command::Blacklist { action } => blacklist(&mut index, action, &config_path, &args),
        Command::Reset => {
            index.reset()?;
            output_result(
                &ResetResult {
                    index_dir: index.path().display().to_string(),
                },
                &args,
            )
        }
    }
}

/// Load the configuration file, if any, and apply the command line overrides.
pub fn resolve_config(args: &FlashArgs) -> Result<(IndexConfig, PathBuf)> {
    let index_dir = args
        .index_dir
        .clone()
        .unwrap_or_else(|| IndexConfig::default().index_dir);
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| index_dir.join(CONFIG_FILE_NAME));

    let mut config = if config_path.exists() {
        debug!("Loading configuration from {}", config_path.display());
        IndexConfig::load(&config_path)?
    } else {
        IndexConfig::default()
    };
    if args.index_dir.is_some() || !config_path.exists() {
        config.index_dir = index_dir;
    }
    config.validate()?;
    Ok((config, config_path))
}

fn add_path(index: &mut Index, path: &Path) -> Result<usize> {
    index.add(&path.canonicalize()?)
}

fn delete_path(index: &mut Index, path: &Path) -> Result<usize> {
    // The file may already be gone, so fall back to the absolute form.
    let path = path
        .canonicalize()
        .or_else(|_| std::path::absolute(path))?;
    index.delete(&path)
}

fn update<F>(index: &mut Index, paths: &[PathBuf], args: &FlashArgs, apply: F) -> Result<()>
where
    F: Fn(&mut Index, &Path) -> Result<usize>,
{
    let mut result = UpdateResult::default();
    for path in paths {
        match apply(index, path) {
            Ok(count) => result.documents += count,
            Err(e) => result.failed.push(format!("{}: {e}", path.display())),
        }
    }
    index.clear_memory()?;
    output_result(&result, args)?;

    if result.failed.is_empty() {
        Ok(())
    } else {
        Err(FlashError::index(format!(
            "{} of {} paths failed",
            result.failed.len(),
            paths.len()
        )))
    }
}

fn search(index: &Index, search_args: &SearchArgs, args: &FlashArgs) -> Result<()> {
    let query = search_args.query_string();
    let mut hits = Vec::new();
    for hit in index.try_search(&query, search_args.limit)? {
        hits.push(SearchRow {
            doc_id: hit.doc_id,
            score: hit.score,
            path: index.get_doc_info(hit.doc_id)?.map(|doc| doc.path),
        });
    }
    output_result(&SearchResults { query, hits }, args)
}

fn stats(index: &Index) -> IndexStats {
    let info = index.get_info();
    IndexStats {
        index_dir: index.path().display().to_string(),
        num_docs: info.num_docs,
        avg_length: info.avg_length,
        postings_generations: index.postings().generations(),
        doclist_generations: index.docs().docs().generations(),
    }
}

fn blacklist(
    index: &mut Index,
    action: &BlacklistAction,
    config_path: &Path,
    args: &FlashArgs,
) -> Result<()> {
    let changed = match action {
        BlacklistAction::Add { pattern } => index.blacklist(pattern)?,
        BlacklistAction::Remove { pattern } => index.remove_blacklist(pattern),
        BlacklistAction::List => false,
    };
    if changed {
        index.config().save(config_path)?;
    }
    output_result(
        &BlacklistResult {
            changed,
            patterns: index.blacklist_patterns(),
        },
        args,
    )
}
