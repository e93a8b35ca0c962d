//! Full-content line search (literal or regex) across a tree

use crate::config::Config;
use crate::error::XrefError;
use crate::model::{DEFAULT_MAX_RESULTS, MAX_RESULTS_LIMIT};
use crate::resolve::normalize_path;
use crate::search::display_path;
use crate::walk::{read_source, FileWalker, ListingCache};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Lines longer than this are shortened in results
const MAX_LINE_CHARS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextQuery {
    pub pattern: String,
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Treat `pattern` as a regular expression instead of a literal
    #[serde(default)]
    pub regex: bool,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_base_path() -> String {
    ".".to_string()
}
fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl TextQuery {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            base_path: default_base_path(),
            regex: false,
            case_sensitive: false,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMatch {
    pub file: String,
    pub line: usize,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSearchOutcome {
    pub query: TextQuery,
    pub matches: Vec<TextMatch>,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub truncated: bool,
}

/// Search every readable text file under `root/query.base_path` for lines
/// matching the pattern. Files above the text-search size cap are skipped;
/// files that are not valid UTF-8 are skipped.
pub fn search_text(
    mut query: TextQuery,
    root: &Path,
    config: &Config,
    cache: Option<&ListingCache>,
) -> crate::Result<TextSearchOutcome> {
    if query.pattern.is_empty() {
        return Err(XrefError::InvalidQuery("pattern must not be empty".to_string()));
    }
    query.max_results = query.max_results.clamp(1, MAX_RESULTS_LIMIT);

    let source = if query.regex {
        query.pattern.clone()
    } else {
        regex::escape(&query.pattern)
    };
    let matcher = RegexBuilder::new(&source)
        .case_insensitive(!query.case_sensitive)
        .build()?;

    let base = normalize_path(&root.join(&query.base_path));
    if !base.exists() {
        return Err(XrefError::PathNotFound(PathBuf::from(&query.base_path)));
    }

    let mut walker =
        FileWalker::new(&base, &config.walk).max_file_bytes(config.search.text_max_file_bytes);
    if let Some(cache) = cache {
        walker = walker.with_cache(cache);
    }
    let output = walker.walk(|_| true)?;

    let mut files: Vec<(String, &PathBuf)> = output
        .files
        .iter()
        .map(|p| (display_path(p, root), p))
        .collect();
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut matches = Vec::new();
    let mut files_scanned = 0;
    let mut files_skipped = output.skipped();
    let mut truncated = false;

    'files: for (display, path) in files {
        let content = match read_source(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping unreadable file");
                files_skipped += 1;
                continue;
            }
        };
        files_scanned += 1;

        for (index, line) in content.lines().enumerate() {
            if !matcher.is_match(line) {
                continue;
            }
            if matches.len() == query.max_results {
                truncated = true;
                break 'files;
            }
            matches.push(TextMatch {
                file: display.clone(),
                line: index + 1,
                content: shorten(line),
            });
        }
    }

    tracing::info!(
        pattern = %query.pattern,
        matches = matches.len(),
        files_scanned,
        files_skipped,
        "text search complete"
    );

    Ok(TextSearchOutcome {
        query,
        matches,
        files_scanned,
        files_skipped,
        truncated,
    })
}

fn shorten(line: &str) -> String {
    if line.chars().count() <= MAX_LINE_CHARS {
        return line.to_string();
    }
    let mut short: String = line.chars().take(MAX_LINE_CHARS).collect();
    short.push_str("...");
    short
}
