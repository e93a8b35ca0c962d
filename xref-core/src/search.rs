//! The search pipeline: walk, match, resolve, traverse, aggregate.

use crate::aggregate::ResultAggregator;
use crate::config::Config;
use crate::error::XrefError;
use crate::exports::{ExportExtractor, ExportRecord};
use crate::fuzzy::FuzzyScorer;
use crate::graph::{DependencyEdge, DependencyGraphBuilder, ReverseDependency};
use crate::imports::ImportRecord;
use crate::language::Language;
use crate::model::{Match, MatchType, SearchQuery};
use crate::pattern::PatternMatcher;
use crate::resolve::{normalize_path, PathResolver};
use crate::text_search::{search_text, TextQuery, TextSearchOutcome};
use crate::walk::{read_source, FileWalker, ListingCache};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reverse dependencies reported per defining file in a symbol search
const IMPORTERS_PER_TARGET: usize = 5;

/// Result of one symbol search
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub query: SearchQuery,
    pub matches: Vec<Match>,
    /// Distinct matches found before truncation; a lower bound when
    /// `stopped_early` is set
    pub total_matches: usize,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub truncated: bool,
    pub stopped_early: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub analyses: Vec<FileAnalysis>,
}

/// Import/export/dependency view of one file. Paths are relative to the
/// invocation root.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imports: Option<Vec<ImportRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<Vec<ExportRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse_dependencies: Option<Vec<ReverseDependency>>,
}

/// What to include in a [`FileAnalysis`]
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisOptions {
    pub imports: bool,
    pub dependency_depth: Option<usize>,
    pub reverse_dependencies: bool,
}

/// Per-request state shared by the analysis steps
struct RequestContext<'a> {
    root: &'a Path,
    graph: DependencyGraphBuilder<'a>,
    /// Files considered when looking for importers
    candidates: Vec<PathBuf>,
}

pub struct SearchEngine {
    config: Config,
    cache: Option<Arc<ListingCache>>,
}

impl SearchEngine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    /// Share a directory-listing cache with other engines or requests.
    pub fn with_cache(mut self, cache: Arc<ListingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a symbol search rooted at `root`. `query.base_path` is relative to
    /// `root`; reported paths are relative to `root`.
    pub fn search(&self, query: SearchQuery, root: &Path) -> crate::Result<SearchOutcome> {
        let query = query.normalized()?;
        let root = absolute_root(root)?;
        let base = normalize_path(&root.join(&query.base_path));
        if !base.exists() {
            return Err(XrefError::PathNotFound(PathBuf::from(&query.base_path)));
        }

        let output = self
            .walker(&base, self.config.search.max_file_bytes)
            .walk(|p| Language::from_path(p).is_source())?;
        let mut files: Vec<(String, PathBuf)> = output
            .files
            .iter()
            .map(|p| (display_path(p, &root), p.clone()))
            .collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let search_type = query.search_type;
        let wants_importers = search_type.includes_importers();
        let mut categories = search_type.categories().to_vec();
        let hidden_definitions = wants_importers && !categories.contains(&MatchType::Definition);
        if hidden_definitions {
            categories.push(MatchType::Definition);
        }
        let matcher = PatternMatcher::new(
            query.symbol.as_str(),
            &categories,
            FuzzyScorer::new(self.config.scoring),
        )
        .fuzzy(query.fuzzy_match)
        .include_comments(query.include_comments);

        // Exact matches all score 1.0 and files are visited in result order,
        // so once the cap is reached later files cannot displace anything.
        let can_stop_early = !query.fuzzy_match && !wants_importers;

        let mut aggregator = ResultAggregator::new(query.max_results);
        let mut defining_files = Vec::new();
        let mut files_scanned = 0;
        let mut files_skipped = output.skipped();
        let mut stopped_early = false;

        for (index, (display, path)) in files.iter().enumerate() {
            let content = match read_source(path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping unreadable file");
                    files_skipped += 1;
                    continue;
                }
            };
            files_scanned += 1;

            let language = Language::from_path(path);
            let mut defines = false;
            for (line_index, line) in content.lines().enumerate() {
                for hit in matcher.match_line(line, language) {
                    if hit.match_type == MatchType::Definition {
                        defines = true;
                        if hidden_definitions {
                            continue;
                        }
                    }
                    aggregator.push(Match {
                        file: display.clone(),
                        line: line_index + 1,
                        content: line.to_string(),
                        match_type: hit.match_type,
                        confidence: hit.confidence,
                    });
                }
            }
            if defines {
                defining_files.push(path.clone());
            }

            if can_stop_early && aggregator.is_full() && index + 1 < files.len() {
                stopped_early = true;
                break;
            }
        }

        let resolver = PathResolver::new();
        let context = RequestContext {
            root: &root,
            graph: self.graph(&resolver),
            candidates: files
                .iter()
                .map(|(_, p)| p.clone())
                .filter(|p| Language::from_path(p).has_imports())
                .collect(),
        };

        if wants_importers {
            let targets = defining_files.iter().take(self.config.search.analysis_file_limit);
            for target in targets {
                let importers = context
                    .graph
                    .reverse_dependencies_among(target, &context.candidates);
                for importer in importers.into_iter().take(IMPORTERS_PER_TARGET) {
                    aggregator.push(Match {
                        file: display_path(&importer.file, &root),
                        line: importer.line,
                        content: importer.content,
                        match_type: MatchType::ReverseDependencies,
                        confidence: 1.0,
                    });
                }
            }
        }

        let results = aggregator.finish();

        let mut analyses = Vec::new();
        if query.wants_analysis() {
            let options = AnalysisOptions {
                imports: query.analyze_imports,
                dependency_depth: query.include_dependencies.then_some(query.depth_level),
                reverse_dependencies: query.include_reverse_dependencies,
            };
            let mut seen = HashSet::new();
            let top_files = results
                .matches
                .iter()
                .filter(|m| seen.insert(m.file.as_str()))
                .take(self.config.search.analysis_file_limit);
            for m in top_files {
                let path = normalize_path(&root.join(&m.file));
                analyses.push(self.analyze_path(&path, &context, options));
            }
        }

        tracing::info!(
            symbol = %query.symbol,
            search_type = %query.search_type,
            matches = results.matches.len(),
            total = results.total,
            files_scanned,
            files_skipped,
            "symbol search complete"
        );

        Ok(SearchOutcome {
            query,
            matches: results.matches,
            total_matches: results.total,
            files_scanned,
            files_skipped,
            truncated: results.truncated || stopped_early,
            stopped_early,
            analyses,
        })
    }

    /// Imports, exports and optionally dependencies of a single file.
    pub fn analyze_file(
        &self,
        file: &str,
        root: &Path,
        options: AnalysisOptions,
    ) -> crate::Result<FileAnalysis> {
        let root = absolute_root(root)?;
        let path = normalize_path(&root.join(file));
        if !path.is_file() {
            return Err(XrefError::PathNotFound(PathBuf::from(file)));
        }

        let resolver = PathResolver::new();
        let candidates = if options.reverse_dependencies {
            self.walker(&root, self.config.search.max_file_bytes)
                .walk(|p| Language::from_path(p).has_imports())?
                .files
        } else {
            Vec::new()
        };
        let context = RequestContext {
            root: &root,
            graph: self.graph(&resolver),
            candidates,
        };
        Ok(self.analyze_path(&path, &context, options))
    }

    /// Every dependency edge reachable from `file` within `depth` hops.
    pub fn dependency_edges(
        &self,
        file: &str,
        depth: usize,
        root: &Path,
    ) -> crate::Result<Vec<DependencyEdge>> {
        let root = absolute_root(root)?;
        let path = normalize_path(&root.join(file));
        if !path.is_file() {
            return Err(XrefError::PathNotFound(PathBuf::from(file)));
        }
        let resolver = PathResolver::new();
        let depth = depth.clamp(crate::model::MIN_DEPTH, crate::model::MAX_DEPTH);
        Ok(self
            .graph(&resolver)
            .dependency_edges(&path, depth)
            .into_iter()
            .map(|edge| DependencyEdge {
                from: PathBuf::from(display_path(&edge.from, &root)),
                to: PathBuf::from(display_path(&edge.to, &root)),
            })
            .collect())
    }

    /// Resolve an import source as written in `from_file`.
    pub fn resolve_import(
        &self,
        source: &str,
        from_file: &str,
        root: &Path,
    ) -> crate::Result<Option<String>> {
        let root = absolute_root(root)?;
        let from = normalize_path(&root.join(from_file));
        if !from.is_file() {
            return Err(XrefError::PathNotFound(PathBuf::from(from_file)));
        }
        let resolver = PathResolver::new();
        Ok(resolver
            .resolve(source, &from)
            .map(|p| display_path(&p, &root)))
    }

    /// Full-content line search.
    pub fn text_search(&self, query: TextQuery, root: &Path) -> crate::Result<TextSearchOutcome> {
        let root = absolute_root(root)?;
        search_text(query, &root, &self.config, self.cache.as_deref())
    }

    fn walker<'a>(&'a self, root: &Path, max_file_bytes: u64) -> FileWalker<'a> {
        let walker = FileWalker::new(root, &self.config.walk).max_file_bytes(max_file_bytes);
        match self.cache.as_deref() {
            Some(cache) => walker.with_cache(cache),
            None => walker,
        }
    }

    fn graph<'a>(&'a self, resolver: &'a PathResolver) -> DependencyGraphBuilder<'a> {
        let graph = DependencyGraphBuilder::new(resolver, &self.config.walk)
            .max_file_bytes(self.config.search.max_file_bytes);
        match self.cache.as_deref() {
            Some(cache) => graph.with_cache(cache),
            None => graph,
        }
    }

    fn analyze_path(
        &self,
        path: &Path,
        context: &RequestContext<'_>,
        options: AnalysisOptions,
    ) -> FileAnalysis {
        let root = context.root;
        let mut analysis = FileAnalysis {
            file: display_path(path, root),
            ..Default::default()
        };

        if options.imports {
            let imports = context
                .graph
                .imports(path)
                .into_iter()
                .map(|mut record| {
                    record.resolved_path = record
                        .resolved_path
                        .map(|p| PathBuf::from(display_path(&p, root)));
                    record
                })
                .collect();
            analysis.imports = Some(imports);

            let exports = match read_source(path) {
                Ok(content) => ExportExtractor::new().extract(&content, path),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping unreadable file");
                    Vec::new()
                }
            };
            analysis.exports = Some(exports);
        }

        if let Some(depth) = options.dependency_depth {
            let deps = context
                .graph
                .deep_dependencies(path, depth, &mut HashSet::new())
                .iter()
                .map(|p| display_path(p, root))
                .collect();
            analysis.dependency_depth = Some(depth);
            analysis.dependencies = Some(deps);
        }

        if options.reverse_dependencies {
            let reverse = context
                .graph
                .reverse_dependencies_among(path, &context.candidates)
                .into_iter()
                .map(|mut rev| {
                    rev.file = PathBuf::from(display_path(&rev.file, root));
                    rev
                })
                .collect();
            analysis.reverse_dependencies = Some(reverse);
        }

        analysis
    }
}

fn absolute_root(root: &Path) -> crate::Result<PathBuf> {
    Ok(normalize_path(&std::path::absolute(root)?))
}

/// `path` relative to `root` with `/` separators, or the full path when it
/// lies outside `root`.
pub fn display_path(path: &Path, root: &Path) -> String {
    let relative = match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel,
        Ok(_) => path.file_name().map(Path::new).unwrap_or(path),
        Err(_) => path,
    };
    relative.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SearchType;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("user.ts"), "export function getUser() {}\n").unwrap();
        fs::write(src.join("app.ts"), "import { getUser } from './user'\n\ngetUser();\n").unwrap();
        dir
    }

    fn engine() -> SearchEngine {
        SearchEngine::new(Config::default())
    }

    #[test]
    fn test_definition_search() {
        let dir = fixture();
        let outcome = engine()
            .search(
                SearchQuery::new("getUser").with_search_type(SearchType::Definition),
                dir.path(),
            )
            .unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].file, "src/user.ts");
        assert_eq!(outcome.matches[0].line, 1);
        assert_eq!(outcome.matches[0].confidence, 1.0);
        assert_eq!(outcome.files_scanned, 2);
    }

    #[test]
    fn test_non_utf8_file_is_searched() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("legacy.js"), b"// caf\xe9\nfunction getUser() {}\n").unwrap();
        let outcome = engine()
            .search(
                SearchQuery::new("getUser").with_search_type(SearchType::Definition),
                dir.path(),
            )
            .unwrap();
        assert_eq!(outcome.files_scanned, 1);
        assert_eq!(outcome.files_skipped, 0);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].file, "legacy.js");
        assert_eq!(outcome.matches[0].line, 2);
    }

    #[test]
    fn test_reverse_dependency_search_reports_importers() {
        let dir = fixture();
        let outcome = engine()
            .search(
                SearchQuery::new("getUser").with_search_type(SearchType::ReverseDependencies),
                dir.path(),
            )
            .unwrap();
        assert!(outcome
            .matches
            .iter()
            .any(|m| m.file == "src/app.ts" && m.line == 1
                && m.match_type == MatchType::ReverseDependencies));
        assert!(outcome
            .matches
            .iter()
            .all(|m| m.match_type == MatchType::ReverseDependencies));
    }

    #[test]
    fn test_missing_base_path_is_recoverable() {
        let dir = fixture();
        let err = engine()
            .search(SearchQuery::new("getUser").with_base_path("nope"), dir.path())
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_analysis_of_top_files() {
        let dir = fixture();
        let outcome = engine()
            .search(
                SearchQuery::new("getUser")
                    .with_search_type(SearchType::Definition)
                    .with_imports()
                    .with_reverse_dependencies()
                    .with_dependencies(2),
                dir.path(),
            )
            .unwrap();
        assert_eq!(outcome.analyses.len(), 1);
        let analysis = &outcome.analyses[0];
        assert_eq!(analysis.file, "src/user.ts");
        assert_eq!(analysis.exports.as_ref().unwrap()[0].name, "getUser");
        assert_eq!(analysis.dependencies.as_ref().unwrap().len(), 0);
        let reverse = analysis.reverse_dependencies.as_ref().unwrap();
        assert_eq!(reverse[0].file, PathBuf::from("src/app.ts"));
    }

    #[test]
    fn test_resolve_import_relative_to_root() {
        let dir = fixture();
        let resolved = engine()
            .resolve_import("./user", "src/app.ts", dir.path())
            .unwrap();
        assert_eq!(resolved.as_deref(), Some("src/user.ts"));
        assert!(engine()
            .resolve_import("./user", "src/gone.ts", dir.path())
            .is_err());
    }

    #[test]
    fn test_early_stop_keeps_first_files() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("f{}.py", i)), "x = token\ny = token\n").unwrap();
        }
        let outcome = engine()
            .search(
                SearchQuery::new("token")
                    .with_search_type(SearchType::Usage)
                    .with_max_results(3),
                dir.path(),
            )
            .unwrap();
        let got: Vec<(&str, usize)> = outcome
            .matches
            .iter()
            .map(|m| (m.file.as_str(), m.line))
            .collect();
        assert_eq!(got, vec![("f0.py", 1), ("f0.py", 2), ("f1.py", 1)]);
        assert!(outcome.stopped_early);
        assert!(outcome.truncated);
    }

    #[test]
    fn test_display_path() {
        let root = Path::new("/repo");
        assert_eq!(display_path(Path::new("/repo/src/a.ts"), root), "src/a.ts");
        assert_eq!(display_path(Path::new("/elsewhere/b.ts"), root), "/elsewhere/b.ts");
    }
}
