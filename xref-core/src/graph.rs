//! Dependency graph traversal over resolved imports.
//!
//! The graph is never materialized: edges are discovered on demand by
//! extracting and resolving a file's imports, memoized per builder.

use crate::config::WalkConfig;
use crate::imports::{ImportExtractor, ImportRecord};
use crate::language::Language;
use crate::resolve::{normalize_path, PathResolver};
use crate::walk::{read_source, FileWalker, ListingCache};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// `from` imports `to`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Why a file was reported as importing the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Evidence {
    /// The import resolves to the target file
    Resolved,
    /// The import could not be resolved, but its last segment names the target
    NameMatch,
}

impl Evidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::NameMatch => "name-match",
        }
    }
}

/// A file importing the target, at the importing line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseDependency {
    pub file: PathBuf,
    pub line: usize,
    pub content: String,
    pub evidence: Evidence,
}

/// Imports of one file, with the source line of each record
#[derive(Debug, Default)]
struct ScannedImports {
    records: Vec<ImportRecord>,
    lines: Vec<String>,
}

pub struct DependencyGraphBuilder<'a> {
    resolver: &'a PathResolver,
    walk_config: &'a WalkConfig,
    max_file_bytes: u64,
    cache: Option<&'a ListingCache>,
    scanned: RefCell<HashMap<PathBuf, Rc<ScannedImports>>>,
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(resolver: &'a PathResolver, walk_config: &'a WalkConfig) -> Self {
        Self {
            resolver,
            walk_config,
            max_file_bytes: u64::MAX,
            cache: None,
            scanned: RefCell::new(HashMap::new()),
        }
    }

    pub fn max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    pub fn with_cache(mut self, cache: &'a ListingCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Import records of `file`, resolved. Unreadable or oversized files have none.
    pub fn imports(&self, file: &Path) -> Vec<ImportRecord> {
        self.scan(&normalize_path(file)).records.clone()
    }

    /// Files `file` imports directly, in statement order, without duplicates.
    pub fn direct_dependencies(&self, file: &Path) -> Vec<PathBuf> {
        let file = normalize_path(file);
        let scanned = self.scan(&file);
        let mut seen = HashSet::new();
        scanned
            .records
            .iter()
            .filter_map(|r| r.resolved_path.clone())
            .filter(|p| *p != file && seen.insert(p.clone()))
            .collect()
    }

    /// Transitive dependencies of `file` up to `depth` hops.
    ///
    /// Breadth-first, so every file is discovered at its shortest distance.
    /// `file` is added to `visited` and never listed; every other file is
    /// listed once, at first discovery. Files already in `visited` are
    /// neither listed nor expanded.
    pub fn deep_dependencies(
        &self,
        file: &Path,
        depth: usize,
        visited: &mut HashSet<PathBuf>,
    ) -> Vec<PathBuf> {
        let start = normalize_path(file);
        visited.insert(start.clone());

        let mut found = Vec::new();
        let mut queue = VecDeque::from([(start, depth)]);
        while let Some((current, remaining)) = queue.pop_front() {
            if remaining == 0 {
                continue;
            }
            for dep in self.direct_dependencies(&current) {
                if visited.insert(dep.clone()) {
                    found.push(dep.clone());
                    queue.push_back((dep, remaining - 1));
                }
            }
        }
        found
    }

    /// Every edge traversed while collecting the dependencies of `file` up to
    /// `depth` hops, including edges back into already-visited files.
    pub fn dependency_edges(&self, file: &Path, depth: usize) -> Vec<DependencyEdge> {
        let start = normalize_path(file);
        let mut visited = HashSet::from([start.clone()]);
        let mut edges = Vec::new();
        let mut queue = VecDeque::from([(start, depth)]);

        while let Some((current, remaining)) = queue.pop_front() {
            if remaining == 0 {
                continue;
            }
            for dep in self.direct_dependencies(&current) {
                edges.push(DependencyEdge {
                    from: current.clone(),
                    to: dep.clone(),
                });
                if visited.insert(dep.clone()) {
                    queue.push_back((dep, remaining - 1));
                }
            }
        }
        edges
    }

    /// Files under `root` that import `target`.
    pub fn reverse_dependencies(
        &self,
        target: &Path,
        root: &Path,
    ) -> crate::Result<Vec<ReverseDependency>> {
        let mut walker = FileWalker::new(root, self.walk_config).max_file_bytes(self.max_file_bytes);
        if let Some(cache) = self.cache {
            walker = walker.with_cache(cache);
        }
        let output = walker.walk(|p| Language::from_path(p).has_imports())?;
        Ok(self.reverse_dependencies_among(target, &output.files))
    }

    /// Like [`reverse_dependencies`](Self::reverse_dependencies), over an
    /// already-listed set of candidate files.
    ///
    /// Per file, imports resolving to the target are preferred; name-based
    /// evidence from unresolvable imports is used only when a file has none.
    pub fn reverse_dependencies_among(
        &self,
        target: &Path,
        candidates: &[PathBuf],
    ) -> Vec<ReverseDependency> {
        let target = normalize_path(target);
        let mut found = Vec::new();

        for candidate in candidates {
            let file = normalize_path(candidate);
            if file == target || !Language::from_path(&file).has_imports() {
                continue;
            }
            let scanned = self.scan(&file);
            let mut resolved = Vec::new();
            let mut named = Vec::new();

            for (record, content) in scanned.records.iter().zip(&scanned.lines) {
                let evidence = match &record.resolved_path {
                    Some(path) if *path == target => Evidence::Resolved,
                    None if names_target(&record.source, &target) => Evidence::NameMatch,
                    _ => continue,
                };
                let entry = ReverseDependency {
                    file: file.clone(),
                    line: record.line,
                    content: content.clone(),
                    evidence,
                };
                match evidence {
                    Evidence::Resolved => resolved.push(entry),
                    Evidence::NameMatch => named.push(entry),
                }
            }

            found.extend(if resolved.is_empty() { named } else { resolved });
        }

        found.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
        found.dedup_by(|a, b| a.file == b.file && a.line == b.line);
        found
    }

    fn scan(&self, file: &Path) -> Rc<ScannedImports> {
        if let Some(scanned) = self.scanned.borrow().get(file) {
            return Rc::clone(scanned);
        }
        let scanned = Rc::new(self.read_imports(file));
        self.scanned
            .borrow_mut()
            .insert(file.to_path_buf(), Rc::clone(&scanned));
        scanned
    }

    fn read_imports(&self, file: &Path) -> ScannedImports {
        match fs::metadata(file) {
            Ok(meta) if meta.len() > self.max_file_bytes => {
                tracing::debug!(path = %file.display(), size = meta.len(), "skipping oversized file");
                return ScannedImports::default();
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(path = %file.display(), error = %e, "skipping unreadable file");
                return ScannedImports::default();
            }
        }
        let content = match read_source(file) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(path = %file.display(), error = %e, "skipping unreadable file");
                return ScannedImports::default();
            }
        };

        let records = ImportExtractor::new(self.resolver).extract(&content, file);
        let source_lines: Vec<&str> = content.lines().collect();
        let lines = records
            .iter()
            .map(|r| {
                source_lines
                    .get(r.line.saturating_sub(1))
                    .map(|l| l.trim_end().to_string())
                    .unwrap_or_default()
            })
            .collect();
        ScannedImports { records, lines }
    }
}

/// Whether the last segment of an unresolved import source names `target`:
/// its file stem, or its directory for index-style files.
fn names_target(source: &str, target: &Path) -> bool {
    let Some(stem) = target.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let stem = stem.strip_suffix(".d").unwrap_or(stem);
    let stem = match stem {
        "index" | "__init__" | "mod" => match target
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
        {
            Some(dir) => dir,
            None => return false,
        },
        other => other,
    };

    let Some(last) = source
        .rsplit(|c: char| c == '/' || c == '\\' || c == ':')
        .find(|s| !s.is_empty())
    else {
        return false;
    };
    if last == stem {
        return true;
    }
    let without_ext = Path::new(last).file_stem().and_then(|s| s.to_str());
    if without_ext == Some(stem) {
        return true;
    }
    // dotted module paths: `users.api`
    !source.contains('/') && last.rsplit('.').next() == Some(stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        normalize_path(&path)
    }

    #[test]
    fn test_cycle_terminates_and_lists_each_file_once() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.ts", "import { b } from './b';\nexport const a = 1;\n");
        let b = write(dir.path(), "b.ts", "import { a } from './a';\nexport const b = 2;\n");

        let resolver = PathResolver::new();
        let config = WalkConfig::default();
        let graph = DependencyGraphBuilder::new(&resolver, &config);
        let mut visited = HashSet::new();
        let deps = graph.deep_dependencies(&a, 3, &mut visited);

        assert_eq!(deps, vec![b.clone()]);
        assert!(visited.contains(&a) && visited.contains(&b));
    }

    #[test]
    fn test_depth_limits_traversal() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.js", "require('./b');\n");
        let b = write(dir.path(), "b.js", "require('./c');\n");
        let c = write(dir.path(), "c.js", "require('./d');\n");
        write(dir.path(), "d.js", "module.exports = 1;\n");

        let resolver = PathResolver::new();
        let config = WalkConfig::default();
        let graph = DependencyGraphBuilder::new(&resolver, &config);

        assert_eq!(graph.deep_dependencies(&a, 1, &mut HashSet::new()), vec![b.clone()]);
        assert_eq!(graph.deep_dependencies(&a, 2, &mut HashSet::new()), vec![b, c]);
    }

    #[test]
    fn test_shared_dependency_expanded_at_shortest_distance() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.js", "require('./x');\nrequire('./y');\n");
        let x = write(dir.path(), "x.js", "require('./q');\n");
        let y = write(dir.path(), "y.js", "require('./z');\n");
        let z = write(dir.path(), "z.js", "require('./q');\n");
        let q = write(dir.path(), "q.js", "require('./r');\n");
        let r = write(dir.path(), "r.js", "module.exports = 1;\n");

        let resolver = PathResolver::new();
        let config = WalkConfig::default();
        let graph = DependencyGraphBuilder::new(&resolver, &config);

        assert_eq!(
            graph.deep_dependencies(&a, 3, &mut HashSet::new()),
            vec![x.clone(), y, q.clone(), z, r.clone()]
        );
        let edges = graph.dependency_edges(&a, 3);
        assert!(edges.contains(&DependencyEdge { from: x, to: q.clone() }));
        assert!(edges.contains(&DependencyEdge { from: q, to: r }));
    }

    #[test]
    fn test_non_utf8_file_still_yields_imports() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.js");
        fs::write(&a, b"// caf\xe9\nrequire('./b');\n").unwrap();
        let b = write(dir.path(), "b.js", "module.exports = 1;\n");

        let resolver = PathResolver::new();
        let config = WalkConfig::default();
        let graph = DependencyGraphBuilder::new(&resolver, &config);
        assert_eq!(graph.direct_dependencies(&a), vec![b]);
    }

    #[test]
    fn test_dependency_edges_include_back_edges() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.py", "from .b import thing\n");
        let b = write(dir.path(), "b.py", "from . import a\nfrom .a import other\n");

        let resolver = PathResolver::new();
        let config = WalkConfig::default();
        let graph = DependencyGraphBuilder::new(&resolver, &config);
        let edges = graph.dependency_edges(&a, 3);

        assert!(edges.contains(&DependencyEdge { from: a.clone(), to: b.clone() }));
        assert!(edges.contains(&DependencyEdge { from: b, to: a }));
    }

    #[test]
    fn test_reverse_dependencies_resolved_and_reexport() {
        let dir = TempDir::new().unwrap();
        let user = write(dir.path(), "src/user.ts", "export function getUser() {}\n");
        write(dir.path(), "src/app.ts", "const x = 1;\nimport { getUser } from './user'\n");
        write(dir.path(), "src/index.ts", "export { getUser } from './user';\n");
        write(dir.path(), "src/other.ts", "import { y } from './y';\n");

        let resolver = PathResolver::new();
        let config = WalkConfig::default();
        let graph = DependencyGraphBuilder::new(&resolver, &config);
        let reverse = graph.reverse_dependencies(&user, dir.path()).unwrap();

        let found: Vec<(String, usize)> = reverse
            .iter()
            .map(|r| (r.file.file_name().unwrap().to_string_lossy().to_string(), r.line))
            .collect();
        assert_eq!(found, vec![("app.ts".to_string(), 2), ("index.ts".to_string(), 1)]);
        assert!(reverse.iter().all(|r| r.evidence == Evidence::Resolved));
        assert_eq!(reverse[0].content, "import { getUser } from './user'");
    }

    #[test]
    fn test_name_match_fallback_only_for_unresolved_imports() {
        let dir = TempDir::new().unwrap();
        let target = write(dir.path(), "lib/user.js", "module.exports = {};\n");
        write(dir.path(), "app/main.js", "const user = require('@internal/user');\n");
        write(dir.path(), "app/real.js", "const u = require('../lib/user');\n");

        let resolver = PathResolver::new();
        let config = WalkConfig::default();
        let graph = DependencyGraphBuilder::new(&resolver, &config);
        let reverse = graph.reverse_dependencies(&target, dir.path()).unwrap();

        assert_eq!(reverse.len(), 2);
        assert_eq!(reverse[0].evidence, Evidence::NameMatch);
        assert_eq!(reverse[1].evidence, Evidence::Resolved);
    }

    #[test]
    fn test_names_target() {
        assert!(names_target("./user", Path::new("/p/src/user.ts")));
        assert!(names_target("pkg/user.js", Path::new("/p/src/user.ts")));
        assert!(names_target("@app/components", Path::new("/p/src/components/index.ts")));
        assert!(names_target("users.api", Path::new("/p/users/api.py")));
        assert!(!names_target("./users", Path::new("/p/src/user.ts")));
        assert!(!names_target("", Path::new("/p/src/user.ts")));
    }

    #[test]
    fn test_oversized_files_have_no_imports() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.ts", "import { b } from './b';\n");
        write(dir.path(), "b.ts", "export const b = 1;\n");

        let resolver = PathResolver::new();
        let config = WalkConfig::default();
        let graph = DependencyGraphBuilder::new(&resolver, &config).max_file_bytes(4);
        assert!(graph.direct_dependencies(&a).is_empty());
    }
}
