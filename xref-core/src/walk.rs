//! File enumeration with directory exclusions and per-file size caps.

use crate::config::WalkConfig;
use crate::error::XrefError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A file seen during a walk, with its size at listing time.
#[derive(Debug, Clone)]
pub struct ListedFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Files accepted by a walk, plus what was left out and why.
#[derive(Debug, Default)]
pub struct WalkOutput {
    pub files: Vec<PathBuf>,
    pub skipped_oversized: usize,
    pub skipped_unreadable: usize,
}

impl WalkOutput {
    pub fn skipped(&self) -> usize {
        self.skipped_oversized + self.skipped_unreadable
    }
}

/// Raw listing of everything under a root that survives directory exclusion.
#[derive(Debug, Default)]
struct Listing {
    files: Vec<ListedFile>,
    unreadable: usize,
}

/// Time-boxed cache of directory listings, shared between requests.
///
/// Entries are immutable once stored; a stale entry is replaced wholesale.
pub struct ListingCache {
    ttl: Duration,
    entries: Mutex<HashMap<PathBuf, (Instant, Arc<Listing>)>>,
}

impl ListingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, root: &Path) -> Option<Arc<Listing>> {
        if self.ttl.is_zero() {
            return None;
        }
        let entries = self.entries.lock().ok()?;
        let (stored_at, listing) = entries.get(root)?;
        if stored_at.elapsed() <= self.ttl {
            Some(Arc::clone(listing))
        } else {
            None
        }
    }

    fn insert(&self, root: PathBuf, listing: Arc<Listing>) {
        if self.ttl.is_zero() {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|_, (stored_at, _)| stored_at.elapsed() <= self.ttl);
            entries.insert(root, (Instant::now(), listing));
        }
    }

    /// Drop every cached listing
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

/// Recursive file enumeration rooted at a directory (or a single file).
pub struct FileWalker<'a> {
    root: PathBuf,
    config: &'a WalkConfig,
    max_file_bytes: u64,
    cache: Option<&'a ListingCache>,
}

impl<'a> FileWalker<'a> {
    pub fn new(root: impl Into<PathBuf>, config: &'a WalkConfig) -> Self {
        Self {
            root: root.into(),
            config,
            max_file_bytes: u64::MAX,
            cache: None,
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

    /// Walk using the configured directory exclusions.
    pub fn walk<F>(&self, file_allow: F) -> crate::Result<WalkOutput>
    where
        F: Fn(&Path) -> bool,
    {
        if let Some(cache) = self.cache {
            if let Some(listing) = cache.get(&self.root) {
                tracing::debug!(root = %self.root.display(), "listing cache hit");
                return Ok(self.filter(&listing, file_allow));
            }
        }

        let excluded: HashSet<String> = self.config.exclude_dirs.iter().cloned().collect();
        let listing = Arc::new(self.list(move |dir: &Path| {
            dir.file_name()
                .and_then(|n| n.to_str())
                .map_or(true, |name| !excluded.contains(name))
        })?);

        if let Some(cache) = self.cache {
            cache.insert(self.root.clone(), Arc::clone(&listing));
        }
        Ok(self.filter(&listing, file_allow))
    }

    /// Walk with an explicit directory predicate instead of the configured
    /// exclusions. Never cached.
    pub fn walk_with<D, F>(&self, dir_allow: D, file_allow: F) -> crate::Result<WalkOutput>
    where
        D: Fn(&Path) -> bool + Send + Sync + 'static,
        F: Fn(&Path) -> bool,
    {
        let listing = self.list(dir_allow)?;
        Ok(self.filter(&listing, file_allow))
    }

    fn filter<F>(&self, listing: &Listing, file_allow: F) -> WalkOutput
    where
        F: Fn(&Path) -> bool,
    {
        let mut output = WalkOutput {
            skipped_unreadable: listing.unreadable,
            ..Default::default()
        };

        for file in &listing.files {
            if !file_allow(&file.path) {
                continue;
            }
            if file.size > self.max_file_bytes {
                tracing::debug!(
                    path = %file.path.display(),
                    size = file.size,
                    cap = self.max_file_bytes,
                    "skipping oversized file"
                );
                output.skipped_oversized += 1;
                continue;
            }
            output.files.push(file.path.clone());
        }

        output
    }

    fn list<D>(&self, dir_allow: D) -> crate::Result<Listing>
    where
        D: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        let metadata = std::fs::metadata(&self.root)
            .map_err(|_| XrefError::PathNotFound(self.root.clone()))?;

        if metadata.is_file() {
            return Ok(Listing {
                files: vec![ListedFile {
                    path: self.root.clone(),
                    size: metadata.len(),
                }],
                unreadable: 0,
            });
        }

        let ignore_set = self.build_ignore_set()?;

        let mut builder = WalkBuilder::new(&self.root);
        builder.hidden(false);
        builder.git_ignore(self.config.respect_gitignore);
        builder.git_global(self.config.respect_gitignore);
        builder.git_exclude(self.config.respect_gitignore);
        builder.parents(self.config.respect_gitignore);
        builder.filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            entry.depth() == 0 || !is_dir || dir_allow(entry.path())
        });

        let mut listing = Listing::default();

        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry");
                    listing.unreadable += 1;
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            if ignore_set.is_match(relative) {
                continue;
            }

            match entry.metadata() {
                Ok(meta) => listing.files.push(ListedFile {
                    path: path.to_path_buf(),
                    size: meta.len(),
                }),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping unreadable file");
                    listing.unreadable += 1;
                }
            }
        }

        listing.files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(listing)
    }

    fn build_ignore_set(&self) -> crate::Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.config.exclude_globs {
            let glob_pattern = if pattern.contains('/') {
                pattern.clone()
            } else {
                format!("**/{}", pattern)
            };
            builder.add(Glob::new(&glob_pattern).map_err(|e| XrefError::GlobPattern(e.to_string()))?);
        }
        builder
            .build()
            .map_err(|e| XrefError::GlobPattern(e.to_string()))
    }
}

/// Read a source file as text. Invalid UTF-8 is replaced, not rejected.
pub fn read_source(path: &Path) -> std::io::Result<String> {
    std::fs::read(path).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        fs::create_dir_all(root.join("dist")).unwrap();
        fs::write(root.join("src/app.ts"), "export const a = 1;\n").unwrap();
        fs::write(root.join("src/nested/util.ts"), "export const b = 2;\n").unwrap();
        fs::write(root.join("src/bundle.min.js"), "var x;\n").unwrap();
        fs::write(root.join("node_modules/lib/index.js"), "module.exports = 1;\n").unwrap();
        fs::write(root.join("dist/app.js"), "var a = 1;\n").unwrap();
        dir
    }

    #[test]
    fn test_default_exclusions() {
        let dir = setup_tree();
        let config = WalkConfig::default();
        let output = FileWalker::new(dir.path(), &config).walk(|_| true).unwrap();

        let names: Vec<String> = output
            .files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["src/app.ts", "src/nested/util.ts"]);
    }

    #[test]
    fn test_size_cap_skips_without_error() {
        let dir = setup_tree();
        fs::write(dir.path().join("src/huge.ts"), vec![b'a'; 4096]).unwrap();
        let config = WalkConfig::default();
        let output = FileWalker::new(dir.path(), &config)
            .max_file_bytes(1024)
            .walk(|_| true)
            .unwrap();

        assert!(output.files.iter().all(|p| !p.ends_with("huge.ts")));
        assert_eq!(output.skipped_oversized, 1);
    }

    #[test]
    fn test_custom_directory_predicate() {
        let dir = setup_tree();
        let config = WalkConfig::default();
        let output = FileWalker::new(dir.path(), &config)
            .walk_with(|d: &Path| !d.ends_with("nested"), |p| p.extension().is_some())
            .unwrap();

        assert!(output.files.iter().any(|p| p.ends_with("node_modules/lib/index.js")));
        assert!(output.files.iter().all(|p| !p.ends_with("util.ts")));
    }

    #[test]
    fn test_single_file_root() {
        let dir = setup_tree();
        let config = WalkConfig::default();
        let file = dir.path().join("src/app.ts");
        let output = FileWalker::new(&file, &config).walk(|_| true).unwrap();
        assert_eq!(output.files, vec![file]);
    }

    #[test]
    fn test_missing_root_is_path_not_found() {
        let config = WalkConfig::default();
        let err = FileWalker::new("/definitely/not/here", &config)
            .walk(|_| true)
            .unwrap_err();
        assert!(matches!(err, XrefError::PathNotFound(_)));
    }

    #[test]
    fn test_cache_serves_listing_until_cleared() {
        let dir = setup_tree();
        let config = WalkConfig::default();
        let cache = ListingCache::new(Duration::from_secs(60));

        let first = FileWalker::new(dir.path(), &config)
            .with_cache(&cache)
            .walk(|_| true)
            .unwrap();
        fs::write(dir.path().join("src/late.ts"), "export {};\n").unwrap();
        let cached = FileWalker::new(dir.path(), &config)
            .with_cache(&cache)
            .walk(|_| true)
            .unwrap();
        assert_eq!(first.files, cached.files);

        cache.clear();
        let fresh = FileWalker::new(dir.path(), &config)
            .with_cache(&cache)
            .walk(|_| true)
            .unwrap();
        assert_eq!(fresh.files.len(), first.files.len() + 1);
    }
}
