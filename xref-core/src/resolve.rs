//! Import-source to file resolution.
//!
//! Strategies are tried in order and the first hit wins:
//!
//! 1. relative or absolute sources, probed with extensions and index files
//! 2. `node_modules/<source>` in the importing file's ancestors
//! 3. `baseUrl`/`paths` from the nearest `tsconfig.json` or `jsconfig.json`
//! 4. conventional aliases (`@/`, `~/`, ...) against the detected project root
//!
//! Lookups of configuration files and project roots are memoized for the
//! lifetime of the resolver, which is meant to live for one request.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

/// Suffixes appended to an extensionless candidate, in probe order
const EXTENSIONS: &[&str] = &[
    ".ts", ".tsx", ".d.ts", ".js", ".jsx", ".mjs", ".cjs", ".json", ".vue", ".svelte", ".py",
    ".rs", ".go", ".rb", ".php", ".css", ".scss",
];

/// Files that stand for their directory
const INDEX_FILES: &[&str] = &[
    "index.ts",
    "index.tsx",
    "index.d.ts",
    "index.js",
    "index.jsx",
    "index.mjs",
    "index.cjs",
    "index.vue",
    "__init__.py",
    "mod.rs",
    "index.php",
];

/// `package.json` fields naming a package entry point
const PACKAGE_ENTRY_FIELDS: &[&str] = &["module", "main", "types", "typings"];

/// How many `package.json` entry hops a single probe may follow
const PACKAGE_ENTRY_HOPS: usize = 3;

const PATH_CONFIG_FILES: &[&str] = &["tsconfig.json", "jsconfig.json"];

/// Files or directories whose presence marks a project root
const PROJECT_MARKERS: &[&str] = &[
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    ".git",
    "tsconfig.json",
    "jsconfig.json",
    "Cargo.toml",
    "pyproject.toml",
    "setup.py",
    "go.mod",
    "composer.json",
    "Gemfile",
];

/// Conventional alias prefixes and the project-relative directories they map to
const CONVENTION_ALIASES: &[(&str, &[&str])] = &[
    ("@/", &["src", ""]),
    ("~/", &["src", ""]),
    ("#/", &["src", ""]),
    ("@src/", &["src"]),
    ("@components/", &["src/components", "components"]),
    ("@lib/", &["src/lib", "lib"]),
    ("@utils/", &["src/utils", "utils"]),
    ("src/", &["src"]),
];

/// `baseUrl` and `paths` from a tsconfig/jsconfig file
#[derive(Debug)]
struct PathMapping {
    base_url: PathBuf,
    has_base_url: bool,
    paths: Vec<(String, Vec<String>)>,
}

/// Resolves import sources to files on disk.
#[derive(Default)]
pub struct PathResolver {
    path_configs: RefCell<HashMap<PathBuf, Option<Rc<PathMapping>>>>,
    project_roots: RefCell<HashMap<PathBuf, Option<PathBuf>>>,
}

impl PathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `source` as written in `from_file`. Returns a normalized path
    /// to an existing file, or `None`.
    pub fn resolve(&self, source: &str, from_file: &Path) -> Option<PathBuf> {
        let source = source.trim();
        if source.is_empty() || is_remote(source) {
            return None;
        }
        let from_dir = from_file.parent().unwrap_or(Path::new("."));

        if let Some(relative) = relative_source(source) {
            return self.probe(&from_dir.join(relative), PACKAGE_ENTRY_HOPS);
        }
        if Path::new(source).is_absolute() {
            return self.probe(Path::new(source), PACKAGE_ENTRY_HOPS);
        }

        self.resolve_package(source, from_dir)
            .or_else(|| self.resolve_mapped(source, from_dir))
            .or_else(|| self.resolve_convention(source, from_dir))
    }

    /// Rust `mod name;`: `name.rs` or `name/mod.rs` next to the declaring module.
    pub fn resolve_rust_mod(&self, name: &str, from_file: &Path) -> Option<PathBuf> {
        let module_dir = rust_module_dir(from_file)?;
        [
            module_dir.join(format!("{}.rs", name)),
            module_dir.join(name).join("mod.rs"),
        ]
        .into_iter()
        .find(|p| p.is_file())
        .map(|p| normalize_path(&p))
    }

    /// Rust `use` paths rooted at `crate`, `self` or `super`. The longest
    /// prefix of the path that names a module file wins.
    pub fn resolve_rust_use(&self, path: &str, from_file: &Path) -> Option<PathBuf> {
        let mut segments: Vec<&str> = path
            .split("::")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            return None;
        }

        let mut base = match segments[0] {
            "crate" => self.rust_crate_src(from_file)?,
            "self" => rust_module_dir(from_file)?,
            "super" => rust_module_dir(from_file)?.parent()?.to_path_buf(),
            _ => return None,
        };
        segments.remove(0);
        while segments.first() == Some(&"super") {
            base = base.parent()?.to_path_buf();
            segments.remove(0);
        }

        (0..=segments.len()).rev().find_map(|len| {
            let candidates = if len == 0 {
                // the base module itself
                vec![
                    base.with_extension("rs"),
                    base.join("mod.rs"),
                    base.join("lib.rs"),
                    base.join("main.rs"),
                ]
            } else {
                let module = base.join(segments[..len].iter().collect::<PathBuf>());
                vec![module.with_extension("rs"), module.join("mod.rs")]
            };
            candidates
                .into_iter()
                .find(|p| p.is_file())
                .map(|p| normalize_path(&p))
        })
    }

    /// Dotted module paths (Python, Java-style): dotted relatives resolve
    /// against the importing file; absolute ones are tried next to the
    /// importing file, then under each of `search_dirs` in the project root.
    pub fn resolve_module(
        &self,
        module: &str,
        from_file: &Path,
        search_dirs: &[&str],
    ) -> Option<PathBuf> {
        let module = module.trim();
        if module.starts_with('.') {
            return self.resolve(module, from_file);
        }
        let relative: PathBuf = module
            .trim_end_matches(".*")
            .split('.')
            .filter(|s| !s.is_empty())
            .collect();
        if relative.as_os_str().is_empty() {
            return None;
        }

        let from_dir = from_file.parent().unwrap_or(Path::new("."));
        if let Some(found) = self.probe(&from_dir.join(&relative), 0) {
            return Some(found);
        }
        let root = self.project_root(from_dir)?;
        search_dirs
            .iter()
            .find_map(|dir| self.probe(&root.join(dir).join(&relative), 0))
    }

    /// Nearest ancestor of `dir` (inclusive) containing a project marker.
    pub fn project_root(&self, dir: &Path) -> Option<PathBuf> {
        if let Some(cached) = self.project_roots.borrow().get(dir) {
            return cached.clone();
        }
        let found = dir
            .ancestors()
            .find(|ancestor| PROJECT_MARKERS.iter().any(|m| ancestor.join(m).exists()))
            .map(Path::to_path_buf);
        self.project_roots
            .borrow_mut()
            .insert(dir.to_path_buf(), found.clone());
        found
    }

    fn rust_crate_src(&self, from_file: &Path) -> Option<PathBuf> {
        from_file
            .parent()?
            .ancestors()
            .find(|a| a.join("Cargo.toml").is_file())
            .map(|crate_dir| crate_dir.join("src"))
    }

    fn resolve_package(&self, source: &str, from_dir: &Path) -> Option<PathBuf> {
        from_dir.ancestors().find_map(|ancestor| {
            let modules = ancestor.join("node_modules");
            if modules.is_dir() {
                self.probe(&modules.join(source), PACKAGE_ENTRY_HOPS)
            } else {
                None
            }
        })
    }

    fn resolve_mapped(&self, source: &str, from_dir: &Path) -> Option<PathBuf> {
        let mapping = self.path_mapping(from_dir)?;

        for (pattern, targets) in &mapping.paths {
            let Some(captured) = match_path_pattern(pattern, source) else {
                continue;
            };
            for target in targets {
                let substituted = target.replacen('*', captured, 1);
                if let Some(found) = self.probe(&mapping.base_url.join(substituted), PACKAGE_ENTRY_HOPS)
                {
                    return Some(found);
                }
            }
        }

        if mapping.has_base_url {
            return self.probe(&mapping.base_url.join(source), PACKAGE_ENTRY_HOPS);
        }
        None
    }

    fn resolve_convention(&self, source: &str, from_dir: &Path) -> Option<PathBuf> {
        let root = self.project_root(from_dir)?;
        CONVENTION_ALIASES.iter().find_map(|(prefix, dirs)| {
            let rest = source.strip_prefix(prefix)?;
            dirs.iter()
                .find_map(|dir| self.probe(&root.join(dir).join(rest), PACKAGE_ENTRY_HOPS))
        })
    }

    fn path_mapping(&self, from_dir: &Path) -> Option<Rc<PathMapping>> {
        if let Some(cached) = self.path_configs.borrow().get(from_dir) {
            return cached.clone();
        }
        let mapping = from_dir.ancestors().find_map(|ancestor| {
            PATH_CONFIG_FILES
                .iter()
                .map(|name| ancestor.join(name))
                .find(|p| p.is_file())
        });
        let mapping = mapping.and_then(|path| load_path_mapping(&path)).map(Rc::new);
        self.path_configs
            .borrow_mut()
            .insert(from_dir.to_path_buf(), mapping.clone());
        mapping
    }

    /// Try `candidate` as a file, with each extension, then as a directory.
    fn probe(&self, candidate: &Path, hops: usize) -> Option<PathBuf> {
        if candidate.is_file() {
            return Some(normalize_path(candidate));
        }
        for ext in EXTENSIONS {
            let with_ext = append_extension(candidate, ext);
            if with_ext.is_file() {
                return Some(normalize_path(&with_ext));
            }
        }
        if !candidate.is_dir() {
            return None;
        }
        if hops > 0 {
            let entry = package_entry(candidate)
                .and_then(|entry| self.probe(&candidate.join(entry), hops - 1));
            if entry.is_some() {
                return entry;
            }
        }
        INDEX_FILES
            .iter()
            .map(|index| candidate.join(index))
            .find(|p| p.is_file())
            .map(|p| normalize_path(&p))
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component where there is one. Never touches the file system.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if last_is_normal {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}

fn is_remote(source: &str) -> bool {
    source.contains("://") || source.starts_with("data:")
}

/// `./x`, `../x` and bare `.`/`..` pass through; Python dotted relatives
/// (`.mod`, `..pkg.mod`) are rewritten to slash form.
fn relative_source(source: &str) -> Option<String> {
    if source.starts_with("./") || source.starts_with("../") || source == "." || source == ".." {
        return Some(source.to_string());
    }
    if !source.starts_with('.') || source.contains('/') {
        return None;
    }

    let dots = source.chars().take_while(|&c| c == '.').count();
    let rest = &source[dots..];
    if !rest.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return None;
    }
    let mut relative = if dots == 1 {
        "./".to_string()
    } else {
        "../".repeat(dots - 1)
    };
    relative.push_str(&rest.replace('.', "/"));
    Some(relative)
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(ext);
    PathBuf::from(os)
}

/// Directory that `mod` declarations in `file` are relative to.
fn rust_module_dir(file: &Path) -> Option<PathBuf> {
    let parent = file.parent()?;
    let stem = file.file_stem()?.to_str()?;
    if matches!(stem, "mod" | "lib" | "main") {
        Some(parent.to_path_buf())
    } else {
        Some(parent.join(stem))
    }
}

fn package_entry(dir: &Path) -> Option<String> {
    let content = fs::read_to_string(dir.join("package.json")).ok()?;
    let manifest: Value = serde_json::from_str(&content).ok()?;
    PACKAGE_ENTRY_FIELDS
        .iter()
        .find_map(|field| manifest.get(*field)?.as_str())
        .map(str::to_string)
}

/// `paths` keys may contain one `*`; returns the text it captured (empty for
/// an exact key match).
fn match_path_pattern<'s>(pattern: &str, source: &'s str) -> Option<&'s str> {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            if source.len() < prefix.len() + suffix.len() {
                return None;
            }
            source.strip_prefix(prefix)?.strip_suffix(suffix)
        }
        None => (pattern == source).then_some(""),
    }
}

fn load_path_mapping(path: &Path) -> Option<PathMapping> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "unreadable path config");
            return None;
        }
    };
    let json: Value = match serde_json::from_str(&strip_json_comments(&content)) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "ignoring malformed path config");
            return None;
        }
    };

    let config_dir = path.parent().unwrap_or(Path::new("."));
    let options = json.get("compilerOptions")?;
    let base_url = options.get("baseUrl").and_then(Value::as_str);
    let paths: Vec<(String, Vec<String>)> = options
        .get("paths")
        .and_then(Value::as_object)
        .map(|paths| {
            paths
                .iter()
                .map(|(pattern, targets)| {
                    let targets = targets
                        .as_array()
                        .map(|t| t.iter().filter_map(Value::as_str).map(str::to_string).collect())
                        .unwrap_or_default();
                    (pattern.clone(), targets)
                })
                .collect()
        })
        .unwrap_or_default();

    if base_url.is_none() && paths.is_empty() {
        return None;
    }
    Some(PathMapping {
        base_url: config_dir.join(base_url.unwrap_or(".")),
        has_base_url: base_url.is_some(),
        paths,
    })
}

/// Strip `//` and `/* */` comments and trailing commas from JSON text,
/// leaving string contents alone.
fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }

    remove_trailing_commas(&out)
}

fn remove_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_string {
            if c == '\\' && i + 1 < chars.len() {
                out.push(c);
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                i += 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}
