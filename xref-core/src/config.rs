//! Configuration for xref

use crate::XrefError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Location of the optional per-project config, relative to the invocation root
pub const CONFIG_PATH: &str = ".xref/config.toml";

/// Default configuration as TOML
pub const DEFAULT_CONFIG: &str = r#"# xref Configuration

[search]
# Files above this size (bytes) are skipped by symbol search
max_file_bytes = 5242880
# Files above this size (bytes) are skipped by full-content text search
text_max_file_bytes = 2097152
# Results returned when the caller does not ask for a specific count
default_max_results = 50
# Transitive dependency depth when the caller does not ask (1-3)
default_depth = 2
# Number of top result files that receive dependency analysis
analysis_file_limit = 5

[scoring]
case_insensitive = 0.95
substring_base = 0.8
substring_span = 0.15
fuzzy_threshold = 0.6
# Approximate matches never score above this value
approximate_ceiling = 0.8

[walk]
# Honour .gitignore files inside git repositories
respect_gitignore = true
# Directory names never descended into
exclude_dirs = [
    ".git", ".hg", ".svn",
    "node_modules", "vendor", ".venv", "venv", "__pycache__",
    "target", "dist", "build", "out", ".next",
    "coverage", ".nyc_output", ".cache", ".pytest_cache",
]
# Additional glob patterns (relative to the scanned root) to skip
exclude_globs = ["*.min.js", "*.min.css", "*.map"]

[cache]
# Lifetime of cached directory listings ("0s" disables caching)
ttl = "30s"
"#;

/// xref configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub walk: WalkConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_text_max_file_bytes")]
    pub text_max_file_bytes: u64,
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,
    #[serde(default = "default_depth")]
    pub default_depth: usize,
    #[serde(default = "default_analysis_file_limit")]
    pub analysis_file_limit: usize,
}

/// Heuristic constants used by the fuzzy scorer
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: f64,
    #[serde(default = "default_substring_base")]
    pub substring_base: f64,
    #[serde(default = "default_substring_span")]
    pub substring_span: f64,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    #[serde(default = "default_approximate_ceiling")]
    pub approximate_ceiling: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkConfig {
    #[serde(default = "default_respect_gitignore")]
    pub respect_gitignore: bool,
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl")]
    pub ttl: String,
}

// Default value functions
fn default_max_file_bytes() -> u64 {
    5 * 1024 * 1024
}
fn default_text_max_file_bytes() -> u64 {
    2 * 1024 * 1024
}
fn default_max_results() -> usize {
    50
}
fn default_depth() -> usize {
    2
}
fn default_analysis_file_limit() -> usize {
    5
}
fn default_case_insensitive() -> f64 {
    0.95
}
fn default_substring_base() -> f64 {
    0.8
}
fn default_substring_span() -> f64 {
    0.15
}
fn default_fuzzy_threshold() -> f64 {
    0.6
}
fn default_approximate_ceiling() -> f64 {
    0.8
}
fn default_respect_gitignore() -> bool {
    true
}
fn default_exclude_dirs() -> Vec<String> {
    [
        ".git",
        ".hg",
        ".svn",
        "node_modules",
        "vendor",
        ".venv",
        "venv",
        "__pycache__",
        "target",
        "dist",
        "build",
        "out",
        ".next",
        "coverage",
        ".nyc_output",
        ".cache",
        ".pytest_cache",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_exclude_globs() -> Vec<String> {
    vec![
        "*.min.js".to_string(),
        "*.min.css".to_string(),
        "*.map".to_string(),
    ]
}
fn default_ttl() -> String {
    "30s".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            text_max_file_bytes: default_text_max_file_bytes(),
            default_max_results: default_max_results(),
            default_depth: default_depth(),
            analysis_file_limit: default_analysis_file_limit(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            case_insensitive: default_case_insensitive(),
            substring_base: default_substring_base(),
            substring_span: default_substring_span(),
            fuzzy_threshold: default_fuzzy_threshold(),
            approximate_ceiling: default_approximate_ceiling(),
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: default_respect_gitignore(),
            exclude_dirs: default_exclude_dirs(),
            exclude_globs: default_exclude_globs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: default_ttl() }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| XrefError::ConfigParse(e.to_string()))
    }

    /// Load `<root>/.xref/config.toml` if present, defaults otherwise
    pub fn for_root(root: &Path) -> crate::Result<Self> {
        let path = root.join(CONFIG_PATH);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading config");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Get cache TTL as Duration
    pub fn cache_ttl(&self) -> Duration {
        parse_duration(&self.cache.ttl).unwrap_or(Duration::from_secs(30))
    }
}

/// Parse duration string (e.g., "30s", "5m", "1h")
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (split, unit) = s.char_indices().next_back()?;
    let num: u64 = s[..split].parse().ok()?;

    let secs = match unit {
        's' => Some(num),
        'm' => num.checked_mul(60),
        'h' => num.checked_mul(3600),
        'd' => num.checked_mul(86400),
        _ => None,
    }?;
    Some(Duration::from_secs(secs))
}
