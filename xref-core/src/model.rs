//! Request and result types shared by the engine and its frontends

use crate::error::XrefError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

pub const MAX_RESULTS_LIMIT: usize = 200;
pub const DEFAULT_MAX_RESULTS: usize = 50;
pub const MIN_DEPTH: usize = 1;
pub const MAX_DEPTH: usize = 3;
pub const DEFAULT_DEPTH: usize = 2;

/// Category a single match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    Definition,
    References,
    Usage,
    Dependencies,
    ReverseDependencies,
}

impl MatchType {
    pub const ALL: [MatchType; 5] = [
        Self::Definition,
        Self::References,
        Self::Usage,
        Self::Dependencies,
        Self::ReverseDependencies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Definition => "definition",
            Self::References => "references",
            Self::Usage => "usage",
            Self::Dependencies => "dependencies",
            Self::ReverseDependencies => "reverse-dependencies",
        }
    }
}

impl Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller is searching for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchType {
    Definition,
    #[serde(alias = "reference")]
    References,
    Usage,
    #[serde(alias = "dependency")]
    Dependencies,
    #[serde(alias = "reverse_dependencies", alias = "reverse-dependency")]
    ReverseDependencies,
    #[default]
    All,
}

impl SearchType {
    /// Match categories evaluated for this search type
    pub fn categories(self) -> &'static [MatchType] {
        match self {
            Self::Definition => &[MatchType::Definition],
            Self::References => &[MatchType::References],
            Self::Usage => &[MatchType::Usage],
            Self::Dependencies => &[MatchType::Dependencies],
            Self::ReverseDependencies => &[MatchType::ReverseDependencies],
            Self::All => &MatchType::ALL,
        }
    }

    /// Whether files importing the symbol's defining file are reported as matches
    pub fn includes_importers(self) -> bool {
        matches!(self, Self::ReverseDependencies | Self::All)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Definition => MatchType::Definition.as_str(),
            Self::References => MatchType::References.as_str(),
            Self::Usage => MatchType::Usage.as_str(),
            Self::Dependencies => MatchType::Dependencies.as_str(),
            Self::ReverseDependencies => MatchType::ReverseDependencies.as_str(),
        }
    }
}

impl FromStr for SearchType {
    type Err = XrefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| {
            XrefError::InvalidQuery(format!(
                "unknown search type '{}' (expected definition, references, usage, \
                 dependencies, reverse-dependencies or all)",
                s
            ))
        })
    }
}

impl Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A symbol search request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub symbol: String,
    #[serde(default)]
    pub search_type: SearchType,
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default)]
    pub include_comments: bool,
    #[serde(default)]
    pub fuzzy_match: bool,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub include_dependencies: bool,
    #[serde(default)]
    pub include_reverse_dependencies: bool,
    #[serde(default)]
    pub analyze_imports: bool,
    #[serde(default = "default_depth_level")]
    pub depth_level: usize,
}

fn default_base_path() -> String {
    ".".to_string()
}
fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}
fn default_depth_level() -> usize {
    DEFAULT_DEPTH
}

impl SearchQuery {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            search_type: SearchType::All,
            base_path: default_base_path(),
            include_comments: false,
            fuzzy_match: false,
            max_results: DEFAULT_MAX_RESULTS,
            include_dependencies: false,
            include_reverse_dependencies: false,
            analyze_imports: false,
            depth_level: DEFAULT_DEPTH,
        }
    }

    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy_match = fuzzy;
        self
    }

    pub fn with_comments(mut self, include_comments: bool) -> Self {
        self.include_comments = include_comments;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_dependencies(mut self, depth_level: usize) -> Self {
        self.include_dependencies = true;
        self.depth_level = depth_level;
        self
    }

    pub fn with_reverse_dependencies(mut self) -> Self {
        self.include_reverse_dependencies = true;
        self
    }

    pub fn with_imports(mut self) -> Self {
        self.analyze_imports = true;
        self
    }

    /// Validate the symbol and clamp numeric fields into their allowed ranges.
    pub fn normalized(mut self) -> crate::Result<Self> {
        let trimmed = self.symbol.trim();
        if trimmed.is_empty() {
            return Err(XrefError::InvalidQuery("symbol must not be empty".to_string()));
        }
        if trimmed.len() != self.symbol.len() {
            self.symbol = trimmed.to_string();
        }
        self.max_results = self.max_results.clamp(1, MAX_RESULTS_LIMIT);
        self.depth_level = self.depth_level.clamp(MIN_DEPTH, MAX_DEPTH);
        if self.base_path.trim().is_empty() {
            self.base_path = default_base_path();
        }
        Ok(self)
    }

    /// Whether any per-file dependency analysis was requested
    pub fn wants_analysis(&self) -> bool {
        self.include_dependencies || self.include_reverse_dependencies || self.analyze_imports
    }
}

/// A single located occurrence of the symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Path relative to the invocation root, `/`-separated
    pub file: String,
    /// 1-based line number
    pub line: usize,
    pub content: String,
    #[serde(rename = "type")]
    pub match_type: MatchType,
    pub confidence: f64,
}
