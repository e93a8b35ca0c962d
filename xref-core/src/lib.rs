//! xref Core - code intelligence for agent tooling
//!
//! Symbol search with confidence scoring, import/export extraction,
//! import-path resolution and dependency-graph traversal over a source tree,
//! using lexical pattern rules instead of per-language parsers.

pub mod aggregate;
pub mod comment;
pub mod config;
pub mod error;
pub mod exports;
pub mod fuzzy;
pub mod graph;
pub mod imports;
pub mod language;
pub mod model;
pub mod pattern;
pub mod report;
pub mod resolve;
pub mod search;
pub mod text_search;
pub mod walk;

pub use aggregate::{AggregatedResults, ResultAggregator};
pub use comment::is_comment_only;
pub use config::Config;
pub use error::XrefError;
pub use exports::{ExportExtractor, ExportKind, ExportRecord};
pub use fuzzy::FuzzyScorer;
pub use graph::{DependencyEdge, DependencyGraphBuilder, Evidence, ReverseDependency};
pub use imports::{ImportExtractor, ImportKind, ImportRecord};
pub use language::{CommentStyle, Language};
pub use model::{Match, MatchType, SearchQuery, SearchType, DEFAULT_DEPTH, MAX_RESULTS_LIMIT};
pub use pattern::{LineMatch, PatternMatcher};
pub use resolve::{normalize_path, PathResolver};
pub use search::{AnalysisOptions, FileAnalysis, SearchEngine, SearchOutcome};
pub use text_search::{TextMatch, TextQuery, TextSearchOutcome};
pub use walk::{FileWalker, ListingCache, WalkOutput};

/// Result type alias for xref operations
pub type Result<T> = std::result::Result<T, XrefError>;
