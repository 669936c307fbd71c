//! # Sift
//!
//! Commit search primitives for a code search backend.
//!
//! ## Features
//!
//! - Boolean match trees over commit metadata and diff content, with lazily
//!   fetched diffs and per-file-diff match tracking
//! - Precise highlight ranges, carried through diff preview rendering
//! - Case-insensitive matching against a pre-lowered scratch buffer
//! - Exactly-once merging of results confirmed by several sources
//! - A result model with canonical ordering, limits and select paths
// Core modules
pub mod commit;
pub mod config;
pub mod diff;
mod error;
pub mod matchtree;
pub mod query;
pub mod result;
pub mod search;

// Re-exports for the public API
pub use commit::{CachedCommit, CommitData, DiffFetcher, DiffSource, LazyCommit};
pub use config::{DiffPreviewConfig, SearchConfig};
pub use diff::{FileDiff, Hunk, format_diff, parse_diff, split_diff};
pub use error::{Result, SiftError};
pub use matchtree::{
    CommitFilterResult, MatchTree, MatchedCommit, MatchedFileDiffs, Scratch, to_match_tree,
};
pub use query::{Node, OperatorKind};
pub use result::{Deduper, Key, Match, Merger};
pub use search::{CommitSearcher, SearchResults};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
