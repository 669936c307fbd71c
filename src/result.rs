//! The result model shared by every producer and consumer of matches.
//!
//! # Module Structure
//!
//! - `range`: byte/line/column locations and highlight ranges
//! - `key`: result identity and canonical ordering
//! - `select`: validated select paths
//! - `file`, `commit`, `repo`: the concrete match kinds
//! - `matches`: the [`Match`] sum type and list helpers
//! - `deduper`, `merger`: single- and multi-source aggregation

pub mod commit;
pub mod deduper;
pub mod file;
pub mod key;
pub mod matches;
pub mod merger;
pub mod range;
pub mod repo;
pub mod select;

// Re-exports
pub use commit::{CommitDiffMatch, CommitMatch, MatchedString, Signature};
pub use deduper::Deduper;
pub use file::{ChunkMatch, FileMatch, SymbolMatch};
pub use key::{Key, TypeRank};
pub use matches::Match;
pub use merger::Merger;
pub use range::{CaptureRanges, Location, Range, captures_to_ranges, matches_to_ranges};
pub use repo::{Owner, OwnerMatch, RepoMatch};
pub use select::SelectPath;
