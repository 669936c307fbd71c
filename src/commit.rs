//! Access to the commits being searched.
//!
//! Predicates only see a commit through [`LazyCommit`], so metadata-only
//! queries never pay for fetching and parsing the diff. [`CachedCommit`] is
//! the standard implementation: commit metadata comes from a `git log`
//! record, the diff is fetched from a [`DiffSource`] on first use and kept.

pub mod fetcher;
pub mod log;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;

use crate::diff::{FileDiff, parse_diff};
use crate::error::{Result, SiftError};

pub use fetcher::DiffFetcher;
pub use self::log::{LOG_FORMAT, parse_log};

/// A commit whose expensive parts are computed on demand.
pub trait LazyCommit {
    fn author_name(&self) -> &[u8];
    fn author_email(&self) -> &[u8];
    fn committer_name(&self) -> &[u8];
    fn committer_email(&self) -> &[u8];
    fn message(&self) -> &[u8];
    fn committer_date(&self) -> Result<DateTime<Utc>>;
    /// Paths touched by the commit, available without fetching the diff.
    fn modified_files(&self) -> &[String];
    /// The parsed diff against the first parent. Computed at most once.
    fn diff(&self) -> Result<&[FileDiff]>;
}

/// Produces the raw `git diff-tree -p` output for a commit.
pub trait DiffSource {
    fn raw_diff(&self, hash: &str) -> Result<Vec<u8>>;
}

impl<D: DiffSource + ?Sized> DiffSource for Arc<D> {
    fn raw_diff(&self, hash: &str) -> Result<Vec<u8>> {
        (**self).raw_diff(hash)
    }
}

/// Commit metadata as read from `git log`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitData {
    pub hash: String,
    pub author_name: Vec<u8>,
    pub author_email: Vec<u8>,
    /// Unix seconds, as printed by git.
    pub author_date: Vec<u8>,
    pub committer_name: Vec<u8>,
    pub committer_email: Vec<u8>,
    /// Unix seconds, as printed by git.
    pub committer_date: Vec<u8>,
    pub message: Vec<u8>,
    pub parent_hashes: Vec<String>,
    pub refs: Vec<String>,
    pub source_refs: Vec<String>,
    pub modified_files: Vec<String>,
}

impl CommitData {
    pub fn author_date(&self) -> Result<DateTime<Utc>> {
        parse_unix_time(&self.author_date)
    }

    pub fn committer_date(&self) -> Result<DateTime<Utc>> {
        parse_unix_time(&self.committer_date)
    }
}

fn parse_unix_time(raw: &[u8]) -> Result<DateTime<Utc>> {
    let invalid = || {
        SiftError::commit(format!(
            "invalid timestamp '{}'",
            String::from_utf8_lossy(raw)
        ))
    };
    let seconds: i64 = std::str::from_utf8(raw)
        .map_err(|_| invalid())?
        .trim()
        .parse()
        .map_err(|_| invalid())?;
    DateTime::from_timestamp(seconds, 0).ok_or_else(invalid)
}

/// A [`LazyCommit`] over [`CommitData`] that fetches its diff from `D` once.
#[derive(Debug)]
pub struct CachedCommit<D> {
    data: CommitData,
    source: Arc<D>,
    diff: OnceCell<Vec<FileDiff>>,
}

impl<D: DiffSource> CachedCommit<D> {
    pub fn new(data: CommitData, source: Arc<D>) -> Self {
        CachedCommit {
            data,
            source,
            diff: OnceCell::new(),
        }
    }

    pub fn data(&self) -> &CommitData {
        &self.data
    }

    pub fn hash(&self) -> &str {
        &self.data.hash
    }

    /// Whether the diff was already fetched.
    pub fn diff_loaded(&self) -> bool {
        self.diff.get().is_some()
    }
}

impl<D: DiffSource> LazyCommit for CachedCommit<D> {
    fn author_name(&self) -> &[u8] {
        &self.data.author_name
    }

    fn author_email(&self) -> &[u8] {
        &self.data.author_email
    }

    fn committer_name(&self) -> &[u8] {
        &self.data.committer_name
    }

    fn committer_email(&self) -> &[u8] {
        &self.data.committer_email
    }

    fn message(&self) -> &[u8] {
        &self.data.message
    }

    fn committer_date(&self) -> Result<DateTime<Utc>> {
        self.data.committer_date()
    }

    fn modified_files(&self) -> &[String] {
        &self.data.modified_files
    }

    fn diff(&self) -> Result<&[FileDiff]> {
        let diff = self.diff.get_or_try_init(|| {
            ::log::trace!("fetching diff for {}", self.data.hash);
            let raw = self.source.raw_diff(&self.data.hash)?;
            parse_diff(&raw)
        })?;
        Ok(diff)
    }
}
