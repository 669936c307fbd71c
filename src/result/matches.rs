//! The closed set of result kinds and operations over lists of them.

use serde::{Deserialize, Serialize};

use crate::result::commit::{CommitDiffMatch, CommitMatch};
use crate::result::file::FileMatch;
use crate::result::key::Key;
use crate::result::repo::{OwnerMatch, RepoMatch};
use crate::result::select::{self, SelectPath};

/// A search result of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Match {
    File(FileMatch),
    Commit(CommitMatch),
    CommitDiff(CommitDiffMatch),
    Repo(RepoMatch),
    Owner(OwnerMatch),
}

impl Match {
    pub fn key(&self) -> Key {
        match self {
            Match::File(m) => m.key(),
            Match::Commit(m) => m.key(),
            Match::CommitDiff(m) => m.key(),
            Match::Repo(m) => m.key(),
            Match::Owner(m) => m.key(),
        }
    }

    /// Number of results this match counts as against a limit. Always at
    /// least one.
    pub fn result_count(&self) -> usize {
        match self {
            Match::File(m) => m.result_count(),
            Match::Commit(m) => m.result_count(),
            Match::CommitDiff(m) => m.result_count(),
            Match::Repo(_) | Match::Owner(_) => 1,
        }
    }

    /// Truncate this match to at most `limit` results, returning the part of
    /// the limit that is left for the following matches.
    pub fn limit(&mut self, limit: usize) -> usize {
        match self {
            Match::File(m) => m.limit(limit),
            Match::Commit(m) => m.limit(limit),
            Match::CommitDiff(m) => m.limit(limit),
            Match::Repo(_) | Match::Owner(_) => limit.saturating_sub(1),
        }
    }

    /// Project this match onto the result kind named by `path`. Returns `None`
    /// when the match has nothing of that kind.
    pub fn select(&self, path: &SelectPath) -> Option<Match> {
        if path.root() == select::REPOSITORY {
            let repo = match self {
                Match::File(m) => m.repo_match(),
                Match::Commit(m) => m.repo_match(),
                Match::CommitDiff(m) => m.repo_match(),
                Match::Repo(m) => m.clone(),
                Match::Owner(_) => return None,
            };
            return Some(Match::Repo(repo));
        }

        match self {
            Match::File(m) => m.select(path).map(Match::File),
            Match::Commit(m) => m.select(path).map(Match::Commit),
            Match::CommitDiff(m) if path.root() == select::FILE => {
                Some(Match::File(m.file_match()))
            }
            Match::CommitDiff(m) => m.select(path).map(Match::CommitDiff),
            Match::Repo(m) => m.select(path).map(Match::Repo),
            Match::Owner(m) => m.select(path).map(Match::Owner),
        }
    }

    /// Merge the highlights of a same-keyed match into this one. Matches of a
    /// different kind are ignored.
    pub fn append_matches(&mut self, other: &Match) {
        match (self, other) {
            (Match::File(a), Match::File(b)) => a.append_matches(b),
            (Match::Commit(a), Match::Commit(b)) => a.append_matches(b),
            (Match::CommitDiff(a), Match::CommitDiff(b)) => a.append_matches(b),
            (Match::Repo(a), Match::Repo(b)) => a.append_matches(b),
            (Match::Owner(a), Match::Owner(b)) => a.append_matches(b),
            (a, b) => log::warn!(
                "cannot merge matches of different kinds: {:?} and {:?}",
                a.key(),
                b.key()
            ),
        }
    }
}

/// Total number of results across `matches`.
pub fn result_count(matches: &[Match]) -> usize {
    matches.iter().map(Match::result_count).sum()
}

/// Truncate `matches` so that they represent at most `limit` results. Matches
/// are truncated in order; the list is cut as soon as the limit is used up.
pub fn limit(matches: &mut Vec<Match>, mut limit: usize) {
    let mut keep = matches.len();
    for (i, m) in matches.iter_mut().enumerate() {
        if limit == 0 {
            keep = i;
            break;
        }
        limit = m.limit(limit);
    }
    matches.truncate(keep);
}
