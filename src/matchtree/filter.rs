//! The tri-state result of evaluating a predicate against one commit.
//!
//! A predicate either decides the whole commit (author, date, message) or
//! selects a subset of its file diffs (diff content, file names). Commit-level
//! predicates leave the file-diff set [`Unevaluated`](MatchedFileDiffs::Unevaluated),
//! which acts as a wildcard: when the commit matched it stands for every file
//! diff, otherwise for none. Evaluated sets are only ever produced together
//! with `commit_matched == false`, so a result is decided by exactly one of
//! the two fields.

use std::collections::BTreeSet;

/// The file diffs selected by a predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MatchedFileDiffs {
    /// The diff was not looked at.
    #[default]
    Unevaluated,
    /// The diff was looked at and no file diff matched.
    Empty,
    /// The indices of the matching file diffs. Never empty.
    Matched(BTreeSet<usize>),
}

impl MatchedFileDiffs {
    /// Build an evaluated set, mapping an empty set to [`MatchedFileDiffs::Empty`].
    pub fn from_set(set: BTreeSet<usize>) -> Self {
        if set.is_empty() {
            MatchedFileDiffs::Empty
        } else {
            MatchedFileDiffs::Matched(set)
        }
    }

    pub fn is_evaluated(&self) -> bool {
        !matches!(self, MatchedFileDiffs::Unevaluated)
    }

    /// Whether at least one file diff matched.
    pub fn is_non_empty(&self) -> bool {
        matches!(self, MatchedFileDiffs::Matched(_))
    }
}

/// Outcome of evaluating a predicate against a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFilterResult {
    pub commit_matched: bool,
    pub matched_file_diffs: MatchedFileDiffs,
}

impl CommitFilterResult {
    /// A commit-level result.
    pub fn from_bool(matched: bool) -> Self {
        CommitFilterResult {
            commit_matched: matched,
            matched_file_diffs: MatchedFileDiffs::Unevaluated,
        }
    }

    /// A file-level result over the given file diff indices.
    pub fn from_file_diffs(set: BTreeSet<usize>) -> Self {
        CommitFilterResult {
            commit_matched: false,
            matched_file_diffs: MatchedFileDiffs::from_set(set),
        }
    }

    /// Whether the commit should be reported.
    pub fn satisfies(&self) -> bool {
        self.commit_matched || self.matched_file_diffs.is_non_empty()
    }

    /// Logical AND of two results.
    pub fn intersect(self, other: CommitFilterResult) -> CommitFilterResult {
        use MatchedFileDiffs::*;

        let commit_matched = self.commit_matched && other.commit_matched;
        let matched_file_diffs = match (self.matched_file_diffs, other.matched_file_diffs) {
            (Unevaluated, Unevaluated) => Unevaluated,
            // A wildcard over a matched commit selects everything, over an
            // unmatched commit nothing.
            (Unevaluated, set) if self.commit_matched => set,
            (set, Unevaluated) if other.commit_matched => set,
            (Unevaluated, _) | (_, Unevaluated) => Empty,
            (Matched(a), Matched(b)) => {
                MatchedFileDiffs::from_set(a.intersection(&b).copied().collect())
            }
            (Empty, _) | (_, Empty) => Empty,
        };
        CommitFilterResult {
            commit_matched,
            matched_file_diffs,
        }
    }

    /// Logical OR of two results.
    pub fn union(self, other: CommitFilterResult) -> CommitFilterResult {
        use MatchedFileDiffs::*;

        let commit_matched = self.commit_matched || other.commit_matched;
        let matched_file_diffs = match (self.matched_file_diffs, other.matched_file_diffs) {
            (Unevaluated, Unevaluated) => Unevaluated,
            // A wildcard over a matched commit already covers everything.
            (Unevaluated, _) if self.commit_matched => Unevaluated,
            (_, Unevaluated) if other.commit_matched => Unevaluated,
            (Unevaluated, set) | (set, Unevaluated) => set,
            (Matched(mut a), Matched(b)) => {
                a.extend(b);
                Matched(a)
            }
            (Empty, set) | (set, Empty) => set,
        };
        CommitFilterResult {
            commit_matched,
            matched_file_diffs,
        }
    }

    /// Logical NOT, given the number of file diffs in the commit.
    ///
    /// Commit-level results flip. Evaluated sets are complemented against
    /// `0..file_count`, except that an empty set becomes the wildcard. The
    /// wildcard stands for every file diff, and it still holds on commits
    /// without any.
    pub fn invert(self, file_count: usize) -> CommitFilterResult {
        match self.matched_file_diffs {
            MatchedFileDiffs::Unevaluated => CommitFilterResult::from_bool(!self.commit_matched),
            MatchedFileDiffs::Empty => CommitFilterResult::from_bool(true),
            MatchedFileDiffs::Matched(set) => CommitFilterResult::from_file_diffs(
                (0..file_count).filter(|idx| !set.contains(idx)).collect(),
            ),
        }
    }
}
