//! Highlight trees produced by match-tree evaluation.
//!
//! A [`MatchedCommit`] records where a commit matched: ranges inside the
//! message, and for the diff a map file index → hunk index → line index →
//! ranges. Line ranges are relative to the line content without its `+`/`-`
//! prefix. Trees from different predicates are combined with `merge`, which
//! keeps every range of both sides.

use std::collections::BTreeMap;

use crate::matchtree::filter::MatchedFileDiffs;
use crate::result::range::Range;

/// Highlights for one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchedCommit {
    pub message: Vec<Range>,
    /// Keyed by file diff index.
    pub diff: BTreeMap<usize, MatchedFileDiff>,
}

/// Highlights for one file diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchedFileDiff {
    /// Ranges inside the original file name.
    pub old_file: Vec<Range>,
    /// Ranges inside the new file name.
    pub new_file: Vec<Range>,
    /// Keyed by hunk index.
    pub matched_hunks: BTreeMap<usize, MatchedHunk>,
}

/// Highlights for one hunk, keyed by body line index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchedHunk {
    pub matched_lines: BTreeMap<usize, Vec<Range>>,
}

impl MatchedCommit {
    pub fn is_empty(&self) -> bool {
        self.message.is_empty() && self.diff.is_empty()
    }

    pub fn merge(mut self, other: MatchedCommit) -> MatchedCommit {
        merge_ranges(&mut self.message, other.message);
        merge_maps(&mut self.diff, other.diff, MatchedFileDiff::merge);
        self
    }

    /// Drop diff highlights for file diffs outside `matched`. An unevaluated
    /// set keeps everything; an empty set drops all diff highlights.
    pub fn constrain_to_matched(&mut self, matched: &MatchedFileDiffs) {
        match matched {
            MatchedFileDiffs::Unevaluated => {}
            MatchedFileDiffs::Empty => self.diff.clear(),
            MatchedFileDiffs::Matched(files) => self.diff.retain(|idx, _| files.contains(idx)),
        }
    }
}

impl MatchedFileDiff {
    pub fn is_empty(&self) -> bool {
        self.old_file.is_empty() && self.new_file.is_empty() && self.matched_hunks.is_empty()
    }

    /// Whether only the file names are highlighted.
    pub fn names_only(&self) -> bool {
        self.matched_hunks.is_empty()
    }

    pub fn merge(mut self, other: MatchedFileDiff) -> MatchedFileDiff {
        merge_ranges(&mut self.old_file, other.old_file);
        merge_ranges(&mut self.new_file, other.new_file);
        merge_maps(&mut self.matched_hunks, other.matched_hunks, MatchedHunk::merge);
        self
    }
}

impl MatchedHunk {
    pub fn is_empty(&self) -> bool {
        self.matched_lines.is_empty()
    }

    pub fn merge(mut self, other: MatchedHunk) -> MatchedHunk {
        merge_maps(&mut self.matched_lines, other.matched_lines, |mut a, b| {
            merge_ranges(&mut a, b);
            a
        });
        self
    }
}

fn merge_ranges(into: &mut Vec<Range>, from: Vec<Range>) {
    if from.is_empty() {
        return;
    }
    into.extend(from);
    into.sort();
    into.dedup();
}

fn merge_maps<V: Default>(
    into: &mut BTreeMap<usize, V>,
    from: BTreeMap<usize, V>,
    merge: impl Fn(V, V) -> V,
) {
    for (idx, value) in from {
        let slot = into.entry(idx).or_default();
        *slot = merge(std::mem::take(slot), value);
    }
}
