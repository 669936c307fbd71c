//! Commit and per-file commit diff matches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::DEV_NULL;
use crate::result::file::FileMatch;
use crate::result::key::{Key, TypeRank};
use crate::result::range::{Location, Range};
use crate::result::repo::{RepoMatch, merge_ranges};
use crate::result::select::{self, SelectPath};

/// A piece of text together with highlighted ranges inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedString {
    pub content: String,
    pub matched_ranges: Vec<Range>,
}

impl MatchedString {
    pub fn new(content: impl Into<String>, matched_ranges: Vec<Range>) -> Self {
        MatchedString {
            content: content.into(),
            matched_ranges,
        }
    }

    /// Truncate to `limit` highlights and return the remaining limit. A
    /// preview without highlights counts as one result.
    fn limit(&mut self, limit: usize) -> usize {
        let count = self.matched_ranges.len();
        if count == 0 {
            limit.saturating_sub(1)
        } else if count > limit {
            self.matched_ranges.truncate(limit);
            0
        } else {
            limit - count
        }
    }

    fn result_count(&self) -> usize {
        self.matched_ranges.len().max(1)
    }

    fn append(&mut self, other: &MatchedString) {
        if self.content == other.content {
            merge_ranges(&mut self.matched_ranges, &other.matched_ranges);
        }
    }

    /// Keep only the highlighted diff lines starting with `prefix` (`+` or
    /// `-`), along with file and hunk header lines. Returns `None` when no
    /// such line exists.
    pub fn select_modified_lines(&self, prefix: u8) -> Option<MatchedString> {
        let mut content = String::new();
        let mut ranges = Vec::new();
        let mut kept_modified = false;

        let mut old_start = Location::default();
        let mut new_start = Location::default();
        for line in self.content.split_inclusive('\n') {
            let old_end = old_start.advanced(line.as_bytes());
            let on_line: Vec<Range> = self
                .matched_ranges
                .iter()
                .filter(|r| r.start.offset >= old_start.offset && r.start.offset < old_end.offset)
                .copied()
                .collect();

            let is_header = !matches!(line.as_bytes().first(), Some(b' ' | b'+' | b'-'));
            let is_selected = line.as_bytes().first() == Some(&prefix) && !on_line.is_empty();
            if is_header || is_selected {
                kept_modified |= is_selected;
                ranges.extend(on_line.iter().map(|r| r.sub(old_start).add(new_start)));
                content.push_str(line);
                new_start.advance(line.as_bytes());
            }
            old_start = old_end;
        }

        kept_modified.then(|| MatchedString::new(content, ranges))
    }
}

/// Name, email and timestamp of a commit author or committer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub date: DateTime<Utc>,
}

/// A commit that matched a query.
///
/// Exactly one of `message_preview` and `diff_preview` is normally set: diff
/// searches render the constrained diff, message searches the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMatch {
    pub repo: String,
    pub oid: String,
    pub author: Signature,
    pub committer: Option<Signature>,
    pub message: String,
    pub parents: Vec<String>,
    pub refs: Vec<String>,
    pub source_refs: Vec<String>,
    pub modified_files: Vec<String>,
    pub message_preview: Option<MatchedString>,
    pub diff_preview: Option<MatchedString>,
}

impl CommitMatch {
    pub fn key(&self) -> Key {
        Key {
            repo: self.repo.clone(),
            author_date: Some(self.author.date),
            commit: self.oid.clone(),
            type_rank: if self.diff_preview.is_some() {
                TypeRank::Diff
            } else {
                TypeRank::Commit
            },
            ..Default::default()
        }
    }

    /// The preview shown for this match: the diff if present, else the message.
    pub fn body(&self) -> Option<&MatchedString> {
        self.diff_preview.as_ref().or(self.message_preview.as_ref())
    }

    fn body_mut(&mut self) -> Option<&mut MatchedString> {
        match self.diff_preview {
            Some(ref mut diff) => Some(diff),
            None => self.message_preview.as_mut(),
        }
    }

    pub fn result_count(&self) -> usize {
        self.body().map_or(1, MatchedString::result_count)
    }

    pub fn limit(&mut self, limit: usize) -> usize {
        match self.body_mut() {
            Some(body) => body.limit(limit),
            None => limit.saturating_sub(1),
        }
    }

    pub fn repo_match(&self) -> RepoMatch {
        RepoMatch {
            name: self.repo.clone(),
            ..Default::default()
        }
    }

    pub fn select(&self, path: &SelectPath) -> Option<CommitMatch> {
        if path.root() != select::COMMIT {
            return None;
        }
        match path.fields() {
            [] => Some(self.clone()),
            [diff] if diff == "diff" => self.diff_preview.as_ref().map(|_| self.clone()),
            [_, kind] => {
                let prefix = if kind == "added" { b'+' } else { b'-' };
                let preview = self.diff_preview.as_ref()?.select_modified_lines(prefix)?;
                Some(CommitMatch {
                    diff_preview: Some(preview),
                    ..self.clone()
                })
            }
            _ => None,
        }
    }

    pub fn append_matches(&mut self, other: &CommitMatch) {
        if let (Some(a), Some(b)) = (&mut self.message_preview, &other.message_preview) {
            a.append(b);
        }
        if let (Some(a), Some(b)) = (&mut self.diff_preview, &other.diff_preview) {
            a.append(b);
        }
    }
}

/// The diff of a single file within a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDiffMatch {
    pub repo: String,
    pub oid: String,
    pub author_date: DateTime<Utc>,
    pub orig_name: String,
    pub new_name: String,
    pub preview: MatchedString,
}

impl CommitDiffMatch {
    /// The current path of the file, or its old path when it was deleted.
    pub fn path(&self) -> &str {
        if self.new_name == DEV_NULL {
            &self.orig_name
        } else {
            &self.new_name
        }
    }

    pub fn key(&self) -> Key {
        Key {
            repo: self.repo.clone(),
            author_date: Some(self.author_date),
            commit: self.oid.clone(),
            path: self.path().to_string(),
            type_rank: TypeRank::Diff,
            ..Default::default()
        }
    }

    pub fn result_count(&self) -> usize {
        self.preview.result_count()
    }

    pub fn limit(&mut self, limit: usize) -> usize {
        self.preview.limit(limit)
    }

    pub fn repo_match(&self) -> RepoMatch {
        RepoMatch {
            name: self.repo.clone(),
            ..Default::default()
        }
    }

    pub fn file_match(&self) -> FileMatch {
        FileMatch {
            repo: self.repo.clone(),
            commit: self.oid.clone(),
            path: self.path().to_string(),
            ..Default::default()
        }
    }

    pub fn select(&self, path: &SelectPath) -> Option<CommitDiffMatch> {
        if path.root() != select::COMMIT {
            return None;
        }
        match path.fields() {
            [_, kind] => {
                let prefix = if kind == "added" { b'+' } else { b'-' };
                let preview = self.preview.select_modified_lines(prefix)?;
                Some(CommitDiffMatch {
                    preview,
                    ..self.clone()
                })
            }
            _ => Some(self.clone()),
        }
    }

    pub fn append_matches(&mut self, other: &CommitDiffMatch) {
        self.preview.append(&other.preview);
    }
}
