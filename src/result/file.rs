//! Content, path and symbol matches inside a single file.

use serde::{Deserialize, Serialize};

use crate::result::key::{Key, TypeRank};
use crate::result::range::{Location, Range};
use crate::result::repo::RepoMatch;
use crate::result::select::{self, SelectPath};

/// A contiguous piece of file content together with the highlights inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMatch {
    pub content: String,
    /// Position of the first byte of `content` in the file.
    pub content_start: Location,
    /// Highlights in file coordinates.
    pub ranges: Vec<Range>,
}

impl ChunkMatch {
    pub fn match_count(&self) -> usize {
        self.ranges.len()
    }
}

/// A symbol definition that matched the query.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolMatch {
    pub name: String,
    /// Lowercase symbol kind, e.g. `function` or `class`.
    pub kind: String,
    pub line: usize,
}

/// Matches inside one file of one repository revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatch {
    pub repo: String,
    /// The resolved commit the file was read at.
    pub commit: String,
    /// The revision as the user spelled it, if any.
    pub input_rev: Option<String>,
    pub path: String,
    pub chunk_matches: Vec<ChunkMatch>,
    pub symbols: Vec<SymbolMatch>,
    /// Highlights inside the path itself.
    pub path_matches: Vec<Range>,
    pub limit_hit: bool,
}

impl FileMatch {
    pub fn key(&self) -> Key {
        Key {
            repo: self.repo.clone(),
            rev: self.input_rev.clone().unwrap_or_default(),
            commit: self.commit.clone(),
            path: self.path.clone(),
            type_rank: TypeRank::File,
            ..Default::default()
        }
    }

    fn content_match_count(&self) -> usize {
        self.chunk_matches.iter().map(ChunkMatch::match_count).sum()
    }

    /// Number of results this match represents. A path-only match still counts
    /// as one.
    pub fn result_count(&self) -> usize {
        (self.symbols.len() + self.content_match_count()).max(1)
    }

    /// Truncate to at most `limit` results and return how much of the limit is
    /// left. Symbols are kept before content matches.
    pub fn limit(&mut self, limit: usize) -> usize {
        let match_count = self.content_match_count();
        let symbol_count = self.symbols.len();
        if match_count == 0 && symbol_count == 0 {
            return limit.saturating_sub(1);
        }

        if limit < symbol_count {
            self.symbols.truncate(limit);
            self.chunk_matches.clear();
        } else {
            limit_chunks(&mut self.chunk_matches, limit - symbol_count);
        }
        self.limit_hit |= match_count + symbol_count > limit;
        limit.saturating_sub(symbol_count + match_count)
    }

    /// A copy of this match without any content or symbol highlights.
    fn path_only(&self) -> FileMatch {
        FileMatch {
            chunk_matches: Vec::new(),
            symbols: Vec::new(),
            ..self.clone()
        }
    }

    pub fn select(&self, path: &SelectPath) -> Option<FileMatch> {
        match path.root() {
            select::FILE => {
                let mut selected = self.path_only();
                if path.fields().first().map(String::as_str) == Some("directory") {
                    selected.path = parent_directory(&self.path);
                    selected.path_matches.clear();
                }
                Some(selected)
            }
            select::CONTENT => {
                if self.chunk_matches.is_empty() {
                    return None;
                }
                Some(FileMatch {
                    symbols: Vec::new(),
                    ..self.clone()
                })
            }
            select::SYMBOL => {
                let kind = path.fields().first();
                let symbols: Vec<SymbolMatch> = self
                    .symbols
                    .iter()
                    .filter(|s| kind.is_none_or(|k| s.kind.eq_ignore_ascii_case(k)))
                    .cloned()
                    .collect();
                if symbols.is_empty() {
                    return None;
                }
                Some(FileMatch {
                    symbols,
                    chunk_matches: Vec::new(),
                    ..self.clone()
                })
            }
            _ => None,
        }
    }

    /// The repository this file lives in, as a repository match.
    pub fn repo_match(&self) -> RepoMatch {
        RepoMatch {
            name: self.repo.clone(),
            rev: self.input_rev.clone(),
            ..Default::default()
        }
    }

    /// Merge the highlights of another match for the same file into this one.
    pub fn append_matches(&mut self, other: &FileMatch) {
        self.chunk_matches.extend(other.chunk_matches.iter().cloned());
        self.chunk_matches.sort_by_key(|c| c.content_start);
        self.chunk_matches.dedup();

        self.symbols.extend(other.symbols.iter().cloned());
        self.symbols.sort();
        self.symbols.dedup();

        self.path_matches.extend(other.path_matches.iter().copied());
        self.path_matches.sort();
        self.path_matches.dedup();

        self.limit_hit |= other.limit_hit;
    }
}

/// Keep at most `limit` highlight ranges across `chunks`, dropping chunks that
/// end up with none.
fn limit_chunks(chunks: &mut Vec<ChunkMatch>, mut limit: usize) {
    chunks.retain_mut(|chunk| {
        if limit == 0 {
            return false;
        }
        chunk.ranges.truncate(limit);
        limit -= chunk.ranges.len();
        true
    });
}

fn parent_directory(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..=idx].to_string(),
        None => "/".to_string(),
    }
}
