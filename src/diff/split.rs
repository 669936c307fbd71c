//! Cutting a highlighted diff down to a bounded preview.
//!
//! Every changed line is either *matching* (it carries a highlight, or no
//! highlights were given at all) or not. Lines within
//! `match_context_lines` of a matching line are kept as context, everything
//! else is dropped. Dropping a line splits the hunk, and each piece becomes a
//! new [`Hunk`] whose start lines follow from the lines skipped before it.
//!
//! A piece stops growing once it holds `max_lines_per_hunk` lines. It stays
//! open until its input hunk ends, and every further matching line is counted
//! and reported as `... +N` at the end of its section.

use std::collections::BTreeMap;

use crate::config::DiffPreviewConfig;
use crate::diff::{FileDiff, Hunk, LineKind};
use crate::matchtree::{MatchedFileDiff, MatchedHunk};

/// Split `diff` into a preview bounded by `config`.
///
/// With `highlights`, only highlighted file diffs are kept; a file diff whose
/// names are highlighted but none of its lines is shown in full. Without
/// highlights every changed line counts as matching. The returned highlights
/// are re-indexed to the returned files, hunks and lines.
pub fn split_diff(
    diff: &[FileDiff],
    highlights: Option<&BTreeMap<usize, MatchedFileDiff>>,
    config: &DiffPreviewConfig,
) -> (Vec<FileDiff>, BTreeMap<usize, MatchedFileDiff>) {
    let mut files = Vec::new();
    let mut file_highlights = BTreeMap::new();

    for (file_idx, file) in diff.iter().enumerate() {
        if files.len() >= config.max_files {
            break;
        }
        let matched = match highlights {
            Some(map) => match map.get(&file_idx) {
                Some(matched) => Some(matched),
                None => continue,
            },
            None => None,
        };
        let show_everything = matched.is_none_or(MatchedFileDiff::names_only);

        let mut hunks = Vec::new();
        let mut hunk_highlights = BTreeMap::new();
        for (hunk_idx, hunk) in file.hunks.iter().enumerate() {
            if hunks.len() >= config.max_hunks_per_file {
                break;
            }
            let matched_hunk = match matched {
                Some(m) if !show_everything => match m.matched_hunks.get(&hunk_idx) {
                    Some(h) => Some(h),
                    None => continue,
                },
                _ => None,
            };
            for (piece, piece_highlights) in split_hunk(hunk, matched_hunk, config) {
                if hunks.len() >= config.max_hunks_per_file {
                    break;
                }
                if !piece_highlights.is_empty() {
                    hunk_highlights.insert(hunks.len(), piece_highlights);
                }
                hunks.push(piece);
            }
        }

        let highlight = MatchedFileDiff {
            old_file: matched.map(|m| m.old_file.clone()).unwrap_or_default(),
            new_file: matched.map(|m| m.new_file.clone()).unwrap_or_default(),
            matched_hunks: hunk_highlights,
        };
        if !highlight.is_empty() {
            file_highlights.insert(files.len(), highlight);
        }
        files.push(FileDiff {
            orig_name: file.orig_name.clone(),
            new_name: file.new_name.clone(),
            extended: file.extended.clone(),
            hunks,
        });
    }

    (files, file_highlights)
}

/// A hunk under construction.
struct Piece {
    orig_start: usize,
    new_start: usize,
    orig_lines: usize,
    new_lines: usize,
    body: Vec<u8>,
    line_count: usize,
    extra: usize,
    highlights: MatchedHunk,
}

impl Piece {
    fn new(orig_start: usize, new_start: usize) -> Self {
        Piece {
            orig_start,
            new_start,
            orig_lines: 0,
            new_lines: 0,
            body: Vec::new(),
            line_count: 0,
            extra: 0,
            highlights: MatchedHunk::default(),
        }
    }

    fn finish(self, section: &str) -> (Hunk, MatchedHunk) {
        let section = match (self.extra, section.is_empty()) {
            (0, _) => section.to_string(),
            (extra, true) => format!("... +{extra}"),
            (extra, false) => format!("{section} ... +{extra}"),
        };
        let hunk = Hunk {
            orig_start: self.orig_start,
            orig_lines: self.orig_lines,
            new_start: self.new_start,
            new_lines: self.new_lines,
            section,
            body: self.body,
        };
        (hunk, self.highlights)
    }
}

fn split_hunk(
    hunk: &Hunk,
    matched: Option<&MatchedHunk>,
    config: &DiffPreviewConfig,
) -> Vec<(Hunk, MatchedHunk)> {
    let lines: Vec<&[u8]> = hunk.lines().collect();
    let kinds: Vec<LineKind> = lines.iter().map(|l| LineKind::of(l)).collect();
    let matching: Vec<bool> = kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            kind.is_change() && matched.is_none_or(|m| m.matched_lines.contains_key(&i))
        })
        .collect();

    let ctx = config.match_context_lines;
    let mut keep = vec![false; lines.len()];
    for (i, _) in matching.iter().enumerate().filter(|(_, m)| **m) {
        let end = (i + ctx).min(lines.len() - 1);
        keep[i.saturating_sub(ctx)..=end].fill(true);
    }
    // A "\ No newline" marker belongs to the line before it.
    for i in 1..lines.len() {
        if kinds[i] == LineKind::Marker {
            keep[i] = keep[i - 1];
        }
    }

    let mut pieces = Vec::new();
    let mut current: Option<Piece> = None;
    let mut orig = hunk.orig_start;
    let mut new = hunk.new_start;

    for (i, line) in lines.iter().enumerate() {
        let (orig_advance, new_advance) = kinds[i].advance();
        if keep[i] {
            let piece = current.get_or_insert_with(|| Piece::new(orig, new));
            if piece.line_count >= config.max_lines_per_hunk {
                if matching[i] {
                    piece.extra += 1;
                }
            } else {
                if let Some(ranges) = matched.and_then(|m| m.matched_lines.get(&i)) {
                    piece
                        .highlights
                        .matched_lines
                        .insert(piece.line_count, ranges.clone());
                }
                piece.body.extend_from_slice(line);
                piece.orig_lines += orig_advance;
                piece.new_lines += new_advance;
                piece.line_count += 1;
            }
        } else if current
            .as_ref()
            .is_some_and(|p| p.line_count < config.max_lines_per_hunk)
        {
            if let Some(piece) = current.take() {
                pieces.push(piece.finish(&hunk.section));
            }
        }
        orig += orig_advance;
        new += new_advance;
    }
    if let Some(piece) = current {
        pieces.push(piece.finish(&hunk.section));
    }
    pieces
}
