//! Positions and ranges inside matched content.
//!
//! A [`Location`] carries three coordinates at once: the byte offset, the
//! 0-based line (number of newlines before the position) and the column
//! (number of UTF-8 runes since the last newline). Highlights computed relative
//! to a piece of content can be moved into another coordinate frame, such as
//! a rendered diff preview, with [`Range::add`].

use std::ops::Range as ByteRange;

use regex::bytes::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// A position inside some content.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Location {
    /// Byte offset from the start of the content.
    pub offset: usize,
    /// Number of newlines before this position.
    pub line: usize,
    /// Number of runes between the last newline and this position.
    pub column: usize,
}

impl Location {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Location {
            offset,
            line,
            column,
        }
    }

    /// Shift this location by `other`, field by field.
    pub fn add(self, other: Location) -> Location {
        Location {
            offset: self.offset + other.offset,
            line: self.line + other.line,
            column: self.column + other.column,
        }
    }

    /// Inverse of [`Location::add`]. Saturates at zero.
    pub fn sub(self, other: Location) -> Location {
        Location {
            offset: self.offset.saturating_sub(other.offset),
            line: self.line.saturating_sub(other.line),
            column: self.column.saturating_sub(other.column),
        }
    }

    /// Move this location past `bytes`.
    pub fn advance(&mut self, bytes: &[u8]) {
        self.offset += bytes.len();
        match bytes.iter().rposition(|&b| b == b'\n') {
            Some(last_newline) => {
                self.line += bytes.iter().filter(|&&b| b == b'\n').count();
                self.column = count_runes(&bytes[last_newline + 1..]);
            }
            None => self.column += count_runes(bytes),
        }
    }

    /// Copying variant of [`Location::advance`].
    pub fn advanced(mut self, bytes: &[u8]) -> Location {
        self.advance(bytes);
        self
    }
}

/// A half-open interval `[start, end)`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Range {
    pub start: Location,
    pub end: Location,
}

impl Range {
    pub fn new(start: Location, end: Location) -> Self {
        Range { start, end }
    }

    /// Shift both ends by `loc`.
    pub fn add(self, loc: Location) -> Range {
        Range {
            start: self.start.add(loc),
            end: self.end.add(loc),
        }
    }

    /// Shift both ends back by `loc`.
    pub fn sub(self, loc: Location) -> Range {
        Range {
            start: self.start.sub(loc),
            end: self.end.sub(loc),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset >= self.end.offset
    }

    /// The byte span covered by this range.
    pub fn byte_range(&self) -> ByteRange<usize> {
        self.start.offset..self.end.offset
    }
}

/// Number of runes in `bytes`. Every byte of an invalid UTF-8 sequence counts
/// as one rune.
pub fn count_runes(bytes: &[u8]) -> usize {
    bytes
        .utf8_chunks()
        .map(|chunk| chunk.valid().chars().count() + chunk.invalid().len())
        .sum()
}

/// Convert ordered, non-overlapping byte spans (as produced by a regex
/// `find_iter`) into ranges with line and column information.
///
/// The content is scanned once, front to back, so the total cost is linear in
/// the length of the content regardless of the number of matches.
pub fn matches_to_ranges<I>(content: &[u8], matches: I) -> Vec<Range>
where
    I: IntoIterator<Item = (usize, usize)>,
{
    let mut ranges = Vec::new();
    let mut cursor = Location::default();
    for (start, end) in matches {
        debug_assert!(cursor.offset <= start && start <= end && end <= content.len());
        cursor.advance(&content[cursor.offset..start]);
        let start_loc = cursor;
        cursor.advance(&content[start..end]);
        ranges.push(Range::new(start_loc, cursor));
    }
    ranges
}

/// A regex match together with the ranges of its capture groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRanges {
    /// The whole match.
    pub range: Range,
    /// Participating capture groups in group order, named by their group
    /// name or `$N` for unnamed groups.
    pub groups: Vec<(String, Range)>,
}

/// Compute ranges for a match and its capture groups, relative to the start
/// of `content`.
pub fn captures_to_ranges(content: &[u8], regex: &Regex, captures: &Captures) -> CaptureRanges {
    let whole = captures.get_match();
    let start = Location::default().advanced(&content[..whole.start()]);
    let locate = |span: ByteRange<usize>| {
        let s = start.advanced(&content[whole.start()..span.start]);
        let e = s.advanced(&content[span.start..span.end]);
        Range::new(s, e)
    };

    let groups = regex
        .capture_names()
        .enumerate()
        .skip(1)
        .filter_map(|(index, name)| {
            let group = captures.get(index)?;
            let name = match name {
                Some(name) => name.to_string(),
                None => format!("${index}"),
            };
            Some((name, locate(group.range())))
        })
        .collect();

    CaptureRanges {
        range: locate(whole.range()),
        groups,
    }
}
