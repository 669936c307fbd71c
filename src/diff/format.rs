//! Rendering a diff as text while moving its highlights along.
//!
//! The output has one line `<orig> <new>` per file, with spaces in the names
//! escaped as `\ `, followed by a `@@ -o,ol +n,nl @@ section` header and the
//! body of every hunk. Highlights are relative to a file name or to a line
//! without its prefix, and come out as ranges into the rendered text.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::diff::FileDiff;
use crate::matchtree::MatchedFileDiff;
use crate::result::range::{Location, Range};

/// Render `diff` and return the text with the absolute position of every
/// highlight in it.
///
/// Invalid UTF-8 in a line is rendered as U+FFFD, and the highlights of such
/// a line are placed on the rendered text.
pub fn format_diff(
    diff: &[FileDiff],
    highlights: &BTreeMap<usize, MatchedFileDiff>,
) -> (String, Vec<Range>) {
    let mut out = String::new();
    let mut ranges = Vec::new();
    let mut cursor = Location::default();

    for (file_idx, file) in diff.iter().enumerate() {
        let matched = highlights.get(&file_idx);

        let orig = escape_name(&file.orig_name);
        let new = escape_name(&file.new_name);
        if let Some(matched) = matched {
            ranges.extend(
                matched
                    .old_file
                    .iter()
                    .map(|r| escape_range(&file.orig_name, *r).add(cursor)),
            );
            let new_start = cursor.advanced(orig.as_bytes()).advanced(b" ");
            ranges.extend(
                matched
                    .new_file
                    .iter()
                    .map(|r| escape_range(&file.new_name, *r).add(new_start)),
            );
        }
        write(&mut out, &mut cursor, &format!("{orig} {new}\n"));

        for (hunk_idx, hunk) in file.hunks.iter().enumerate() {
            let mut header = format!(
                "@@ -{},{} +{},{} @@",
                hunk.orig_start, hunk.orig_lines, hunk.new_start, hunk.new_lines
            );
            if !hunk.section.is_empty() {
                header.push(' ');
                header.push_str(&hunk.section);
            }
            header.push('\n');
            write(&mut out, &mut cursor, &header);

            let matched_hunk = matched.and_then(|m| m.matched_hunks.get(&hunk_idx));
            for (line_idx, line) in hunk.lines().enumerate() {
                let rendered = String::from_utf8_lossy(line);
                if let Some(line_ranges) = matched_hunk.and_then(|h| h.matched_lines.get(&line_idx)) {
                    ranges.extend(
                        line_ranges
                            .iter()
                            .map(|r| line_range(line, &rendered, cursor, *r)),
                    );
                }
                write(&mut out, &mut cursor, &rendered);
                if !rendered.ends_with('\n') {
                    write(&mut out, &mut cursor, "\n");
                }
            }
        }
    }

    (out, ranges)
}

fn write(out: &mut String, cursor: &mut Location, text: &str) {
    out.push_str(text);
    cursor.advance(text.as_bytes());
}

fn escape_name(name: &str) -> Cow<'_, str> {
    if name.contains(' ') {
        Cow::Owned(name.replace(' ', "\\ "))
    } else {
        Cow::Borrowed(name)
    }
}

/// Move a range inside `name` to the same text inside the escaped name.
fn escape_range(name: &str, range: Range) -> Range {
    let shift = |loc: Location| {
        let spaces = name
            .as_bytes()
            .get(..loc.offset)
            .map_or(0, |prefix| prefix.iter().filter(|&&b| b == b' ').count());
        loc.add(Location::new(spaces, 0, spaces))
    };
    Range::new(shift(range.start), shift(range.end))
}

/// Place a range relative to the content of `line` (its prefix stripped)
/// into the output, where the line starts at `line_start`.
fn line_range(line: &[u8], rendered: &Cow<'_, str>, line_start: Location, range: Range) -> Range {
    if let Cow::Borrowed(_) = rendered {
        return range.add(line_start.add(Location::new(1, 0, 1)));
    }
    // Replacement characters change byte offsets; measure the rendered text
    // up to each end instead.
    let at = |loc: Location| {
        let raw = line.get(..loc.offset + 1).unwrap_or(line);
        let lossy = String::from_utf8_lossy(raw);
        let len = lossy.len().min(rendered.len());
        line_start.advanced(&rendered.as_bytes()[..len])
    };
    Range::new(at(range.start), at(range.end))
}
