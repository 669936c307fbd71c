//! Parser for the unified diff format produced by
//! `git diff-tree --no-prefix -p`.

use crate::diff::{DEV_NULL, FileDiff, Hunk, LineKind};
use crate::error::{Result, SiftError};

const DIFF_GIT: &[u8] = b"diff --git ";

/// Parse a multi-file unified diff.
///
/// Blank lines between file diffs are ignored. Hunk bodies are read according
/// to the line counts in their header, so body lines that look like headers
/// (`--- a`, `@@ ...`) are handled correctly.
pub fn parse_diff(raw: &[u8]) -> Result<Vec<FileDiff>> {
    let mut lines = raw.split_inclusive(|&b| b == b'\n').peekable();
    let mut diffs = Vec::new();

    while let Some(line) = lines.next() {
        let text = trim_newline(line);
        if text.is_empty() {
            continue;
        }
        let Some(header) = text.strip_prefix(DIFF_GIT) else {
            return Err(SiftError::diff_parse(format!(
                "expected file header, found '{}'",
                String::from_utf8_lossy(text)
            )));
        };

        let mut diff = FileDiff::default();
        let (mut orig, mut new) = split_git_header(header);

        // Extended headers up to the first hunk or the next file.
        while let Some(&next) = lines.peek() {
            let text = trim_newline(next);
            if text.starts_with(DIFF_GIT) || text.starts_with(b"@@ ") {
                break;
            }
            lines.next();
            if let Some(name) = text.strip_prefix(b"--- ") {
                orig = Some(path_from_header(name));
            } else if let Some(name) = text.strip_prefix(b"+++ ") {
                new = Some(path_from_header(name));
            } else if let Some(name) = text.strip_prefix(b"rename from ") {
                orig = Some(lossy(name));
                diff.extended.push(lossy(text));
            } else if let Some(name) = text.strip_prefix(b"rename to ") {
                new = Some(lossy(name));
                diff.extended.push(lossy(text));
            } else if text.starts_with(b"new file mode ") {
                orig = Some(DEV_NULL.to_string());
                diff.extended.push(lossy(text));
            } else if text.starts_with(b"deleted file mode ") {
                new = Some(DEV_NULL.to_string());
                diff.extended.push(lossy(text));
            } else if !text.is_empty() {
                diff.extended.push(lossy(text));
            }
        }

        while let Some(&next) = lines.peek() {
            if !next.starts_with(b"@@ ") {
                break;
            }
            lines.next();
            diff.hunks.push(parse_hunk(trim_newline(next), &mut lines)?);
        }

        diff.orig_name = orig.unwrap_or_default();
        diff.new_name = new.unwrap_or_default();
        diffs.push(diff);
    }

    Ok(diffs)
}

fn parse_hunk<'a, I>(header: &[u8], lines: &mut std::iter::Peekable<I>) -> Result<Hunk>
where
    I: Iterator<Item = &'a [u8]>,
{
    let mut hunk = parse_hunk_header(header)?;
    let (mut orig_left, mut new_left) = (hunk.orig_lines, hunk.new_lines);

    loop {
        let Some(&line) = lines.peek() else { break };
        let kind = LineKind::of(line);
        let pending = orig_left > 0 || new_left > 0;
        if !pending && kind != LineKind::Marker {
            break;
        }
        if pending && !matches!(line.first(), Some(b' ' | b'+' | b'-' | b'\\' | b'\n')) {
            return Err(SiftError::diff_parse(format!(
                "unexpected line in hunk: '{}'",
                String::from_utf8_lossy(trim_newline(line))
            )));
        }

        let (orig, new) = kind.advance();
        if orig > orig_left || new > new_left {
            return Err(SiftError::diff_parse("hunk body longer than its header"));
        }
        orig_left -= orig;
        new_left -= new;
        hunk.body.extend_from_slice(line);
        lines.next();
    }

    if orig_left > 0 || new_left > 0 {
        return Err(SiftError::diff_parse("unexpected end of hunk body"));
    }
    Ok(hunk)
}

/// Parse `@@ -a[,b] +c[,d] @@[ section]`.
fn parse_hunk_header(header: &[u8]) -> Result<Hunk> {
    let invalid = || {
        SiftError::diff_parse(format!(
            "invalid hunk header '{}'",
            String::from_utf8_lossy(header)
        ))
    };

    let rest = header.strip_prefix(b"@@ -").ok_or_else(invalid)?;
    let close = rest
        .windows(3)
        .position(|w| w == b" @@")
        .ok_or_else(invalid)?;
    let ranges = std::str::from_utf8(&rest[..close]).map_err(|_| invalid())?;
    let section = &rest[close + 3..];
    let section = section.strip_prefix(b" ").unwrap_or(section);

    let (orig, new) = ranges.split_once(" +").ok_or_else(invalid)?;
    let (orig_start, orig_lines) = parse_range(orig).ok_or_else(invalid)?;
    let (new_start, new_lines) = parse_range(new).ok_or_else(invalid)?;

    Ok(Hunk {
        orig_start,
        orig_lines,
        new_start,
        new_lines,
        section: lossy(section),
        body: Vec::new(),
    })
}

/// Parse `start[,count]`. The count defaults to one.
fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Names from `diff --git <orig> <new>`. Only unambiguous when both names are
/// equal, which holds for every diff without a rename.
fn split_git_header(header: &[u8]) -> (Option<String>, Option<String>) {
    if header.len() % 2 == 1 {
        let half = header.len() / 2;
        let (orig, new) = (&header[..half], &header[half + 1..]);
        if orig == new && header[half] == b' ' {
            return (Some(lossy(orig)), Some(lossy(new)));
        }
    }
    (None, None)
}

/// The path from a `---`/`+++` line, dropping any tab-separated timestamp.
fn path_from_header(name: &[u8]) -> String {
    let end = name.iter().position(|&b| b == b'\t').unwrap_or(name.len());
    lossy(&name[..end])
}

fn trim_newline(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\n").unwrap_or(line)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modified_file() {
        let raw = b"diff --git src/main.rs src/main.rs
index 1234567..89abcde 100644
--- src/main.rs
+++ src/main.rs
@@ -1,3 +1,3 @@ fn main() {
 fn main() {
-    println!(\"hello\");
+    println!(\"world\");
 }
";
        let diffs = parse_diff(raw).unwrap();
        assert_eq!(diffs.len(), 1);
        let diff = &diffs[0];
        assert_eq!(diff.orig_name, "src/main.rs");
        assert_eq!(diff.new_name, "src/main.rs");
        assert_eq!(diff.extended, vec!["index 1234567..89abcde 100644"]);

        let hunk = &diff.hunks[0];
        assert_eq!((hunk.orig_start, hunk.orig_lines), (1, 3));
        assert_eq!((hunk.new_start, hunk.new_lines), (1, 3));
        assert_eq!(hunk.section, "fn main() {");
        assert_eq!(hunk.lines().count(), 4);
    }

    #[test]
    fn test_parse_added_and_deleted() {
        let raw = b"
diff --git new.txt new.txt
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ new.txt
@@ -0,0 +1 @@
+hello
diff --git old.txt old.txt
deleted file mode 100644
index e69de29..0000000
--- old.txt
+++ /dev/null
@@ -1,2 +0,0 @@
-bye
-now
";
        let diffs = parse_diff(raw).unwrap();
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].orig_name, DEV_NULL);
        assert_eq!(diffs[0].new_name, "new.txt");
        assert_eq!(diffs[0].hunks[0].new_lines, 1);
        assert_eq!(diffs[1].new_name, DEV_NULL);
        assert_eq!(diffs[1].hunks[0].body, b"-bye\n-now\n");
    }

    #[test]
    fn test_parse_binary_and_rename() {
        let raw = b"diff --git logo.png logo.png
new file mode 100644
index 0000000..1111111
Binary files /dev/null and logo.png differ
diff --git a.txt b.txt
similarity index 100%
rename from a.txt
rename to b.txt
";
        let diffs = parse_diff(raw).unwrap();
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].orig_name, DEV_NULL);
        assert_eq!(diffs[0].new_name, "logo.png");
        assert!(diffs[0].hunks.is_empty());
        assert_eq!(diffs[1].orig_name, "a.txt");
        assert_eq!(diffs[1].new_name, "b.txt");
    }

    #[test]
    fn test_body_lines_that_look_like_headers() {
        let raw = b"diff --git notes.md notes.md
--- notes.md
+++ notes.md
@@ -1,2 +1,2 @@
--- a
+++ b
 @@ not a header
";
        let diffs = parse_diff(raw).unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].hunks.len(), 1);
        assert_eq!(diffs[0].hunks[0].lines().count(), 3);

        let raw = b"diff --git notes.md notes.md
--- notes.md
+++ notes.md
@@ -1,1 +1,1 @@
--- a
+++ b
";
        let diffs = parse_diff(raw).unwrap();
        assert_eq!(diffs[0].hunks[0].body, b"--- a\n+++ b\n");
    }

    #[test]
    fn test_no_newline_marker() {
        let raw = b"diff --git f f
--- f
+++ f
@@ -1 +1 @@
-a
\\ No newline at end of file
+b
\\ No newline at end of file
";
        let diffs = parse_diff(raw).unwrap();
        let hunk = &diffs[0].hunks[0];
        assert_eq!(hunk.lines().count(), 4);
        assert_eq!(hunk.orig_lines, 1);
    }

    #[test]
    fn test_multiple_hunks() {
        let raw = b"diff --git f f
--- f
+++ f
@@ -1,1 +1,1 @@
-a
+b
@@ -10,1 +10,2 @@ section
 c
+d
";
        let diffs = parse_diff(raw).unwrap();
        assert_eq!(diffs[0].hunks.len(), 2);
        assert_eq!(diffs[0].hunks[1].section, "section");
        assert_eq!(diffs[0].hunks[1].new_start, 10);
    }

    #[test]
    fn test_truncated_hunk_is_error() {
        let raw = b"diff --git f f\n--- f\n+++ f\n@@ -1,3 +1,3 @@\n a\n";
        assert!(parse_diff(raw).is_err());
    }

    #[test]
    fn test_garbage_is_error() {
        assert!(parse_diff(b"not a diff\n").is_err());
        assert!(parse_diff(b"diff --git f f\n@@ -x +1 @@\n").is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_diff(b"").unwrap().is_empty());
        assert!(parse_diff(b"\n\n").unwrap().is_empty());
    }
}
