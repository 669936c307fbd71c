//! Unified diffs: the parsed structure, a parser for git output, and the
//! splitter and formatter that turn a highlighted diff into a bounded preview.
//!
//! # Module Structure
//!
//! - `parse`: parse `git diff-tree -p` output into [`FileDiff`]s
//! - `split`: cut hunks down to the lines around matches
//! - `format`: render a diff as text and move highlights along

pub mod format;
pub mod parse;
pub mod split;

pub use format::format_diff;
pub use parse::parse_diff;
pub use split::split_diff;

/// Name used for the missing side of an added or deleted file.
pub const DEV_NULL: &str = "/dev/null";

/// The changes made to a single file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    /// Path before the change, or [`DEV_NULL`] for added files.
    pub orig_name: String,
    /// Path after the change, or [`DEV_NULL`] for deleted files.
    pub new_name: String,
    /// Extended header lines (`index ...`, `new file mode ...`, ...).
    pub extended: Vec<String>,
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    /// The path the file lives at after the change, or before it if deleted.
    pub fn path(&self) -> &str {
        if self.new_name == DEV_NULL {
            &self.orig_name
        } else {
            &self.new_name
        }
    }
}

/// A contiguous region of changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hunk {
    pub orig_start: usize,
    pub orig_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    /// Text following the second `@@` of the header, usually the enclosing
    /// function.
    pub section: String,
    /// Raw body lines, each including its `+`, `-`, ` ` or `\` prefix and its
    /// trailing newline, if any.
    pub body: Vec<u8>,
}

impl Hunk {
    /// Iterate over the body lines, newlines included.
    pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
        self.body.split_inclusive(|&b| b == b'\n')
    }
}

/// How a body line affects the old and new side of a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Added,
    Removed,
    Context,
    /// `\ No newline at end of file` and similar markers.
    Marker,
}

impl LineKind {
    pub fn of(line: &[u8]) -> LineKind {
        match line.first() {
            Some(b'+') => LineKind::Added,
            Some(b'-') => LineKind::Removed,
            Some(b'\\') => LineKind::Marker,
            _ => LineKind::Context,
        }
    }

    pub fn is_change(self) -> bool {
        matches!(self, LineKind::Added | LineKind::Removed)
    }

    /// Number of lines this kind consumes on the (old, new) side.
    pub fn advance(self) -> (usize, usize) {
        match self {
            LineKind::Added => (0, 1),
            LineKind::Removed => (1, 0),
            LineKind::Context => (1, 1),
            LineKind::Marker => (0, 0),
        }
    }
}

/// The content of a changed line without its prefix and newline.
pub fn line_content(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.get(1..).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_kind() {
        assert_eq!(LineKind::of(b"+added\n"), LineKind::Added);
        assert_eq!(LineKind::of(b"-removed"), LineKind::Removed);
        assert_eq!(LineKind::of(b" ctx\n"), LineKind::Context);
        assert_eq!(LineKind::of(b"\\ No newline at end of file\n"), LineKind::Marker);
        assert!(LineKind::Added.is_change());
        assert!(!LineKind::Context.is_change());
    }

    #[test]
    fn test_line_content() {
        assert_eq!(line_content(b"+foo\n"), b"foo");
        assert_eq!(line_content(b"-bar"), b"bar");
        assert_eq!(line_content(b"+\n"), b"");
        assert_eq!(line_content(b""), b"");
    }

    #[test]
    fn test_hunk_lines_keep_newlines() {
        let hunk = Hunk {
            body: b" a\n+b\n-c".to_vec(),
            ..Default::default()
        };
        let lines: Vec<&[u8]> = hunk.lines().collect();
        assert_eq!(lines, vec![&b" a\n"[..], &b"+b\n"[..], &b"-c"[..]]);
    }

    #[test]
    fn test_path_of_deleted_file() {
        let diff = FileDiff {
            orig_name: "old.rs".into(),
            new_name: DEV_NULL.into(),
            ..Default::default()
        };
        assert_eq!(diff.path(), "old.rs");
    }
}
