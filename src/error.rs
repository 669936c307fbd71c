//! Error types for sift.
//!
//! All fallible operations in the crate return [`Result`], whose error type is
//! [`SiftError`]. Query construction errors are reported once when a match tree
//! is built; per-commit errors (diff fetch, diff parse, committer date) are
//! reported from evaluation and must not be confused with "no match".

use thiserror::Error;

/// The error type for sift operations.
#[derive(Debug, Error)]
pub enum SiftError {
    /// An argument supplied by the caller was invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A query node could not be turned into a match tree.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The query contained a node type the evaluator does not know.
    #[error("unknown query node type: {0}")]
    UnknownNode(String),

    /// A regular expression failed to compile.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A unified diff could not be parsed.
    #[error("diff parse error: {0}")]
    DiffParse(String),

    /// Commit metadata could not be resolved.
    #[error("commit error: {0}")]
    Commit(String),

    /// The git subprocess misbehaved.
    #[error("subprocess error: {message}{}", format_stderr(.stderr))]
    Subprocess {
        /// What went wrong.
        message: String,
        /// Captured stderr of the subprocess, if any.
        stderr: Option<String>,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_stderr(stderr: &Option<String>) -> String {
    match stderr {
        Some(s) if !s.trim().is_empty() => format!(" (stderr: {})", s.trim()),
        _ => String::new(),
    }
}

/// Result type alias for sift operations.
pub type Result<T> = std::result::Result<T, SiftError>;

impl SiftError {
    /// Create an invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        SiftError::InvalidArgument(msg.into())
    }

    /// Create an invalid query error.
    pub fn invalid_query<S: Into<String>>(msg: S) -> Self {
        SiftError::InvalidQuery(msg.into())
    }

    /// Create an unknown node error.
    pub fn unknown_node<S: Into<String>>(node: S) -> Self {
        SiftError::UnknownNode(node.into())
    }

    /// Create a diff parse error.
    pub fn diff_parse<S: Into<String>>(msg: S) -> Self {
        SiftError::DiffParse(msg.into())
    }

    /// Create a commit error.
    pub fn commit<S: Into<String>>(msg: S) -> Self {
        SiftError::Commit(msg.into())
    }

    /// Create a subprocess error, attaching captured stderr when non-empty.
    pub fn subprocess<S: Into<String>>(msg: S, stderr: Option<String>) -> Self {
        SiftError::Subprocess {
            message: msg.into(),
            stderr: stderr.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subprocess_error_includes_stderr() {
        let err = SiftError::subprocess("unexpected EOF", Some("fatal: bad object\n".into()));
        assert_eq!(
            err.to_string(),
            "subprocess error: unexpected EOF (stderr: fatal: bad object)"
        );

        let err = SiftError::subprocess("unexpected EOF", Some("   ".into()));
        assert_eq!(err.to_string(), "subprocess error: unexpected EOF");
    }

    #[test]
    fn test_unknown_node_message() {
        let err = SiftError::unknown_node("repoHasFile");
        assert_eq!(err.to_string(), "unknown query node type: repoHasFile");
    }
}
