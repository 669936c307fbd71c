//! Select paths project a match onto a different result kind, e.g.
//! `select:repo` turns file and commit matches into repository matches.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiftError};

pub const CONTENT: &str = "content";
pub const REPOSITORY: &str = "repo";
pub const FILE: &str = "file";
pub const SYMBOL: &str = "symbol";
pub const COMMIT: &str = "commit";
pub const OWNER: &str = "owner";

const SYMBOL_KINDS: &[&str] = &[
    "file",
    "module",
    "namespace",
    "package",
    "class",
    "method",
    "property",
    "field",
    "constructor",
    "enum",
    "interface",
    "function",
    "variable",
    "constant",
    "string",
    "number",
    "boolean",
    "array",
    "object",
    "key",
    "null",
    "enum-member",
    "struct",
    "event",
    "operator",
    "type-parameter",
];

/// A validated, dot-separated select path such as `commit.diff.added`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SelectPath(Vec<String>);

impl SelectPath {
    /// Parse and validate a select path.
    pub fn parse(path: &str) -> Result<Self> {
        let parts: Vec<String> = path.split('.').map(|p| p.to_string()).collect();
        let fields: Vec<&str> = parts.iter().skip(1).map(String::as_str).collect();

        let valid = match parts[0].as_str() {
            CONTENT | REPOSITORY | OWNER => fields.is_empty(),
            FILE => matches!(fields.as_slice(), [] | ["directory"] | ["path"]),
            SYMBOL => match fields.as_slice() {
                [] => true,
                [kind] => SYMBOL_KINDS.contains(kind),
                _ => false,
            },
            COMMIT => matches!(
                fields.as_slice(),
                [] | ["diff"] | ["diff", "added"] | ["diff", "removed"]
            ),
            _ => false,
        };

        if !valid {
            return Err(SiftError::invalid_argument(format!(
                "invalid select path '{path}'"
            )));
        }
        Ok(SelectPath(parts))
    }

    /// The result kind selected, e.g. `commit` for `commit.diff.added`.
    pub fn root(&self) -> &str {
        &self.0[0]
    }

    /// The path components after the root.
    pub fn fields(&self) -> &[String] {
        &self.0[1..]
    }
}

impl FromStr for SelectPath {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self> {
        SelectPath::parse(s)
    }
}

impl TryFrom<String> for SelectPath {
    type Error = SiftError;

    fn try_from(value: String) -> Result<Self> {
        SelectPath::parse(&value)
    }
}

impl From<SelectPath> for String {
    fn from(path: SelectPath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for SelectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
