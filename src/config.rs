use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Bounds applied when rendering a diff preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffPreviewConfig {
    /// Maximum number of file diffs rendered.
    pub max_files: usize,
    /// Maximum number of (split) hunks rendered per file.
    pub max_hunks_per_file: usize,
    /// Maximum number of lines kept in a single rendered hunk.
    pub max_lines_per_hunk: usize,
    /// Lines of context kept around every matching line.
    pub match_context_lines: usize,
}

impl Default for DiffPreviewConfig {
    fn default() -> Self {
        DiffPreviewConfig {
            max_files: 5,
            max_hunks_per_file: 3,
            max_lines_per_hunk: 5,
            match_context_lines: 1,
        }
    }
}

/// Configuration for a commit search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Attach a rendered diff preview to every commit match.
    pub include_diff: bool,
    /// Stop after this many matching commits. `None` means unbounded.
    pub limit: Option<usize>,
    /// Bounds for the rendered diff preview.
    pub preview: DiffPreviewConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            include_diff: false,
            limit: None,
            preview: DiffPreviewConfig::default(),
        }
    }
}

impl SearchConfig {
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::default()
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[derive(Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn include_diff(mut self, include_diff: bool) -> Self {
        self.config.include_diff = include_diff;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = Some(limit);
        self
    }

    pub fn preview(mut self, preview: DiffPreviewConfig) -> Self {
        self.config.preview = preview;
        self
    }

    /// Override the number of context lines around matching diff lines.
    pub fn match_context_lines(mut self, lines: usize) -> Self {
        self.config.preview.match_context_lines = lines;
        self
    }

    /// Override the maximum number of lines kept per rendered hunk.
    pub fn max_lines_per_hunk(mut self, lines: usize) -> Self {
        self.config.preview.max_lines_per_hunk = lines;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}
