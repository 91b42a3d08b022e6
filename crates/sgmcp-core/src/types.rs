use crate::constants;
use serde::{Deserialize, Serialize};

/// One matching line within a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// 1-based line number.
    pub line_number: u32,
    pub text: String,
}

impl Match {
    pub fn new(line_number: u32, text: impl Into<String>) -> Self {
        Self {
            line_number,
            text: text.into(),
        }
    }
}

/// A file with at least one match, shaped for agent consumption.
///
/// `matches` keeps the order the upstream reported and is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedResult {
    pub filename: String,
    pub repository: String,
    pub matches: Vec<Match>,
    pub url: String,
}

/// Arguments for a content fetch. `path` empty means the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub repository: String,
    pub path: String,
    pub depth: usize,
    pub r#ref: String,
}

impl ContentRequest {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            path: String::new(),
            depth: constants::DEFAULT_TREE_DEPTH,
            r#ref: constants::DEFAULT_REF.to_string(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_ref(mut self, r#ref: impl Into<String>) -> Self {
        self.r#ref = r#ref.into();
        self
    }
}
