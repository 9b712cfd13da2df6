//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Normalization did not converge after {0} iterations")]
    NormalizeDidNotConverge(usize),

    #[error("Editor is read-only")]
    ReadOnly,
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to parse JSON. Please check the format.")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid document at {path:?}: {reason}")]
    Invalid { path: Vec<usize>, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid trigger character {0:?}")]
    Trigger(char),

    #[error("Slash and mention triggers must differ, both are {0:?}")]
    DuplicateTrigger(char),
}
