//! Error types for sidecar-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sidecar operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Rule validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Tree sidecar {path} resolves outside {root}")]
    UnsafeTreeEscape { path: PathBuf, root: PathBuf },

    #[error("Failed to {action} {from} -> {to}: {cause}")]
    Transfer {
        action: &'static str,
        from: PathBuf,
        to: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("No free destination name for {path}")]
    NoFreeName { path: PathBuf },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the validation error if this is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

/// Rule-shape and rule-set violations.
///
/// These are always reported before any filesystem mutation and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("rule {rule:?}: {field} is required")]
    MissingField { rule: String, field: &'static str },

    #[error("rule {rule:?}: {field} must be empty for this rule kind")]
    ForbiddenField { rule: String, field: &'static str },

    #[error("rule {rule:?}: filemask must include '{{base}}'")]
    MissingPlaceholder { rule: String },

    #[error("rule {rule:?}: {reason}")]
    InvalidPattern { rule: String, reason: String },

    #[error("duplicate resolved filemask {pattern:?} (rules: {})", .rules.join(", "))]
    DuplicateMask { pattern: String, rules: Vec<String> },

    #[error("{path} is matched by more than one rule (rules: {})", .rules.join(", "))]
    OverlappingMatch { path: PathBuf, rules: Vec<String> },

    #[error("at least one rule is required")]
    EmptyRuleSet,
}

/// Result type alias for sidecar operations
pub type Result<T> = std::result::Result<T, Error>;
