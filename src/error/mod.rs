//! Error types and handling for `docket`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Provides recovery hints for user-facing errors
//! - Provides structured JSON output for AI coding agents
//!
//! Per-line JSONL parse failures never surface here: the codec logs and skips
//! them. Only whole-invocation failures (unreadable input, unwritable output,
//! git plumbing) become a `DocketError`.

mod context;
mod structured;

pub use context::ResultExt;
pub use structured::{ErrorCode, StructuredError};

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `docket` operations.
#[derive(Error, Debug)]
pub enum DocketError {
    // === Workspace Errors ===
    /// No `.docket` data directory could be found.
    #[error("Docket data directory not found: run from a project containing .docket/")]
    NotInitialized,

    /// A path argument is unusable (directory, missing parent, ...).
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    // === JSONL Errors ===
    /// A file still contains merge conflict markers where none are allowed.
    #[error("Merge conflict markers detected in {path} ({count} markers)")]
    ConflictMarkers { path: PathBuf, count: usize },

    // === Git Errors ===
    /// A git plumbing command failed.
    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    // === Configuration Errors ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// I/O error tied to a specific file.
    #[error("I/O error on '{path}': {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DocketError {
    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Create a .docket/ directory or set DOCKET_DIR"),
            Self::ConflictMarkers { .. } => Some("Run: docket resolve"),
            Self::Git { .. } => Some("Re-run with --no-git-stages to use the conflict markers"),
            Self::FileIo { .. } => Some("Check that the file exists and is writable"),
            _ => None,
        }
    }

    /// The file path this error concerns, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::InvalidPath { path, .. }
            | Self::ConflictMarkers { path, .. }
            | Self::FileIo { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }

    /// Wrap an I/O error with the path it happened on.
    #[must_use]
    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }
}

/// Result type using `DocketError`.
pub type Result<T> = std::result::Result<T, DocketError>;
