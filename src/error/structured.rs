//! Structured error output for AI coding agents.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::DocketError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
/// Format: `SCREAMING_SNAKE_CASE` for easy parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Workspace Errors (exit code 2) ===
    /// No `.docket` directory found
    NotInitialized,
    /// Unusable path argument
    InvalidPath,

    // === Merge/JSONL Errors (exit code 3) ===
    /// Conflict markers present
    ConflictMarkers,
    /// JSON serialization error
    JsonError,

    // === Git Errors (exit code 4) ===
    /// Git plumbing failed
    GitError,

    // === Config Errors (exit code 7) ===
    /// Configuration error
    ConfigError,
    /// Config parse error
    ConfigParseError,

    // === I/O Errors (exit code 8) ===
    /// File I/O error
    IoError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::InvalidPath => "INVALID_PATH",
            Self::ConflictMarkers => "CONFLICT_MARKERS",
            Self::JsonError => "JSON_ERROR",
            Self::GitError => "GIT_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::ConfigParseError => "CONFIG_PARSE_ERROR",
            Self::IoError => "IO_ERROR",
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// Git failures are retryable with `--no-git-stages`; conflict markers are
    /// retryable after running `docket resolve`.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::GitError | Self::ConflictMarkers)
    }

    /// Get the exit code for this error category.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::NotInitialized | Self::InvalidPath => 2,
            Self::ConflictMarkers | Self::JsonError => 3,
            Self::GitError => 4,
            Self::ConfigError | Self::ConfigParseError => 7,
            Self::IoError => 8,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `DocketError`.
    #[must_use]
    pub fn from_error(err: &DocketError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);

        Self {
            code,
            message: err.to_string(),
            hint: err.suggestion().map(str::to_string),
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &DocketError) -> (ErrorCode, Option<Value>) {
        match err {
            DocketError::NotInitialized => (ErrorCode::NotInitialized, None),
            DocketError::InvalidPath { path, reason } => (
                ErrorCode::InvalidPath,
                Some(json!({"path": path.display().to_string(), "reason": reason})),
            ),
            DocketError::ConflictMarkers { path, count } => (
                ErrorCode::ConflictMarkers,
                Some(json!({"path": path.display().to_string(), "marker_count": count})),
            ),
            DocketError::Git { command, .. } => (
                ErrorCode::GitError,
                Some(json!({"command": format!("git {command}")})),
            ),
            DocketError::Config(_) => (ErrorCode::ConfigError, None),
            DocketError::Yaml(_) => (ErrorCode::ConfigParseError, None),
            DocketError::FileIo { path, source } => (
                ErrorCode::IoError,
                Some(json!({
                    "path": path.display().to_string(),
                    "kind": format!("{:?}", source.kind()),
                })),
            ),
            DocketError::Io(_) => (ErrorCode::IoError, None),
            DocketError::Json(_) => (ErrorCode::JsonError, None),
        }
    }
}
