//! `docket`: three-way merge for JSONL record files.
//!
//! Projects keep issues, specs and similar records one per line in
//! `.docket/*.jsonl`, versioned in git and edited concurrently on many
//! branches. This crate reconciles divergent copies of such a file without
//! human input:
//!
//! - [`merge::merge_three_way`] is the pure merge over three entity lists
//! - [`resolve::resolve_conflicts`] cleans up a file git left with conflict
//!   markers
//! - [`resolve::run_merge_driver`] implements the git merge driver contract

pub mod cli;
pub mod config;
pub mod error;
pub mod jsonl;
pub mod logging;
pub mod merge;
pub mod model;
pub mod output;
pub mod resolve;
pub mod util;

pub use error::{DocketError, ErrorCode, Result, StructuredError};
pub use merge::{Conflict, ConflictAction, MergeOptions, MergeResult, MergeStats, merge_three_way};
pub use model::Entity;
