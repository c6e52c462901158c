//! Core data types for `docket`.
//!
//! This module defines the record types that live one-per-line in the
//! project's JSONL files:
//! - `Entity` - An issue, spec, or similar record
//! - `Timestamp` - A timestamp that round-trips its original text
//! - `Status` / `Priority` - Common scalar fields
//! - `Relationship` - Typed edge between two records
//! - `Feedback` - Comment attached to a record
//!
//! Every object type keeps fields it does not interpret in a flattened
//! `serde_json::Map`, so unknown data survives a merge unchanged.

use crate::util::time::parse_record_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// Open map of fields the merge engine does not interpret.
pub type Extra = Map<String, Value>;

/// Record lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Open,
    InProgress,
    Blocked,
    NeedsReview,
    Closed,
    #[serde(untagged)]
    Custom(String),
}

impl Status {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::NeedsReview => "needs_review",
            Self::Closed => "closed",
            Self::Custom(value) => value,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record priority (0=Critical, 4=Backlog).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A timestamp that keeps the exact text it was read from.
///
/// Files are written back with the original text so that an untouched record
/// is byte-identical after a merge. Comparison uses the parsed instant.
#[derive(Debug, Clone)]
pub struct Timestamp {
    raw: String,
    parsed: Option<DateTime<Utc>>,
}

impl Timestamp {
    /// Wrap a raw timestamp string, parsing it once.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = parse_record_timestamp(&raw);
        Self { raw, parsed }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed instant, if the text was a recognised timestamp.
    #[must_use]
    pub const fn instant(&self) -> Option<DateTime<Utc>> {
        self.parsed
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Timestamp {}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

/// Order two optional timestamps by instant.
///
/// Absent or unparseable timestamps sort before parseable ones; two
/// unparseable values fall back to comparing their text. Parseable values
/// naming the same instant compare `Equal` even when spelled differently.
#[must_use]
pub fn compare_timestamps(a: Option<&Timestamp>, b: Option<&Timestamp>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a.parsed, b.parsed) {
            (Some(x), Some(y)) => x.cmp(&y),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => a.raw.cmp(&b.raw),
        },
    }
}

/// Typed edge between two records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    /// Source record id.
    #[serde(default)]
    pub from: String,

    /// Source record kind (e.g. "issue", "spec").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from_type: String,

    /// Target record id.
    #[serde(default)]
    pub to: String,

    /// Target record kind.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to_type: String,

    /// Relationship type (e.g. "blocks", "implements").
    #[serde(rename = "type", default)]
    pub rel_type: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Composite identity of a relationship for set semantics.
pub type RelationshipKey = (String, String, String, String, String);

impl Relationship {
    /// Identity used to deduplicate relationships: from, from_type, to,
    /// to_type and type.
    #[must_use]
    pub fn key(&self) -> RelationshipKey {
        (
            self.from.clone(),
            self.from_type.clone(),
            self.to.clone(),
            self.to_type.clone(),
            self.rel_type.clone(),
        )
    }
}

/// A feedback comment attached to a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feedback {
    /// Stable feedback id; the deduplication key.
    pub id: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A single record (issue, spec, ...) stored as one JSONL line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    /// Human-facing id (e.g. "ISSUE-001"). Branch-local; may collide.
    #[serde(default)]
    pub id: String,

    /// Globally unique identity; the merge key.
    #[serde(default)]
    pub uuid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    /// Long-form body, merged line by line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Long-form description, merged line by line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    /// Creation time; orders the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,

    /// Last mutation time; breaks field conflicts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,

    // Open sets. `None` means the key was absent in the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<Relationship>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Vec<Feedback>>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Entity {
    /// Create a minimal entity with the given id and uuid.
    #[must_use]
    pub fn new(id: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uuid: uuid.into(),
            title: None,
            status: None,
            content: None,
            description: None,
            priority: None,
            created_at: None,
            updated_at: None,
            relationships: None,
            tags: None,
            feedback: None,
            extra: Extra::new(),
        }
    }

    /// The key that identifies this record across merge inputs.
    ///
    /// This is the `uuid`. Records without one fall back to `id:<id>` so
    /// legacy lines are still matched instead of dropped.
    #[must_use]
    pub fn identity_key(&self) -> String {
        if self.uuid.trim().is_empty() {
            format!("id:{}", self.id)
        } else {
            self.uuid.clone()
        }
    }

    /// Read a long-form text field by name.
    ///
    /// `content`, `description` and `title` are typed fields; any other name
    /// is looked up in the open map and only returned when it holds a string.
    #[must_use]
    pub fn text_field(&self, name: &str) -> Option<&str> {
        match name {
            "content" => self.content.as_deref(),
            "description" => self.description.as_deref(),
            "title" => self.title.as_deref(),
            other => self.extra.get(other).and_then(Value::as_str),
        }
    }

    /// Overwrite a long-form text field by name. `None` removes it.
    pub fn set_text_field(&mut self, name: &str, value: Option<String>) {
        match name {
            "content" => self.content = value,
            "description" => self.description = value,
            "title" => self.title = value,
            other => match value {
                Some(text) => {
                    self.extra.insert(other.to_string(), Value::String(text));
                }
                None => {
                    self.extra.remove(other);
                }
            },
        }
    }

    /// Tags as a slice (empty when absent).
    #[must_use]
    pub fn tag_list(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }

    /// Relationships as a slice (empty when absent).
    #[must_use]
    pub fn relationship_list(&self) -> &[Relationship] {
        self.relationships.as_deref().unwrap_or_default()
    }

    /// Feedback as a slice (empty when absent).
    #[must_use]
    pub fn feedback_list(&self) -> &[Feedback] {
        self.feedback.as_deref().unwrap_or_default()
    }
}
