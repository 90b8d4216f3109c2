//! Memory record model used by the store and its backends.

use crate::error::MemoryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Free-form record metadata. Values are expected to be scalars
/// (string, number, bool).
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Memory tier a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Conversation turns.
    Episodic,
    /// Facts and synthesized knowledge.
    Semantic,
    /// Tool usage and operational patterns.
    Procedural,
}

impl MemoryKind {
    pub const ALL: [MemoryKind; 3] = [Self::Episodic, Self::Semantic, Self::Procedural];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryKind {
    type Err = MemoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "episodic" => Ok(Self::Episodic),
            "semantic" => Ok(Self::Semantic),
            "procedural" => Ok(Self::Procedural),
            other => Err(MemoryError::Validation(format!(
                "unknown memory kind `{other}`"
            ))),
        }
    }
}

/// Importance rating in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Importance(u8);

impl Importance {
    pub const MIN: Importance = Importance(1);
    pub const MAX: Importance = Importance(5);

    pub fn new(value: u8) -> Result<Self, MemoryError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(MemoryError::Validation(format!(
                "importance must be between 1 and 5, got {value}"
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Importance {
    type Error = MemoryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Importance> for u8 {
    fn from(value: Importance) -> Self {
        value.0
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted memory record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Record identifier, never reused.
    pub id: Uuid,
    pub kind: MemoryKind,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub importance: Importance,
    pub created_at: DateTime<Utc>,
    /// Refreshed whenever a retrieval returns the record.
    pub last_accessed_at: DateTime<Utc>,
    /// Set by explicit content or metadata updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Number of retrievals that returned the record.
    #[serde(default)]
    pub access_count: u64,
    /// Embedding of `content`, recomputed only when content changes.
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl MemoryRecord {
    /// Look up a string metadata value.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(serde_json::Value::as_str)
    }

    /// Record a retrieval at `now`.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed_at = now.max(self.created_at);
        self.access_count = self.access_count.saturating_add(1);
    }
}

/// A recalled record with its relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMemory {
    pub record: MemoryRecord,
    pub score: f32,
}

impl ScoredMemory {
    pub fn content(&self) -> &str {
        &self.record.content
    }
}
