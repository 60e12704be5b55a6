use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// How a dictation session routes finalized utterances.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictationMode {
    /// Persist every finalized utterance as a new note and keep listening (default).
    #[default]
    AutoCommit,
    /// Stage the finalized utterance for manual submission; single-shot.
    Preview,
}

/// Language-model hint passed to the speech recognizer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageModel {
    /// General free-form speech (default).
    #[default]
    FreeForm,
    /// Short search-query style phrases.
    WebSearch,
}

// =============================================================================
// Newtype Wrappers
// =============================================================================

/// Unique identifier for a persisted note, assigned by the store on insert.
///
/// Once assigned an id never changes and is never reused, even after the
/// note is deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteId(pub i64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds since epoch.
///
/// Compared by value. Two timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimestampMs(pub i64);

impl TimestampMs {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or_default()
    }
}

// =============================================================================
// Entity Structs
// =============================================================================

/// A persisted note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub timestamp: TimestampMs,
}

/// A note that has not been persisted yet.
///
/// Carries no id; the store assigns one on insert. A `None` timestamp means
/// "stamp with the current time when the row is written".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub timestamp: Option<TimestampMs>,
}

impl NoteDraft {
    pub fn new(title: String, content: String) -> Self {
        Self {
            title,
            content,
            timestamp: None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
