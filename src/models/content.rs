use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A titled, dated, rich-content clinical record — a clinical note or a
/// treatment plan, depending on which collection it lives in.
///
/// `content` is sanitized markup produced by the editing surface; it is
/// persisted exactly as received and may be empty. `owner_id` and
/// `subject_id` are immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub subject_id: Uuid,
    pub title: String,
    pub content: String,
    pub record_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Composer/edit input for a content record. The title must be non-blank
/// before any create or update request is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentDraft {
    pub title: String,
    pub content: String,
    pub record_date: NaiveDate,
}

impl ContentDraft {
    pub fn empty(record_date: NaiveDate) -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            record_date,
        }
    }

    /// Whether the draft passes the client-side title check.
    /// Whitespace-only titles count as blank.
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

impl From<&ContentRecord> for ContentDraft {
    fn from(record: &ContentRecord) -> Self {
        Self {
            title: record.title.clone(),
            content: record.content.clone(),
            record_date: record.record_date,
        }
    }
}
