//! Generic clinical content collection manager.
//!
//! One implementation serves every titled, dated, rich-content collection —
//! clinical notes and treatment plans — scoped to an
//! (owner, subject, kind) triple. It owns three pieces of client state:
//!
//! - a per-key list cache, invalidated after every successful mutation so
//!   the next read refetches;
//! - per-record presentation state (collapsed / expanded / editing), never
//!   persisted;
//! - an optional open composer for a new record.
//!
//! Blank-title validation happens here, before any gateway request, with the
//! message taken from the collection's [`CollectionConfig`]. Destructive
//! deletes require an explicit confirmation token.

use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Identity;
use crate::config::CollectionConfig;
use crate::gateway::{self, Filter, Gateway, GatewayError, OrderBy, Row};
use crate::models::content::{ContentDraft, ContentRecord};
use crate::models::enums::CollectionKind;

// ─── Keys and state ───────────────────────────────────────────────────────────

/// Cache key: one list per (owner, subject, kind) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    pub owner_id: Uuid,
    pub subject_id: Uuid,
    pub kind: CollectionKind,
}

/// Presentation state of one rendered record. Exactly one state is active
/// per record at a time, independent of other records.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordView {
    /// Truncated content with a "see more" affordance.
    Collapsed,
    /// Full content with edit and delete affordances.
    Expanded,
    /// Inline form pre-populated from the record.
    Editing(ContentDraft),
}

/// Confirmation token for destructive actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    Confirmed,
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The interstitial was dismissed; no request was sent.
    NotConfirmed,
}

#[derive(Error, Debug)]
pub enum CollectionError {
    /// Caught before any request is sent; `message` comes from the
    /// collection's configuration.
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

// ─── Manager ──────────────────────────────────────────────────────────────────

pub struct CollectionManager<'g, G: Gateway> {
    gateway: &'g G,
    configs: HashMap<CollectionKind, CollectionConfig>,
    cache: HashMap<CollectionKey, Vec<ContentRecord>>,
    views: HashMap<Uuid, RecordView>,
    composer: Option<ContentDraft>,
}

impl<'g, G: Gateway> CollectionManager<'g, G> {
    pub fn new(gateway: &'g G) -> Self {
        let mut configs = HashMap::new();
        for kind in [CollectionKind::Notes, CollectionKind::TreatmentPlans] {
            configs.insert(kind, CollectionConfig::for_kind(kind));
        }
        Self {
            gateway,
            configs,
            cache: HashMap::new(),
            views: HashMap::new(),
            composer: None,
        }
    }

    /// Replaces the configuration (labels, prompts, validation message)
    /// for one collection kind.
    pub fn set_config(&mut self, config: CollectionConfig) {
        self.configs.insert(config.kind, config);
    }

    pub fn config(&self, kind: CollectionKind) -> &CollectionConfig {
        // Populated for every kind in `new`.
        &self.configs[&kind]
    }

    // ── Listing ──────────────────────────────────────────

    /// Lists the collection, newest record date first.
    ///
    /// Serves the cached snapshot when one exists. Fails softly on gateway
    /// errors: logs and returns an empty list without caching it, so the
    /// next call retries the fetch.
    pub fn list(
        &mut self,
        identity: &Identity,
        subject_id: Uuid,
        kind: CollectionKind,
    ) -> Vec<ContentRecord> {
        let key = self.key(identity, subject_id, kind);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let filter = Filter::new()
            .eq("owner_id", identity.id.to_string())
            .eq("subject_id", subject_id.to_string());
        let rows = match self
            .gateway
            .select(kind.table(), &filter, Some(&OrderBy::desc("record_date")))
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Failed to list {}: {e}", kind.as_str());
                return Vec::new();
            }
        };

        let records: Vec<ContentRecord> = rows
            .into_iter()
            .filter_map(|row| match gateway::from_row(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping undecodable {} row: {e}", kind.as_str());
                    None
                }
            })
            .collect();

        self.cache.insert(key, records.clone());
        records
    }

    /// Whether a cached snapshot exists for the triple.
    pub fn is_cached(&self, identity: &Identity, subject_id: Uuid, kind: CollectionKind) -> bool {
        self.cache.contains_key(&self.key(identity, subject_id, kind))
    }

    // ── Mutations ────────────────────────────────────────

    /// Creates a record from the draft. Rejects blank titles locally, before
    /// any request. On success the key's cache is invalidated and the
    /// composer closes; on failure the composer keeps the user's input.
    pub fn create(
        &mut self,
        identity: &Identity,
        subject_id: Uuid,
        kind: CollectionKind,
        draft: &ContentDraft,
    ) -> Result<ContentRecord, CollectionError> {
        self.validate_title(kind, draft)?;

        let now = Local::now().naive_local();
        let record = ContentRecord {
            id: Uuid::new_v4(),
            owner_id: identity.id,
            subject_id,
            title: draft.title.trim().to_string(),
            content: draft.content.clone(),
            record_date: draft.record_date,
            created_at: now,
            updated_at: now,
        };

        self.gateway.insert(kind.table(), gateway::to_row(&record)?)?;

        self.invalidate(self.key(identity, subject_id, kind));
        self.composer = None;
        Ok(record)
    }

    /// Replaces the record's mutable fields from the draft and bumps
    /// `updated_at`. The update predicate carries both the record id and the
    /// owner id in the same request. On success the cache is invalidated and
    /// the record leaves edit mode.
    pub fn update(
        &mut self,
        identity: &Identity,
        subject_id: Uuid,
        kind: CollectionKind,
        record_id: Uuid,
        draft: &ContentDraft,
    ) -> Result<ContentRecord, CollectionError> {
        self.validate_title(kind, draft)?;

        let mut patch = Row::new();
        patch.insert("title".into(), Value::String(draft.title.trim().to_string()));
        patch.insert("content".into(), Value::String(draft.content.clone()));
        patch.insert("record_date".into(), json_value(&draft.record_date));
        patch.insert("updated_at".into(), json_value(&Local::now().naive_local()));

        let filter = Filter::new()
            .eq("id", record_id.to_string())
            .eq("owner_id", identity.id.to_string());
        let rows = self.gateway.update(kind.table(), patch, &filter)?;
        let record: ContentRecord = gateway::single(kind.table(), rows)?;

        self.invalidate(self.key(identity, subject_id, kind));
        self.views.insert(record_id, RecordView::Expanded);
        Ok(record)
    }

    /// Deletes a record permanently. Without confirmation nothing is sent
    /// and the record stays in place. On gateway failure the cache is left
    /// untouched, so the record remains visible.
    pub fn delete(
        &mut self,
        identity: &Identity,
        subject_id: Uuid,
        kind: CollectionKind,
        record_id: Uuid,
        confirm: Confirm,
    ) -> Result<DeleteOutcome, CollectionError> {
        if confirm == Confirm::Dismissed {
            return Ok(DeleteOutcome::NotConfirmed);
        }

        let filter = Filter::new()
            .eq("id", record_id.to_string())
            .eq("owner_id", identity.id.to_string());
        self.gateway.delete(kind.table(), &filter)?;

        self.invalidate(self.key(identity, subject_id, kind));
        self.views.remove(&record_id);
        Ok(DeleteOutcome::Deleted)
    }

    // ── Per-record view state ────────────────────────────

    /// Current presentation state of a record; Collapsed until toggled.
    pub fn view(&self, record_id: Uuid) -> RecordView {
        self.views.get(&record_id).cloned().unwrap_or(RecordView::Collapsed)
    }

    /// Flips Collapsed <-> Expanded. A record in edit mode stays there.
    pub fn toggle(&mut self, record_id: Uuid) {
        let next = match self.view(record_id) {
            RecordView::Collapsed => RecordView::Expanded,
            RecordView::Expanded => RecordView::Collapsed,
            editing @ RecordView::Editing(_) => editing,
        };
        self.views.insert(record_id, next);
    }

    /// Replaces the expanded view with an inline form pre-populated from
    /// the record.
    pub fn begin_edit(&mut self, record: &ContentRecord) {
        self.views.insert(record.id, RecordView::Editing(ContentDraft::from(record)));
    }

    /// Discards in-progress edits and restores the expanded read-only view.
    /// No request is sent.
    pub fn cancel_edit(&mut self, record_id: Uuid) {
        if matches!(self.views.get(&record_id), Some(RecordView::Editing(_))) {
            self.views.insert(record_id, RecordView::Expanded);
        }
    }

    /// In-progress edit draft for a record, if it is in edit mode.
    pub fn edit_draft_mut(&mut self, record_id: Uuid) -> Option<&mut ContentDraft> {
        match self.views.get_mut(&record_id) {
            Some(RecordView::Editing(draft)) => Some(draft),
            _ => None,
        }
    }

    // ── Composer ─────────────────────────────────────────

    /// Opens the inline composer with an empty draft dated `default_date`.
    pub fn open_composer(&mut self, default_date: NaiveDate) {
        self.composer = Some(ContentDraft::empty(default_date));
    }

    pub fn composer(&self) -> Option<&ContentDraft> {
        self.composer.as_ref()
    }

    pub fn composer_mut(&mut self) -> Option<&mut ContentDraft> {
        self.composer.as_mut()
    }

    pub fn close_composer(&mut self) {
        self.composer = None;
    }

    // ── Internals ────────────────────────────────────────

    fn key(&self, identity: &Identity, subject_id: Uuid, kind: CollectionKind) -> CollectionKey {
        CollectionKey {
            owner_id: identity.id,
            subject_id,
            kind,
        }
    }

    fn invalidate(&mut self, key: CollectionKey) {
        self.cache.remove(&key);
    }

    fn validate_title(
        &self,
        kind: CollectionKind,
        draft: &ContentDraft,
    ) -> Result<(), CollectionError> {
        if draft.has_title() {
            return Ok(());
        }
        Err(CollectionError::Validation {
            field: "title",
            message: self.config(kind).missing_title_message.clone(),
        })
    }
}

fn json_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
