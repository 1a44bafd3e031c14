//! Locally cached analysis history.
//!
//! The whole list lives under a single key as a JSON array, most recent
//! first. Every mutation rewrites the full list in one `set`; the in-memory
//! copy only changes once that write has succeeded.

use crate::config::HistoryConfig;
use crate::error::HistoryError;
use crate::store::KeyValueStore;
use crate::types::{AnalysisRecord, HistoryEntry};
use chrono::{Local, Utc};
use std::fmt::Write as _;
use tracing::{debug, error, info};

const FALLBACK_DATE_FORMAT: &str = "%d/%m/%Y";

/// Ordered, persisted list of past analyses.
pub struct HistoryStore<S: KeyValueStore> {
    store: S,
    key: String,
    date_format: String,
    max_entries: Option<usize>,
    entries: Vec<HistoryEntry>,
    last_id: i64,
}

impl<S: KeyValueStore> HistoryStore<S> {
    /// Open the history under `key` and load whatever is already stored.
    ///
    /// A `max_entries` of `Some(0)` is treated as unbounded.
    pub fn open(
        store: S,
        key: impl Into<String>,
        date_format: impl Into<String>,
        max_entries: Option<usize>,
    ) -> Self {
        let mut history = Self {
            store,
            key: key.into(),
            date_format: date_format.into(),
            max_entries: max_entries.filter(|&max| max > 0),
            entries: Vec::new(),
            last_id: 0,
        };
        history.load();
        history
    }

    pub fn from_config(store: S, config: &HistoryConfig) -> Self {
        Self::open(
            store,
            config.key.clone(),
            config.date_format.clone(),
            config.max_entries,
        )
    }

    /// Re-read the stored list.
    ///
    /// A missing key yields an empty history. Unreadable or corrupt content is
    /// logged and also treated as empty; this never fails.
    pub fn load(&mut self) -> Vec<HistoryEntry> {
        let entries = match self.store.get(&self.key) {
            Ok(None) => Vec::new(),
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    error!(key = self.key.as_str(), error = %e, "Stored history is corrupt, starting empty");
                    Vec::new()
                }
            },
            Err(e) => {
                error!(key = self.key.as_str(), error = %e, "Failed to read history, starting empty");
                Vec::new()
            }
        };

        self.last_id = entries
            .iter()
            .filter_map(|e| e.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0)
            .max(self.last_id);
        self.entries = entries;
        debug!(count = self.entries.len(), "History loaded");
        self.entries.clone()
    }

    /// Record a successful analysis as the newest entry and persist the list.
    pub fn append(&mut self, record: AnalysisRecord) -> Result<HistoryEntry, HistoryError> {
        let id = self.next_id();
        let entry = HistoryEntry {
            id: id.to_string(),
            date: self.today(),
            schema: record,
        };

        let mut updated = Vec::with_capacity(self.entries.len() + 1);
        updated.push(entry.clone());
        updated.extend(self.entries.iter().cloned());
        if let Some(max) = self.max_entries {
            updated.truncate(max);
        }

        self.persist(&updated)?;
        self.last_id = id;
        self.entries = updated;
        info!(id = entry.id.as_str(), title = entry.schema.title.as_str(), "Saved analysis to history");
        Ok(entry)
    }

    /// Delete the entry with `id`. Unknown ids leave the history untouched.
    pub fn remove(&mut self, id: &str) -> Result<(), HistoryError> {
        if !self.entries.iter().any(|e| e.id == id) {
            debug!(id, "History entry not found, nothing to remove");
            return Ok(());
        }
        let updated: Vec<HistoryEntry> = self
            .entries
            .iter()
            .filter(|e| e.id != id)
            .cloned()
            .collect();
        self.persist(&updated)?;
        self.entries = updated;
        info!(id, "Removed history entry");
        Ok(())
    }

    /// All entries, most recent first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        let json = serde_json::to_string(entries)?;
        self.store
            .set(&self.key, &json)
            .map_err(|e| HistoryError::Persist {
                message: e.to_string(),
            })
    }

    /// Unix milliseconds, bumped past the last issued id.
    fn next_id(&self) -> i64 {
        Utc::now().timestamp_millis().max(self.last_id + 1)
    }

    fn today(&self) -> String {
        let now = Local::now();
        let mut date = String::new();
        if write!(date, "{}", now.format(&self.date_format)).is_err() {
            date = now.format(FALLBACK_DATE_FORMAT).to_string();
        }
        date
    }
}
