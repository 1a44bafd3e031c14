//! The analysis session state machine.
//!
//! `AnalysisSession` owns the transient input (text and optional PDF), the
//! visible `UiStatus`, the last user-facing error and the record on display.
//! It drives `AnalysisClient` and records successes in the `HistoryStore`.
//!
//! ```text
//! Idle --analyze--> Reading --delay--> Analyzing --ok--> Complete --reset--> Idle
//!                                                 \--err--> Error --retry--> Reading
//! ```

use crate::attachment::Attachment;
use crate::client::AnalysisClient;
use crate::error::{SessionError, ValidationError};
use crate::history::HistoryStore;
use crate::request::validate_input;
use crate::store::KeyValueStore;
use crate::types::{AnalysisRecord, HistoryEntry, UiStatus};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Message shown when a non-PDF file is attached.
pub const ATTACHMENT_REJECTED_MESSAGE: &str = "Only PDF files are allowed.";

/// Receives session status changes (progress display, tests).
#[async_trait]
pub trait SessionObserver: Send + Sync {
    async fn on_status_change(&self, status: UiStatus);
}

/// Observer that ignores every notification.
pub struct NoOpObserver;

#[async_trait]
impl SessionObserver for NoOpObserver {
    async fn on_status_change(&self, _status: UiStatus) {}
}

/// An observer that records all status changes for test assertions.
pub struct RecordingObserver {
    status_changes: tokio::sync::Mutex<Vec<UiStatus>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self {
            status_changes: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub async fn status_changes(&self) -> Vec<UiStatus> {
        self.status_changes.lock().await.clone()
    }
}

impl Default for RecordingObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionObserver for RecordingObserver {
    async fn on_status_change(&self, status: UiStatus) {
        self.status_changes.lock().await.push(status);
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub record: AnalysisRecord,
    /// The history entry, or `None` when saving it failed.
    pub entry: Option<HistoryEntry>,
}

/// One user's analysis workflow.
pub struct AnalysisSession<S: KeyValueStore> {
    client: AnalysisClient,
    history: HistoryStore<S>,
    observer: Arc<dyn SessionObserver>,
    reading_delay: Duration,
    status: UiStatus,
    input_text: String,
    attachment: Option<Attachment>,
    error_message: Option<String>,
    current: Option<AnalysisRecord>,
}

impl<S: KeyValueStore> AnalysisSession<S> {
    /// Start a session in `Idle`. The reading delay comes from the client's
    /// analysis config.
    pub fn new(
        client: AnalysisClient,
        history: HistoryStore<S>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let reading_delay = Duration::from_millis(client.config().reading_delay_ms);
        Self {
            client,
            history,
            observer,
            reading_delay,
            status: UiStatus::Idle,
            input_text: String::new(),
            attachment: None,
            error_message: None,
            current: None,
        }
    }

    pub fn with_reading_delay(mut self, delay: Duration) -> Self {
        self.reading_delay = delay;
        self
    }

    pub fn status(&self) -> UiStatus {
        self.status
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn set_input_text(&mut self, text: impl Into<String>) {
        self.input_text = text.into();
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Last user-facing error, cleared when a new run starts.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// The record on display, if any.
    pub fn current_record(&self) -> Option<&AnalysisRecord> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &HistoryStore<S> {
        &self.history
    }

    /// Select a file. Anything but a PDF is refused and the previous
    /// attachment is kept.
    pub fn attach(&mut self, attachment: Attachment) -> Result<(), SessionError> {
        if !attachment.is_pdf() {
            warn!(
                file = attachment.file_name.as_str(),
                mime = attachment.mime_type.as_str(),
                "Rejected non-PDF attachment"
            );
            self.error_message = Some(ATTACHMENT_REJECTED_MESSAGE.to_string());
            return Err(ValidationError::UnsupportedAttachment {
                mime_type: attachment.mime_type,
            }
            .into());
        }
        self.attachment = Some(attachment);
        self.error_message = None;
        Ok(())
    }

    pub fn detach(&mut self) {
        self.attachment = None;
    }

    /// Run an analysis on the current input.
    ///
    /// Invalid input leaves the status untouched and sets the validation
    /// message. On success the record is saved to history and the input is
    /// cleared; on failure the input is kept for `retry`.
    pub async fn analyze(&mut self) -> Result<AnalysisOutcome, SessionError> {
        if self.status.is_busy() {
            return Err(SessionError::Busy);
        }
        if let Err(e) = validate_input(&self.input_text, self.attachment.as_ref()) {
            self.error_message = Some(e.to_string());
            return Err(e.into());
        }
        self.run().await
    }

    /// Re-run the failed analysis with the retained input.
    pub async fn retry(&mut self) -> Result<AnalysisOutcome, SessionError> {
        if self.status != UiStatus::Error {
            return Err(self.invalid_transition(UiStatus::Reading));
        }
        self.analyze().await
    }

    /// Leave `Complete` or `Error` and return to the input form.
    pub async fn reset(&mut self) -> Result<(), SessionError> {
        if self.status.is_busy() {
            return Err(SessionError::Busy);
        }
        self.current = None;
        self.error_message = None;
        self.set_status(UiStatus::Idle).await;
        Ok(())
    }

    /// Display a past analysis.
    pub async fn open_history(&mut self, id: &str) -> Result<&AnalysisRecord, SessionError> {
        if self.status.is_busy() {
            return Err(SessionError::Busy);
        }
        let record = self
            .history
            .get(id)
            .map(|entry| entry.schema.clone())
            .ok_or_else(|| SessionError::EntryNotFound { id: id.to_string() })?;
        self.error_message = None;
        self.set_status(UiStatus::Complete).await;
        Ok(&*self.current.insert(record))
    }

    /// Delete a past analysis. The record on display, if any, stays visible.
    pub fn delete_history(&mut self, id: &str) -> Result<(), SessionError> {
        if self.status.is_busy() {
            return Err(SessionError::Busy);
        }
        self.history.remove(id)?;
        Ok(())
    }

    async fn run(&mut self) -> Result<AnalysisOutcome, SessionError> {
        self.error_message = None;
        self.set_status(UiStatus::Reading).await;
        if !self.reading_delay.is_zero() {
            tokio::time::sleep(self.reading_delay).await;
        }
        self.set_status(UiStatus::Analyzing).await;

        match self
            .client
            .analyze(&self.input_text, self.attachment.as_ref())
            .await
        {
            Ok(record) => {
                let entry = match self.history.append(record.clone()) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        error!(error = %e, "Analysis succeeded but could not be saved to history");
                        None
                    }
                };
                self.input_text.clear();
                self.attachment = None;
                self.current = Some(record.clone());
                self.set_status(UiStatus::Complete).await;
                info!(title = record.title.as_str(), "Analysis complete");
                Ok(AnalysisOutcome { record, entry })
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Analysis failed");
                self.error_message = Some(e.user_message());
                self.set_status(UiStatus::Error).await;
                Err(e.into())
            }
        }
    }

    async fn set_status(&mut self, status: UiStatus) {
        if self.status != status {
            self.status = status;
            self.observer.on_status_change(status).await;
        }
    }

    fn invalid_transition(&self, to: UiStatus) -> SessionError {
        SessionError::InvalidStateTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}
