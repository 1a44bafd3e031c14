//! # SciScan Core
//!
//! Core library for SciScan, the scientific article analyzer.
//! Provides request construction, the hosted model boundary, response
//! sanitizing and validation, the local history cache, the analysis session
//! state machine, configuration, and fundamental types.

pub mod attachment;
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod report;
pub mod request;
pub mod sanitize;
pub mod service;
pub mod session;
pub mod store;
pub mod types;

// Re-export commonly used types at the crate root.
pub use attachment::{Attachment, PDF_MIME_TYPE};
pub use client::AnalysisClient;
pub use config::{AnalysisConfig, HistoryConfig, LlmConfig, SciscanConfig};
pub use error::{
    AnalysisError, HistoryError, LlmError, Result, SchemaViolation, SciscanError, SessionError,
    ValidationError,
};
pub use history::HistoryStore;
pub use report::{QualityTier, SummaryRegister};
pub use request::{AnalysisRequest, RequestPart, build_request};
pub use sanitize::extract_json_payload;
pub use service::{AnalysisService, GeminiService, MockAnalysisService, ServiceResponse};
pub use session::{AnalysisOutcome, AnalysisSession, NoOpObserver, RecordingObserver, SessionObserver};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::{AnalysisRecord, HistoryEntry, Methodology, Score, UiStatus};
