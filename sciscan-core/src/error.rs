//! Error types for the SciScan core.
//!
//! Uses `thiserror` for public API error types. The analysis taxonomy keeps
//! validation, transport, empty-response, format and schema failures apart so
//! callers can log and test them individually, even though the user-facing
//! copy for the non-validation kinds is a single retry prompt.

/// Message shown to the user for every failure past input validation.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Analysis failed. Check the link or the file and try again.";

/// Top-level error type for the SciScan core library.
#[derive(Debug, thiserror::Error)]
pub enum SciscanError {
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Input rejected before any request is built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Paste a link or some text, or attach a PDF.")]
    MissingInput,

    #[error("Only PDF files are allowed (got '{mime_type}').")]
    UnsupportedAttachment { mime_type: String },
}

/// Errors from the hosted model boundary.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("Model not supported: {model}")]
    UnsupportedModel { model: String },
}

/// A structurally valid response that breaks the record's invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaViolation {
    #[error("score.{field} must be within 1..=10, got {value}")]
    ScoreOutOfRange { field: &'static str, value: i64 },

    #[error("required field '{field}' is missing or empty")]
    MissingField { field: &'static str },
}

/// Errors produced by `AnalysisClient::analyze`.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Transport failure: {0}")]
    Transport(#[from] LlmError),

    #[error("The model returned an empty response")]
    EmptyResponse,

    #[error("The model response is not valid JSON: {message}")]
    Format { message: String, raw: String },

    #[error("The model response violates the schema: {0}")]
    Schema(#[from] SchemaViolation),
}

impl AnalysisError {
    /// Stable identifier of the failure kind, for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Validation(_) => "validation",
            AnalysisError::Transport(_) => "transport",
            AnalysisError::EmptyResponse => "empty_response",
            AnalysisError::Format { .. } => "format",
            AnalysisError::Schema(_) => "schema",
        }
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Validation(v) => v.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Errors from the history store.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Failed to persist history: {message}")]
    Persist { message: String },

    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from the analysis session state machine.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Analysis(AnalysisError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("An analysis is already in progress")]
    Busy,

    #[error("History entry not found: {id}")]
    EntryNotFound { id: String },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },
}

impl From<AnalysisError> for SessionError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Validation(v) => SessionError::Validation(v),
            other => SessionError::Analysis(other),
        }
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `SciscanError`.
pub type Result<T> = std::result::Result<T, SciscanError>;
