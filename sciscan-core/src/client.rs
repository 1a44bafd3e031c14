//! Analysis client: build, invoke, sanitize, parse and validate.

use crate::attachment::Attachment;
use crate::config::{AnalysisConfig, LlmConfig};
use crate::error::AnalysisError;
use crate::request::build_request;
use crate::sanitize::extract_json_payload;
use crate::service::AnalysisService;
use crate::types::AnalysisRecord;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns user input into a validated `AnalysisRecord` through an `AnalysisService`.
pub struct AnalysisClient {
    service: Arc<dyn AnalysisService>,
    analysis: AnalysisConfig,
    model: String,
    temperature: f32,
}

impl AnalysisClient {
    pub fn new(service: Arc<dyn AnalysisService>, llm: &LlmConfig, analysis: AnalysisConfig) -> Self {
        Self {
            service,
            analysis,
            model: llm.model.clone(),
            temperature: llm.temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.analysis
    }

    /// Analyze `text` and/or a PDF attachment.
    ///
    /// Input problems are reported as `AnalysisError::Validation` before the
    /// service is contacted. Transport failures pass through unchanged.
    pub async fn analyze(
        &self,
        text: &str,
        attachment: Option<&Attachment>,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let request = build_request(
            text,
            attachment,
            &self.analysis,
            &self.model,
            self.temperature,
        )?;

        info!(
            model = self.model.as_str(),
            service = self.service.model_name(),
            search = request.enable_search,
            attachment = attachment.map(|a| a.file_name.as_str()),
            "Starting analysis"
        );

        let response = self.service.generate(&request).await?;
        let raw = response.text;
        if raw.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }

        let payload = extract_json_payload(&raw);
        let record: AnalysisRecord = match serde_json::from_str(payload) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, raw = raw.as_str(), "Model response is not a valid analysis");
                return Err(AnalysisError::Format {
                    message: e.to_string(),
                    raw,
                });
            }
        };

        if self.analysis.validate_schema {
            record.validate()?;
        }

        debug!(
            title = record.title.as_str(),
            total = record.score.total,
            "Analysis parsed"
        );
        Ok(record)
    }
}
