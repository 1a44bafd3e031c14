//! Outbound analysis request construction.
//!
//! Turns user input into the model-agnostic `AnalysisRequest` consumed by an
//! `AnalysisService`. All input validation happens here, before anything
//! touches the network.

use crate::attachment::Attachment;
use crate::config::AnalysisConfig;
use crate::error::ValidationError;
use serde::Serialize;

/// One ordered content part of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPart {
    /// Base64-encoded binary document.
    InlineData { mime_type: String, data: String },
    Text { text: String },
}

/// Everything the hosted model needs for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub model: String,
    pub parts: Vec<RequestPart>,
    pub system_instruction: String,
    /// Let the service browse the web to resolve links and DOIs.
    pub enable_search: bool,
    pub temperature: f32,
}

impl AnalysisRequest {
    /// The instruction text part, if any.
    pub fn prompt_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            RequestPart::Text { text } => Some(text.as_str()),
            RequestPart::InlineData { .. } => None,
        })
    }

    pub fn has_inline_data(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, RequestPart::InlineData { .. }))
    }
}

/// Reject input that cannot produce a request.
pub fn validate_input(text: &str, attachment: Option<&Attachment>) -> Result<(), ValidationError> {
    if let Some(file) = attachment
        && !file.is_pdf()
    {
        return Err(ValidationError::UnsupportedAttachment {
            mime_type: file.mime_type.clone(),
        });
    }
    if text.trim().is_empty() && attachment.is_none() {
        return Err(ValidationError::MissingInput);
    }
    Ok(())
}

/// Build the request for `text` and an optional PDF.
///
/// With an attachment the PDF is sent inline as the primary source and web
/// search stays off; without one, search is enabled so links resolve to real
/// content.
pub fn build_request(
    text: &str,
    attachment: Option<&Attachment>,
    config: &AnalysisConfig,
    model: &str,
    temperature: f32,
) -> Result<AnalysisRequest, ValidationError> {
    validate_input(text, attachment)?;

    let mut parts = Vec::with_capacity(2);
    if let Some(file) = attachment {
        parts.push(RequestPart::InlineData {
            mime_type: file.mime_type.clone(),
            data: file.to_base64(),
        });
    }
    parts.push(RequestPart::Text {
        text: prompt_text(text, attachment.is_some()),
    });

    Ok(AnalysisRequest {
        model: model.to_string(),
        parts,
        system_instruction: system_instruction(&config.output_language),
        enable_search: attachment.is_none(),
        temperature,
    })
}

fn prompt_text(text: &str, has_attachment: bool) -> String {
    if text.trim().is_empty() {
        return "Analyze this complete scientific article following the requested JSON schema."
            .to_string();
    }
    let source_hint = if has_attachment {
        "Treat the attached PDF file as the primary source."
    } else {
        "If this is a link, open it to extract the real information."
    };
    format!("Analyze the following content:\n\n{text}\n\n{source_hint}")
}

/// Persona, register and language rules followed by the exact JSON shape.
pub fn system_instruction(language: &str) -> String {
    format!(
        r#"You are a world-class senior scientist and research analyst.
Your task is to deeply analyze the provided document, text or link and structure the data for an application.

INSTRUCTIONS:
1. Write TWO summaries: a 'Simple' one (didactic, explanatory, undergraduate level) and an 'Academic' one (technical, doctoral level).
2. In the simple summary, whenever you use acronyms or complex terms, briefly explain them. Example: "PCR (Polymerase Chain Reaction)".
3. Answer EXCLUSIVELY in {language}.
4. Strictly follow the requested JSON format.

{schema}"#,
        language = language,
        schema = json_structure_prompt(language),
    )
}

fn json_structure_prompt(language: &str) -> String {
    format!(
        r#"Answer EXCLUSIVELY with one valid JSON object. Do not use Markdown code blocks (```json). The JSON must strictly follow this structure:
{{
  "title": "string (the original title of the article)",
  "authors": ["string", "string"],
  "publicationDate": "string (estimated date)",
  "executiveSummarySimple": "string (explanatory summary; keep technical terms but explain each one briefly in parentheses or right after it; be didactic without being condescending)",
  "executiveSummaryAcademic": "string (high-level technical summary using the field's jargon, focused on methodology and statistics, for academic peers)",
  "freeTranslation": "string (translation of the article TITLE into {language})",
  "researchQuestion": "string (the main research question)",
  "methodology": {{
    "type": "string (e.g. quantitative, qualitative)",
    "description": "string (brief description of the methods)",
    "sampleSize": "string (sample size, if any)"
  }},
  "keyFindings": ["string", "string", "string"],
  "limitations": ["string", "string"],
  "implications": "string",
  "critique": "string (constructive academic critique of quality and validity)",
  "score": {{
    "total": number (integer 1 to 10, overall grade),
    "methodology": number (integer 1 to 10, methodological rigor),
    "novelty": number (integer 1 to 10, innovation and originality),
    "clarity": number (integer 1 to 10, clarity of writing),
    "justification": "string (one short sentence justifying the grade)"
  }},
  "keywords": ["string", "string"]
}}"#
    )
}
