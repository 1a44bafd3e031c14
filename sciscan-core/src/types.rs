//! Core type definitions for SciScan.
//!
//! Defines the structured analysis record returned by the model, the
//! persisted history wrapper around it, and the visible session status.

use crate::error::SchemaViolation;
use serde::{Deserialize, Serialize};

/// Study design summary extracted from the article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Methodology {
    /// Kind of study (quantitative, qualitative, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sample_size: String,
}

/// Quality scores, each expected within `1..=10`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub total: u8,
    pub methodology: u8,
    pub novelty: u8,
    pub clarity: u8,
    /// One sentence justifying the grade.
    #[serde(default)]
    pub justification: String,
}

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Named score fields in display order.
    pub fn fields(&self) -> [(&'static str, u8); 4] {
        [
            ("total", self.total),
            ("methodology", self.methodology),
            ("novelty", self.novelty),
            ("clarity", self.clarity),
        ]
    }
}

/// The structured result of analyzing one article.
///
/// Field names serialize in camelCase to match the JSON shape the model is
/// instructed to produce and the shape persisted in the history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub publication_date: String,
    /// Explanatory register: keeps technical terms and explains them inline.
    #[serde(default)]
    pub executive_summary_simple: String,
    /// Technical register aimed at academic peers.
    #[serde(default)]
    pub executive_summary_academic: String,
    /// Translation of the title into the output language.
    #[serde(default)]
    pub free_translation: String,
    #[serde(default)]
    pub research_question: String,
    #[serde(default)]
    pub methodology: Methodology,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub limitations: Vec<String>,
    #[serde(default)]
    pub implications: String,
    #[serde(default)]
    pub critique: String,
    pub score: Score,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl AnalysisRecord {
    /// Check the invariants a successful analysis must satisfy.
    ///
    /// Scores outside `1..=10` are rejected, never clamped.
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        if self.executive_summary_simple.trim().is_empty() {
            return Err(SchemaViolation::MissingField {
                field: "executiveSummarySimple",
            });
        }
        if self.executive_summary_academic.trim().is_empty() {
            return Err(SchemaViolation::MissingField {
                field: "executiveSummaryAcademic",
            });
        }
        if self.key_findings.iter().all(|f| f.trim().is_empty()) {
            return Err(SchemaViolation::MissingField {
                field: "keyFindings",
            });
        }
        for (field, value) in self.score.fields() {
            if !(Score::MIN..=Score::MAX).contains(&value) {
                return Err(SchemaViolation::ScoreOutOfRange {
                    field,
                    value: i64::from(value),
                });
            }
        }
        Ok(())
    }
}

/// A persisted, user-deletable wrapper around one `AnalysisRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    /// Creation date, already formatted for display.
    pub date: String,
    pub schema: AnalysisRecord,
}

/// The visible state of an analysis session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiStatus {
    #[default]
    Idle,
    Reading,
    Analyzing,
    Complete,
    Error,
}

impl UiStatus {
    /// Whether a request is in flight and input must be ignored.
    pub fn is_busy(self) -> bool {
        matches!(self, UiStatus::Reading | UiStatus::Analyzing)
    }
}

impl std::fmt::Display for UiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UiStatus::Idle => write!(f, "idle"),
            UiStatus::Reading => write!(f, "reading"),
            UiStatus::Analyzing => write!(f, "analyzing"),
            UiStatus::Complete => write!(f, "complete"),
            UiStatus::Error => write!(f, "error"),
        }
    }
}
