//! Presentation helpers for an `AnalysisRecord`.

use crate::types::AnalysisRecord;

/// Shown when the model could not determine a title.
pub const UNTITLED: &str = "Análise sem título";

/// Badge derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    Great,
    Medium,
    Low,
}

impl QualityTier {
    /// `>= 8` is great, `< 5` is low, anything between is medium.
    pub fn from_total(total: u8) -> Self {
        if total >= 8 {
            QualityTier::Great
        } else if total < 5 {
            QualityTier::Low
        } else {
            QualityTier::Medium
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Great => "Ótima",
            QualityTier::Medium => "Mediana",
            QualityTier::Low => "Baixa",
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which of the two executive summaries to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SummaryRegister {
    #[default]
    Simple,
    Academic,
}

impl SummaryRegister {
    pub fn from_academic_flag(academic: bool) -> Self {
        if academic {
            SummaryRegister::Academic
        } else {
            SummaryRegister::Simple
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SummaryRegister::Simple => "Simple summary",
            SummaryRegister::Academic => "Academic summary",
        }
    }
}

pub fn quality_tier(record: &AnalysisRecord) -> QualityTier {
    QualityTier::from_total(record.score.total)
}

pub fn summary(record: &AnalysisRecord, register: SummaryRegister) -> &str {
    match register {
        SummaryRegister::Simple => &record.executive_summary_simple,
        SummaryRegister::Academic => &record.executive_summary_academic,
    }
}

/// Original title, or its translation when `translated` is set and one exists.
/// Falls back to `UNTITLED` when the chosen title is blank.
pub fn display_title(record: &AnalysisRecord, translated: bool) -> &str {
    let title = if translated && !record.free_translation.trim().is_empty() {
        record.free_translation.as_str()
    } else {
        record.title.as_str()
    };
    if title.trim().is_empty() {
        UNTITLED
    } else {
        title
    }
}
