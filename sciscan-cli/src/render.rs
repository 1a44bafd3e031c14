//! Terminal rendering of analysis records and history listings.

use sciscan_core::report::{self, QualityTier, SummaryRegister};
use sciscan_core::types::{AnalysisRecord, HistoryEntry};

const WRAP_WIDTH: usize = 88;

/// ANSI escape codes for terminal formatting.
mod ansi {
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[90m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RESET: &str = "\x1b[0m";
}

/// Display options for one record.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub register: SummaryRegister,
    pub translated_title: bool,
    pub color: bool,
}

struct Painter {
    color: bool,
}

impl Painter {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{}", ansi::RESET)
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint(ansi::CYAN, text)
    }

    fn tier(&self, tier: QualityTier) -> String {
        let code = match tier {
            QualityTier::Great => ansi::GREEN,
            QualityTier::Medium => ansi::YELLOW,
            QualityTier::Low => ansi::RED,
        };
        self.paint(code, tier.label())
    }
}

fn paragraph(out: &mut String, text: &str) {
    let options = textwrap::Options::new(WRAP_WIDTH)
        .initial_indent("  ")
        .subsequent_indent("  ");
    out.push_str(&textwrap::fill(text, options));
    out.push('\n');
}

fn bullets(out: &mut String, items: &[String]) {
    let options = textwrap::Options::new(WRAP_WIDTH)
        .initial_indent("  • ")
        .subsequent_indent("    ");
    for item in items.iter().filter(|i| !i.trim().is_empty()) {
        out.push_str(&textwrap::fill(item, &options));
        out.push('\n');
    }
}

fn section(out: &mut String, painter: &Painter, title: &str) {
    out.push('\n');
    out.push_str(&painter.heading(title));
    out.push('\n');
}

/// Full text report of one analysis.
pub fn render_record(record: &AnalysisRecord, options: RenderOptions) -> String {
    let painter = Painter {
        color: options.color,
    };
    let mut out = String::new();

    out.push_str(&painter.paint(
        ansi::BOLD,
        report::display_title(record, options.translated_title),
    ));
    out.push('\n');

    let mut byline = record.authors.join(", ");
    if !record.publication_date.trim().is_empty() {
        if !byline.is_empty() {
            byline.push_str(" · ");
        }
        byline.push_str(&record.publication_date);
    }
    if !byline.is_empty() {
        out.push_str(&painter.paint(ansi::DIM, &byline));
        out.push('\n');
    }

    let score = &record.score;
    out.push_str(&format!(
        "\nQuality: {} ({}/10)  methodology {} · novelty {} · clarity {}\n",
        painter.tier(report::quality_tier(record)),
        score.total,
        score.methodology,
        score.novelty,
        score.clarity,
    ));
    if !score.justification.trim().is_empty() {
        paragraph(&mut out, &score.justification);
    }

    section(&mut out, &painter, options.register.label());
    paragraph(&mut out, report::summary(record, options.register));

    if !record.research_question.trim().is_empty() {
        section(&mut out, &painter, "Research question");
        paragraph(&mut out, &record.research_question);
    }

    let methodology = &record.methodology;
    let mut heading = String::from("Methodology");
    match (
        methodology.kind.trim().is_empty(),
        methodology.sample_size.trim().is_empty(),
    ) {
        (false, false) => heading.push_str(&format!(
            " ({}, sample: {})",
            methodology.kind, methodology.sample_size
        )),
        (false, true) => heading.push_str(&format!(" ({})", methodology.kind)),
        (true, false) => heading.push_str(&format!(" (sample: {})", methodology.sample_size)),
        (true, true) => {}
    }
    section(&mut out, &painter, &heading);
    if !methodology.description.trim().is_empty() {
        paragraph(&mut out, &methodology.description);
    }

    section(&mut out, &painter, "Key findings");
    bullets(&mut out, &record.key_findings);

    if !record.limitations.is_empty() {
        section(&mut out, &painter, "Limitations");
        bullets(&mut out, &record.limitations);
    }
    if !record.implications.trim().is_empty() {
        section(&mut out, &painter, "Implications");
        paragraph(&mut out, &record.implications);
    }
    if !record.critique.trim().is_empty() {
        section(&mut out, &painter, "Critique");
        paragraph(&mut out, &record.critique);
    }
    if !record.keywords.is_empty() {
        out.push('\n');
        out.push_str(&painter.paint(
            ansi::DIM,
            &format!("Keywords: {}", record.keywords.join(", ")),
        ));
        out.push('\n');
    }

    out
}

/// One line per entry: id, date, tier and title.
pub fn render_history(entries: &[HistoryEntry], color: bool) -> String {
    if entries.is_empty() {
        return "No saved analyses.\n".to_string();
    }
    let painter = Painter { color };
    let mut out = String::new();
    for entry in entries {
        let record = &entry.schema;
        out.push_str(&format!(
            "{}  {}  {:>2}/10 {:<7}  {}\n",
            painter.paint(ansi::DIM, &entry.id),
            entry.date,
            record.score.total,
            painter.tier(report::quality_tier(record)),
            report::display_title(record, false),
        ));
    }
    out
}
