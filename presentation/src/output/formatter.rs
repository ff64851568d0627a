//! Output formatter trait

use insights_domain::{AggregatedAnswer, OutputFormat};

/// Trait for formatting turn answers
pub trait OutputFormatter {
    /// Narrative followed by a per-tool status table
    fn format_full(&self, answer: &AggregatedAnswer) -> String;

    /// Format as JSON
    fn format_json(&self, answer: &AggregatedAnswer) -> String;

    /// Narrative only (concise output)
    fn format_narrative(&self, answer: &AggregatedAnswer) -> String;

    fn render(&self, answer: &AggregatedAnswer, format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => self.format_full(answer),
            OutputFormat::Narrative => self.format_narrative(answer),
            OutputFormat::Json => self.format_json(answer),
        }
    }
}
