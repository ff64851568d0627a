//! Console output formatter for turn answers

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use insights_domain::answer::tool_label;
use insights_domain::{AggregatedAnswer, SessionContext, ToolDomain, ToolRegistry};

/// Formats answers, tool listings and session state for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Narrative plus per-tool status table
    pub fn format(answer: &AggregatedAnswer) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Executive Insights"));
        output.push_str("\n\n");
        output.push_str(&answer.narrative);
        output.push('\n');

        if !answer.per_tool_results.is_empty() || !answer.unavailable.is_empty() {
            output.push_str(&Self::section_header("Tools"));
            for (key, result) in &answer.per_tool_results {
                output.push_str(&format!(
                    "  {} {:<28} {:>6} ms{}\n",
                    "v".green(),
                    key,
                    result.latency_ms(),
                    if result.attempt() > 1 {
                        format!("  (attempt {})", result.attempt()).dimmed().to_string()
                    } else {
                        String::new()
                    }
                ));
            }
            for missing in &answer.unavailable {
                output.push_str(&format!(
                    "  {} {:<28} {}\n",
                    "x".red(),
                    missing.tool_name,
                    missing.kind.as_str().yellow()
                ));
            }
        }

        if answer.degraded {
            output.push_str(&format!("\n{}\n", "Partial answer".yellow().bold()));
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(answer: &AggregatedAnswer) -> String {
        serde_json::to_string_pretty(answer).unwrap_or_else(|_| "{}".to_string())
    }

    /// Narrative only (concise output)
    pub fn format_narrative_only(answer: &AggregatedAnswer) -> String {
        if answer.degraded {
            format!("{}\n{}\n", "(partial)".yellow(), answer.narrative)
        } else {
            format!("{}\n", answer.narrative)
        }
    }

    /// Registered tools grouped by domain
    pub fn format_tools(registry: &ToolRegistry) -> String {
        let mut output = String::new();
        for domain in ToolDomain::ALL {
            let tools: Vec<_> = registry.tools_for(domain).collect();
            if tools.is_empty() {
                continue;
            }
            output.push_str(&format!(
                "{} {}\n",
                format!("[{}]", domain).cyan().bold(),
                tools[0].backend_address.dimmed()
            ));
            for tool in tools {
                let params: Vec<String> = tool
                    .parameters
                    .values()
                    .map(|p| {
                        if p.required {
                            format!("{}*", p.name)
                        } else {
                            p.name.clone()
                        }
                    })
                    .collect();
                output.push_str(&format!(
                    "  {:<28} {}\n    {}\n",
                    tool.name.bold(),
                    tool.description,
                    format!("({})", params.join(", ")).dimmed()
                ));
            }
        }
        output
    }

    /// Remembered defaults, pending question and recent turns of a session
    pub fn format_session(context: &SessionContext) -> String {
        let mut output = format!("{} {}\n", "Session:".cyan().bold(), context.session_id());

        if context.resolved_defaults().is_empty() {
            output.push_str("  No remembered parameters\n");
        } else {
            output.push_str("  Remembered parameters:\n");
            for (name, value) in context.resolved_defaults() {
                output.push_str(&format!("    {} = {}\n", name, value));
            }
        }

        if let Some(pending) = context.pending_clarification() {
            output.push_str(&format!(
                "  Waiting for: {} ({})\n",
                pending.missing_param,
                tool_label(&pending.tool_name)
            ));
        }

        output.push_str(&format!("  Turns: {}\n", context.history_len()));
        for record in context.history() {
            output.push_str(&format!(
                "    {} {}\n",
                record.recorded_at.format("%H:%M:%S").to_string().dimmed(),
                record.turn
            ));
        }
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_full(&self, answer: &AggregatedAnswer) -> String {
        Self::format(answer)
    }

    fn format_json(&self, answer: &AggregatedAnswer) -> String {
        Self::format_json(answer)
    }

    fn format_narrative(&self, answer: &AggregatedAnswer) -> String {
        Self::format_narrative_only(answer)
    }
}
