//! Progress reporting while a call plan runs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use insights_application::DispatchProgressNotifier;
use insights_domain::answer::tool_label;
use insights_domain::{CallPlan, FailureKind, StepId, ToolInvocationResult};
use std::sync::Mutex;

/// Reports dispatch progress with a progress bar
pub struct ProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn plan_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock()
            && let Some(bar) = guard.as_ref()
        {
            f(bar);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchProgressNotifier for ProgressReporter {
    fn on_plan_start(&self, plan: &CallPlan) {
        let bar = ProgressBar::new(plan.len() as u64);
        bar.set_style(Self::plan_style());
        bar.set_prefix("Querying tools");
        bar.set_message("Starting...");
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn on_step_start(&self, _step: StepId, tool_name: &str, attempt: u32) {
        self.with_bar(|bar| {
            if attempt > 1 {
                bar.set_message(format!("{} (retry)", tool_label(tool_name)));
            } else {
                bar.set_message(tool_label(tool_name));
            }
        });
    }

    fn on_step_retry(&self, _step: StepId, tool_name: &str, kind: FailureKind) {
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} {} failed ({}), retrying",
                "!".yellow(),
                tool_label(tool_name),
                kind
            ));
        });
    }

    fn on_step_complete(&self, result: &ToolInvocationResult) {
        self.with_bar(|bar| {
            let status = if result.is_success() {
                format!("{} {}", "v".green(), tool_label(result.tool_name()))
            } else {
                format!("{} {}", "x".red(), tool_label(result.tool_name()))
            };
            bar.set_message(status);
            bar.inc(1);
        });
    }

    fn on_plan_complete(&self, results: &[ToolInvocationResult]) {
        if let Ok(mut guard) = self.bar.lock()
            && let Some(bar) = guard.take()
        {
            let failed = results.iter().filter(|r| !r.is_success()).count();
            if failed == 0 {
                bar.finish_and_clear();
            } else {
                bar.finish_with_message(format!("{} of {} unavailable", failed, results.len()).yellow().to_string());
            }
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl DispatchProgressNotifier for SimpleProgress {
    fn on_plan_start(&self, plan: &CallPlan) {
        println!("{} {} ({} tools)", "->".cyan(), "Querying tools".bold(), plan.len());
    }

    fn on_step_retry(&self, _step: StepId, tool_name: &str, kind: FailureKind) {
        println!("  {} {} ({}), retrying", "!".yellow(), tool_label(tool_name), kind);
    }

    fn on_step_complete(&self, result: &ToolInvocationResult) {
        if result.is_success() {
            println!("  {} {}", "v".green(), tool_label(result.tool_name()));
        } else {
            println!("  {} {} (failed)", "x".red(), tool_label(result.tool_name()));
        }
    }

    fn on_plan_complete(&self, _results: &[ToolInvocationResult]) {
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insights_domain::CallPlanStep;
    use serde_json::json;

    #[test]
    fn test_reporter_tracks_plan_lifecycle() {
        let reporter = ProgressReporter::new();
        let plan = CallPlan::new()
            .with_step(CallPlanStep::new(StepId(1), "check_security_services"))
            .with_step(CallPlanStep::new(StepId(2), "get_cost_breakdown"));

        reporter.on_plan_start(&plan);
        let length = reporter.bar.lock().unwrap().as_ref().and_then(|b| b.length());
        assert_eq!(length, Some(2));

        let result = ToolInvocationResult::success(StepId(1), "check_security_services", json!({}), 5);
        reporter.on_step_start(StepId(1), "check_security_services", 1);
        reporter.on_step_complete(&result);
        let position = reporter.bar.lock().unwrap().as_ref().map(|b| b.position());
        assert_eq!(position, Some(1));

        reporter.on_plan_complete(&[result]);
        assert!(reporter.bar.lock().unwrap().is_none());
    }

    #[test]
    fn test_callbacks_without_plan_are_ignored() {
        let reporter = ProgressReporter::new();
        reporter.on_step_start(StepId(1), "forecast_costs", 2);
        reporter.on_plan_complete(&[]);
        assert!(reporter.bar.lock().unwrap().is_none());
    }
}
