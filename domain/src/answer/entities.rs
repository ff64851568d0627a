//! Aggregated answer entities

use crate::plan::StepId;
use crate::tool::{FailureKind, ToolInvocationResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How the narrative is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeStyle {
    /// Summary sentence, per-tool highlights, degraded notice
    #[default]
    Executive,
    /// Exact tool outputs only, then the degraded notice
    Passthrough,
}

impl NarrativeStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeStyle::Executive => "executive",
            NarrativeStyle::Passthrough => "passthrough",
        }
    }
}

impl std::str::FromStr for NarrativeStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "executive" => Ok(NarrativeStyle::Executive),
            "passthrough" | "exact" | "raw" => Ok(NarrativeStyle::Passthrough),
            other => Err(format!(
                "unknown narrative style '{}', expected executive or passthrough",
                other
            )),
        }
    }
}

impl std::fmt::Display for NarrativeStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A targeted follow-up question for one missing parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clarification {
    pub tool_name: String,
    pub parameter: String,
    pub question: String,
}

/// A step that produced no payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableTool {
    pub step_id: StepId,
    pub tool_name: String,
    pub kind: FailureKind,
    pub detail: String,
}

/// Merged outcome of one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedAnswer {
    /// Successful results keyed by tool name (`name#step` on repeats),
    /// in plan declaration order
    pub per_tool_results: IndexMap<String, ToolInvocationResult>,
    /// Failed steps in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<UnavailableTool>,
    pub narrative: String,
    /// Some step failed but an answer was still produced
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<Clarification>,
}

impl AggregatedAnswer {
    /// Answer for a turn no tool matched.
    pub fn unrecognized() -> Self {
        Self {
            per_tool_results: IndexMap::new(),
            unavailable: Vec::new(),
            narrative: "I couldn't tell which data you're asking about. I can answer questions \
                        about your security posture (services, findings, compliance), security \
                        costs (breakdowns, trends, forecasts) and security ROI. For example: \
                        \"What did GuardDuty cost last month?\""
                .to_string(),
            degraded: false,
            clarification: None,
        }
    }

    /// Answer for a turn aborted by an internal error.
    pub fn apology() -> Self {
        Self {
            per_tool_results: IndexMap::new(),
            unavailable: Vec::new(),
            narrative: "Sorry, something went wrong while preparing this answer. The problem \
                        has been reported; please try again shortly."
                .to_string(),
            degraded: true,
            clarification: None,
        }
    }

    pub fn is_clarification(&self) -> bool {
        self.clarification.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parse() {
        assert_eq!("Executive".parse::<NarrativeStyle>().unwrap(), NarrativeStyle::Executive);
        assert_eq!("raw".parse::<NarrativeStyle>().unwrap(), NarrativeStyle::Passthrough);
        assert!("verbose".parse::<NarrativeStyle>().is_err());
    }

    #[test]
    fn test_canned_answers() {
        let unrecognized = AggregatedAnswer::unrecognized();
        assert!(!unrecognized.degraded);
        assert!(unrecognized.narrative.contains("security posture"));

        let apology = AggregatedAnswer::apology();
        assert!(apology.degraded);
        assert!(apology.per_tool_results.is_empty());
    }
}
