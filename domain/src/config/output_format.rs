//! Output format value object

use serde::{Deserialize, Serialize};

/// How an answer is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Narrative plus a per-tool status table
    Full,
    /// Only the narrative (default)
    #[default]
    Narrative,
    /// The whole `AggregatedAnswer` as JSON
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(OutputFormat::Full),
            "narrative" => Ok(OutputFormat::Narrative),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "unknown output format '{}', expected full, narrative or json",
                other
            )),
        }
    }
}
