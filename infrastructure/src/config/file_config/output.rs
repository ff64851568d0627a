//! Output configuration from TOML (`[output]` section)

use super::ConfigValidationError;
use insights_domain::{NarrativeStyle, OutputFormat};
use serde::{Deserialize, Serialize};

/// Raw output configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Output format (uses domain type)
    pub format: Option<OutputFormat>,
    /// Narrative style: "executive" or "passthrough"
    pub style: String,
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            style: NarrativeStyle::default().as_str().to_string(),
            color: true,
        }
    }
}

impl FileOutputConfig {
    pub fn parse_style(&self) -> (NarrativeStyle, Vec<ConfigValidationError>) {
        match self.style.parse::<NarrativeStyle>() {
            Ok(style) => (style, vec![]),
            Err(_) => (
                NarrativeStyle::default(),
                vec![ConfigValidationError::InvalidValue {
                    field: "output.style".to_string(),
                    value: self.style.clone(),
                    expected: vec!["executive".to_string(), "passthrough".to_string()],
                }],
            ),
        }
    }
}
