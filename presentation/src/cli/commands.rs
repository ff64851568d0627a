//! CLI command definitions

use clap::{Parser, ValueEnum};
use insights_domain::{NarrativeStyle, OutputFormat};
use std::path::PathBuf;

/// How answers are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    /// Narrative plus a per-tool status table
    Full,
    /// Only the narrative
    Narrative,
    /// The whole answer as JSON
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Full => OutputFormat::Full,
            OutputFormatArg::Narrative => OutputFormat::Narrative,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// How the narrative is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StyleArg {
    /// Summary sentence with per-tool highlights
    Executive,
    /// Exact tool outputs
    Passthrough,
}

impl From<StyleArg> for NarrativeStyle {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::Executive => NarrativeStyle::Executive,
            StyleArg::Passthrough => NarrativeStyle::Passthrough,
        }
    }
}

/// CLI arguments for insights
#[derive(Parser, Debug)]
#[command(name = "insights")]
#[command(author, version, about = "Executive insights on AWS security posture, cost and ROI")]
#[command(long_about = r#"
insights answers plain-English questions about security posture, security
spend and return on security investment by routing them to the security,
cost and ROI tool-servers and merging their answers.

Independent tools run concurrently. When one tool-server fails, the answer
still reports what the others returned and names what is missing.

Configuration files are loaded from (in priority order):
1. INSIGHTS_* environment variables (INSIGHTS_DISPATCH__MAX_IN_FLIGHT=2)
2. --config <path>     Explicit config file
3. ./insights.toml     Project-level config
4. ~/.config/exec-insights/config.toml   Global config

Example:
  insights "Check security services in us-west-2 and get costs for the same region"
  insights --session board-prep "What's my security ROI for last quarter?"
  insights --chat --offline
"#)]
pub struct Cli {
    /// The question to answer (not required in chat mode)
    pub query: Option<String>,

    /// Session to continue; defaults to a fresh one per run
    #[arg(short, long, value_name = "ID")]
    pub session: Option<String>,

    /// Start interactive chat mode
    #[arg(short, long)]
    pub chat: bool,

    /// Serve tool calls from built-in fixtures instead of the tool-servers
    #[arg(long)]
    pub offline: bool,

    /// List the registered tools and exit
    #[arg(long)]
    pub list_tools: bool,

    /// Output format (overrides [output] format)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormatArg>,

    /// Narrative style (overrides [output] style)
    #[arg(long, value_enum)]
    pub style: Option<StyleArg>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Write diagnostic logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
