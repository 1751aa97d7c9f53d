//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{AnalysisKind, ReportOrder};
use crate::report::OutputFormat;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// llm-fanout - parallel LLM analysis and prompt workflows
///
/// Fans analysis prompts out over a bounded pool of concurrent completion
/// calls, and runs small sequential workflows (prompt chains, decide and
/// execute, a question-answering agent).
///
/// Examples:
///   llm-fanout analyze --source mock --kinds price,risk --concurrency 4
///   llm-fanout analyze --source live --format markdown --output report.md
///   llm-fanout support --message "I forgot my password"
///   llm-fanout workflow --topic "photosynthesis"
///   llm-fanout --offline hybrid --input "how do I make bread"
///   llm-fanout --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .fanout.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Model used for every call (overrides per-analysis models)
    #[arg(short, long, env = "LLM_FANOUT_MODEL", global = true)]
    pub model: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, value_name = "URL", env = "OPENAI_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// API key for the completion service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Temperature for LLM responses (0.0 - 2.0)
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Per-call timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Use the offline echo service instead of a real provider
    #[arg(long, global = true)]
    pub offline: bool,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .fanout.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fan analysis prompts out over a set of companies
    Analyze(AnalyzeArgs),
    /// Customer support prompt chain with an FAQ base
    Support(SupportArgs),
    /// Explain a topic, then summarize the explanation
    Workflow(WorkflowArgs),
    /// Decide an action for the input, execute it and summarize
    Hybrid(HybridArgs),
    /// Interactive question-answering agent
    Agent,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// Where the companies and their facts come from
    #[arg(long, value_name = "SOURCE")]
    pub source: Option<SourceKind>,

    /// Analyses to run (comma-separated)
    ///
    /// Example: --kinds price,financial,sentiment,risk
    #[arg(long, value_name = "KINDS", value_delimiter = ',')]
    pub kinds: Option<Vec<AnalysisKind>>,

    /// Companies for mock data (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub companies: Option<Vec<String>>,

    /// Maximum simultaneous completion calls
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Retries per task for transient failures
    #[arg(long, value_name = "NUM")]
    pub max_retries: Option<u32>,

    /// Result order
    #[arg(long, value_name = "ORDER")]
    pub order: Option<ReportOrder>,

    /// Output format
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Seed for reproducible mock data
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct SupportArgs {
    /// Answer one message and exit instead of starting a conversation
    #[arg(long)]
    pub message: Option<String>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct WorkflowArgs {
    /// Topic to explain; prompted for when missing
    #[arg(long)]
    pub topic: Option<String>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct HybridArgs {
    /// Topic or task; prompted for when missing
    #[arg(long)]
    pub input: Option<String>,
}

/// Work source for `analyze`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Randomly generated market facts
    #[default]
    Mock,
    /// Quotes fetched over HTTP
    Live,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Mock => "mock",
            SourceKind::Live => "live",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.command.is_none() {
            return Err("A subcommand is required (see --help)".to_string());
        }

        if let Some(ref base_url) = self.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(Command::Analyze(ref analyze)) = self.command {
            if analyze.concurrency == Some(0) {
                return Err("Concurrency must be at least 1".to_string());
            }
            if matches!(analyze.kinds, Some(ref kinds) if kinds.is_empty()) {
                return Err("At least one analysis kind is required".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            command: Some(Command::Analyze(AnalyzeArgs::default())),
            config: None,
            model: None,
            base_url: None,
            api_key: None,
            temperature: None,
            timeout: None,
            offline: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_analyze() {
        let args = Args::parse_from([
            "llm-fanout",
            "analyze",
            "--source",
            "live",
            "--kinds",
            "price,sentiment",
            "--format",
            "json",
            "--offline",
        ]);
        assert!(args.offline);
        match args.command {
            Some(Command::Analyze(analyze)) => {
                assert_eq!(analyze.source, Some(SourceKind::Live));
                assert_eq!(
                    analyze.kinds,
                    Some(vec![AnalysisKind::Price, AnalysisKind::Sentiment])
                );
                assert_eq!(analyze.format, Some(OutputFormat::Json));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_kind_aliases() {
        let args = Args::parse_from(["llm-fanout", "analyze", "--kinds", "stock,financials"]);
        match args.command {
            Some(Command::Analyze(analyze)) => assert_eq!(
                analyze.kinds,
                Some(vec![AnalysisKind::Price, AnalysisKind::Financial])
            ),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_workflows() {
        let args = Args::parse_from(["llm-fanout", "support", "--message", "help"]);
        assert!(matches!(
            args.command,
            Some(Command::Support(SupportArgs { message: Some(ref m) })) if m == "help"
        ));

        let args = Args::parse_from(["llm-fanout", "agent"]);
        assert!(matches!(args.command, Some(Command::Agent)));
    }

    #[test]
    fn test_validation_requires_command() {
        let mut args = make_args();
        args.command = None;
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_ranges() {
        let mut args = make_args();
        args.temperature = Some(2.5);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.command = Some(Command::Analyze(AnalyzeArgs {
            concurrency: Some(0),
            ..AnalyzeArgs::default()
        }));
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.base_url = Some("localhost:8080".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }
}
