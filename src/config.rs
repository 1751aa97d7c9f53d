//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.fanout.toml` files. The API key is never read from or written to the
//! file; it only comes from the command line or the environment.

use crate::cli::{AnalyzeArgs, Args, SourceKind};
use crate::fanout::{FanoutConfig, RetryPolicy};
use crate::models::{AnalysisKind, ReportOrder};
use crate::report::OutputFormat;
use crate::source::DEFAULT_COMPANIES;
use crate::workflow::faq::{default_entries, FaqBase, FaqEntry};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".fanout.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Fan-out scheduling settings.
    #[serde(default)]
    pub fanout: FanoutSection,

    /// Analysis kinds and per-kind models.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Work source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Support chain settings.
    #[serde(default)]
    pub support: SupportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Report format for `analyze`.
    #[serde(default)]
    pub format: OutputFormat,

    /// Write the report here instead of stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Temperature of the decision step.
    #[serde(default = "default_decision_temperature")]
    pub decision_temperature: f32,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            decision_temperature: default_decision_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_base_url() -> String {
    crate::completion::DEFAULT_BASE_URL.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_decision_temperature() -> f32 {
    0.3
}

fn default_timeout() -> u64 {
    30
}

/// Fan-out scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutSection {
    /// Maximum simultaneous completion calls.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Retries after the first attempt, for transient failures only.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Result order: task or completion.
    #[serde(default)]
    pub order: ReportOrder,
}

impl Default for FanoutSection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            order: ReportOrder::default(),
        }
    }
}

fn default_concurrency() -> usize {
    crate::fanout::DEFAULT_CONCURRENCY
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8000
}

/// Which analyses to run and with which models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_kinds")]
    pub kinds: Vec<AnalysisKind>,

    /// Per-kind model overrides.
    #[serde(default)]
    pub models: KindModels,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            kinds: default_kinds(),
            models: KindModels::default(),
        }
    }
}

fn default_kinds() -> Vec<AnalysisKind> {
    AnalysisKind::ALL.to_vec()
}

/// Model override per analysis kind. Unset kinds use `model.name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindModels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
}

impl Default for KindModels {
    fn default() -> Self {
        Self {
            price: Some("gpt-4-turbo".to_string()),
            financial: Some("gpt-3.5-turbo-16k".to_string()),
            sentiment: Some("gpt-4".to_string()),
            risk: Some("gpt-3.5-turbo".to_string()),
        }
    }
}

impl KindModels {
    pub fn none() -> Self {
        Self {
            price: None,
            financial: None,
            sentiment: None,
            risk: None,
        }
    }

    pub fn get(&self, kind: AnalysisKind) -> Option<&str> {
        match kind {
            AnalysisKind::Price => self.price.as_deref(),
            AnalysisKind::Financial => self.financial.as_deref(),
            AnalysisKind::Sentiment => self.sentiment.as_deref(),
            AnalysisKind::Risk => self.risk.as_deref(),
        }
    }

    pub fn to_map(&self) -> HashMap<AnalysisKind, String> {
        AnalysisKind::ALL
            .iter()
            .filter_map(|&kind| self.get(kind).map(|m| (kind, m.to_string())))
            .collect()
    }
}

/// One live-data ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerConfig {
    pub company: String,
    pub ticker: String,
}

/// Work source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    /// Companies for mock market data.
    #[serde(default = "default_companies")]
    pub companies: Vec<String>,

    /// Quote summary endpoint for live data.
    #[serde(default = "default_quote_url")]
    pub quote_url: String,

    /// Seed for reproducible mock data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Companies and tickers for live data.
    #[serde(default = "default_tickers")]
    pub tickers: Vec<TickerConfig>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            companies: default_companies(),
            quote_url: default_quote_url(),
            seed: None,
            tickers: default_tickers(),
        }
    }
}

fn default_companies() -> Vec<String> {
    DEFAULT_COMPANIES.iter().map(|c| c.to_string()).collect()
}

fn default_quote_url() -> String {
    crate::source::DEFAULT_QUOTE_URL.to_string()
}

fn default_tickers() -> Vec<TickerConfig> {
    crate::source::LiveMarketSource::default_tickers()
        .into_iter()
        .map(|(company, ticker)| TickerConfig { company, ticker })
        .collect()
}

/// Support chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportConfig {
    #[serde(default = "default_entries")]
    pub faq: Vec<FaqEntry>,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            faq: default_entries(),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Check value ranges the file format alone cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.model.timeout_seconds == 0 {
            bail!("model.timeout_seconds must be at least 1");
        }
        for (name, value) in [
            ("model.temperature", self.model.temperature),
            ("model.decision_temperature", self.model.decision_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                bail!("{} must be between 0.0 and 2.0", name);
            }
        }
        if self.fanout.concurrency == 0 {
            bail!("fanout.concurrency must be at least 1");
        }
        Ok(())
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.fanout.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge global CLI arguments into this configuration.
    ///
    /// Only values given on the command line override the file.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref model) = args.model {
            // An explicit model applies to every analysis kind.
            self.model.name = model.clone();
            self.analysis.models = KindModels::none();
        }
        if let Some(ref base_url) = args.base_url {
            self.model.base_url = base_url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Merge `analyze` arguments into this configuration.
    pub fn merge_with_analyze_args(&mut self, args: &AnalyzeArgs) {
        if let Some(source) = args.source {
            self.source.kind = source;
        }
        if let Some(ref kinds) = args.kinds {
            self.analysis.kinds = kinds.clone();
        }
        if let Some(ref companies) = args.companies {
            self.source.companies = companies.clone();
        }
        if let Some(concurrency) = args.concurrency {
            self.fanout.concurrency = concurrency;
        }
        if let Some(max_retries) = args.max_retries {
            self.fanout.max_retries = max_retries;
        }
        if let Some(order) = args.order {
            self.fanout.order = order;
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if let Some(seed) = args.seed {
            self.source.seed = Some(seed);
        }
    }

    /// Log level: `quiet` wins, then `[general] verbose` or `--verbose`.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.model.timeout_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.fanout.max_retries,
            base_delay: Duration::from_millis(self.fanout.base_delay_ms),
            max_delay: Duration::from_millis(self.fanout.max_delay_ms),
        }
    }

    pub fn faq_base(&self) -> FaqBase {
        FaqBase::new(self.support.faq.clone())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

impl From<&Config> for FanoutConfig {
    fn from(config: &Config) -> Self {
        FanoutConfig {
            concurrency: config.fanout.concurrency,
            timeout: config.timeout(),
            retry: config.retry_policy(),
            order: config.fanout.order,
            model: config.model.name.clone(),
            kind_models: config.analysis.models.to_map(),
            temperature: config.model.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "gpt-4");
        assert_eq!(config.fanout.concurrency, 8);
        assert_eq!(config.fanout.max_retries, 2);
        assert_eq!(config.analysis.kinds.len(), 4);
        assert_eq!(config.analysis.models.get(AnalysisKind::Price), Some("gpt-4-turbo"));
        assert_eq!(config.support.faq.len(), 4);
        assert_eq!(config.source.tickers[0].ticker, "AAPL");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true
format = "markdown"

[model]
name = "gpt-4o-mini"
temperature = 0.2

[fanout]
concurrency = 3
order = "completion"

[analysis]
kinds = ["risk", "price"]

[analysis.models]
risk = "gpt-4o"

[source]
kind = "live"

[[source.tickers]]
company = "Nvidia"
ticker = "NVDA"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert_eq!(config.model.name, "gpt-4o-mini");
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.model.timeout_seconds, 30);
        assert_eq!(config.fanout.concurrency, 3);
        assert_eq!(config.fanout.order, ReportOrder::Completion);
        assert_eq!(config.analysis.kinds, vec![AnalysisKind::Risk, AnalysisKind::Price]);
        assert_eq!(config.analysis.models.get(AnalysisKind::Risk), Some("gpt-4o"));
        assert_eq!(config.analysis.models.get(AnalysisKind::Price), None);
        assert_eq!(config.source.kind, SourceKind::Live);
        assert_eq!(config.source.tickers.len(), 1);
        assert_eq!(config.source.companies.len(), 4);
    }

    #[test]
    fn test_default_toml_round_trips() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[fanout]"));
        assert!(toml_str.contains("[analysis.models]"));
        assert!(!toml_str.contains("api_key"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.support.faq, default_entries());
        assert_eq!(parsed.analysis.kinds, AnalysisKind::ALL.to_vec());
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        std::fs::write(&path, "[model]\ntimeout_seconds = 0\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("timeout_seconds must be at least 1"));

        std::fs::write(&path, "[fanout]\nconcurrency = 0\n").unwrap();
        assert!(Config::load(&path).is_err());

        std::fs::write(&path, "[model]\ntemperature = 3.5\n").unwrap();
        assert!(Config::load(&path).is_err());

        std::fs::write(&path, "[model]\ntimeout_seconds = 5\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_log_level_uses_file_verbose() {
        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
        assert_eq!(config.log_level(true), tracing::Level::ERROR);

        config.general.verbose = false;
        assert_eq!(config.log_level(false), tracing::Level::INFO);

        let args = Args::parse_from(["llm-fanout", "--verbose", "agent"]);
        config.merge_with_args(&args);
        assert_eq!(config.log_level(args.quiet), tracing::Level::DEBUG);
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(dir.path().join(CONFIG_FILE), "[fanout]\nconcurrency = 2\n").unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.fanout.concurrency, 2);

        std::fs::write(dir.path().join(CONFIG_FILE), "[fanout\n").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let args = Args::parse_from([
            "llm-fanout",
            "--model",
            "gpt-4o",
            "--timeout",
            "5",
            "analyze",
            "--kinds",
            "price,risk",
            "--concurrency",
            "2",
            "--order",
            "completion",
        ]);
        let mut config = Config::default();
        config.merge_with_args(&args);
        if let Some(crate::cli::Command::Analyze(ref analyze)) = args.command {
            config.merge_with_analyze_args(analyze);
        }

        assert_eq!(config.model.name, "gpt-4o");
        assert_eq!(config.model.timeout_seconds, 5);
        assert_eq!(config.analysis.kinds, vec![AnalysisKind::Price, AnalysisKind::Risk]);
        assert_eq!(config.fanout.concurrency, 2);
        assert_eq!(config.fanout.order, ReportOrder::Completion);
        // unchanged
        assert_eq!(config.fanout.max_retries, 2);

        let fanout = FanoutConfig::from(&config);
        assert_eq!(fanout.model_for(AnalysisKind::Risk), "gpt-4o");
        assert_eq!(fanout.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_kind_models_feed_fanout_config() {
        let fanout = FanoutConfig::from(&Config::default());
        assert_eq!(fanout.model_for(AnalysisKind::Financial), "gpt-3.5-turbo-16k");
        assert_eq!(fanout.retry.base_delay, Duration::from_millis(500));
    }
}
