//! llm-fanout - parallel LLM analysis and prompt workflows
//!
//! Console driver for the library: loads configuration, builds the
//! completion service and runs one subcommand.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, source fetch, chain abort, etc.)
//!   2 - `analyze` finished with failed tasks or was cancelled

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use llm_fanout::cli::{Args, Command, HybridArgs, SourceKind, SupportArgs, WorkflowArgs};
use llm_fanout::completion::{DynCompletionService, EchoService, OpenAiClient, OpenAiConfig};
use llm_fanout::config::{Config, CONFIG_FILE};
use llm_fanout::console::Console;
use llm_fanout::fanout::{FanoutAggregator, FanoutConfig};
use llm_fanout::report::{self, OutputFormat, ReportMetadata};
use llm_fanout::source::{LiveMarketSource, MockMarketSource, WorkSource};
use llm_fanout::workflow::{AutonomousAgent, HybridApp, Pipeline};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is read before logging so `[general] verbose` can raise the level.
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(args.quiet));

    info!("llm-fanout v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command: {:?}", args.command);

    match run(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .fanout.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize models, concurrency, retries, sources, and the FAQ.");
    println!("   The API key is read from OPENAI_API_KEY, never from this file.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run(args: Args, mut config: Config) -> Result<i32> {
    let service = build_service(&args, &config)?;

    match args.command {
        Some(Command::Analyze(ref analyze)) => {
            config.merge_with_analyze_args(analyze);
            run_analyze(service, &config, args.quiet).await
        }
        Some(Command::Support(ref support)) => run_support(service, &config, support).await,
        Some(Command::Workflow(ref workflow)) => run_workflow(service, &config, workflow).await,
        Some(Command::Hybrid(ref hybrid)) => run_hybrid(service, &config, hybrid).await,
        Some(Command::Agent) => run_agent(service, &config).await,
        None => bail!("A subcommand is required (see --help)"),
    }
}

/// Pick the completion service: the echo service offline, else the HTTP client.
fn build_service(args: &Args, config: &Config) -> Result<DynCompletionService> {
    if args.offline {
        eprintln!("🔌 Offline mode: responses are echoed, no provider is called.");
        return Ok(Arc::new(EchoService));
    }

    let Some(api_key) = args.api_key.clone() else {
        bail!("No API key. Set OPENAI_API_KEY, pass --api-key, or use --offline.");
    };

    let client = OpenAiClient::new(OpenAiConfig {
        base_url: config.model.base_url.clone(),
        api_key: Some(api_key),
    })
    .context("Failed to build HTTP client")?;

    Ok(Arc::new(client))
}

fn build_source(config: &Config) -> Result<Box<dyn WorkSource>> {
    match config.source.kind {
        SourceKind::Mock => {
            let mut source = MockMarketSource::new(config.source.companies.clone());
            if let Some(seed) = config.source.seed {
                source = source.with_seed(seed);
            }
            Ok(Box::new(source))
        }
        SourceKind::Live => {
            let tickers = config
                .source
                .tickers
                .iter()
                .map(|t| (t.company.clone(), t.ticker.clone()))
                .collect();
            let source = LiveMarketSource::with_quote_url(tickers, &config.source.quote_url)
                .context("Failed to build quote client")?;
            Ok(Box::new(source))
        }
    }
}

/// Run the fan-out analysis. Returns exit code (0 or 2).
async fn run_analyze(service: DynCompletionService, config: &Config, quiet: bool) -> Result<i32> {
    let source = build_source(config)?;

    // Keep stdout parseable when the JSON report goes there.
    let json_to_stdout =
        config.general.format == OutputFormat::Json && config.general.output.is_none();
    let status = |line: String| {
        if json_to_stdout {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    };

    status(format!(
        "📥 Loading work items ({} source)...",
        config.source.kind.as_str()
    ));
    let items = source
        .fetch()
        .await
        .context("Failed to load work items")?;
    info!("Loaded {} work items", items.len());

    let fanout_config = FanoutConfig::from(config);
    let concurrency = fanout_config.concurrency;
    let aggregator = FanoutAggregator::new(service, fanout_config);

    status("🤖 Running analyses...".to_string());
    status(format!("   Companies: {}", items.len()));
    status(format!(
        "   Analyses: {}",
        config
            .analysis
            .kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    status(format!("   Concurrency: {}", concurrency));
    status(format!("   Retries: {}", config.fanout.max_retries));

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling batch");
                cancel.cancel();
            }
        })
    };

    let spinner = (!quiet).then(|| start_spinner("Waiting for completions..."));

    let result = aggregator
        .submit_with_cancel(&items, &config.analysis.kinds, concurrency, &cancel)
        .await;

    ctrl_c.abort();
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let report = result?;
    let summary = report.summary();

    let metadata = ReportMetadata {
        source: config.source.kind.as_str().to_string(),
        model: config.model.name.clone(),
        concurrency,
    };
    let rendered = report::render(&report, &metadata, config.general.format)?;

    match config.general.output {
        Some(ref output) => {
            report::write_report(&rendered, Path::new(output))?;
            status(format!("\n💾 Report saved to: {}", output));
        }
        None => {
            status(String::new());
            print!("{}", rendered);
        }
    }

    status("\n📊 Analysis Summary:".to_string());
    for line in llm_fanout::analysis::generate_summary_text(&summary).lines() {
        status(format!("   {}", line));
    }
    status(format!("   Duration: {:.1}s", report.duration_seconds()));

    if !report.is_complete() {
        eprintln!("\n⏹️  Batch cancelled; the report is incomplete (exit code 2).");
        return Ok(2);
    }
    if summary.failed > 0 {
        eprintln!("\n⛔ {} task(s) failed (exit code 2).", summary.failed);
        return Ok(2);
    }

    status("\n✅ Analysis complete!".to_string());
    Ok(0)
}

fn start_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn support_pipeline(config: &Config) -> Pipeline {
    Pipeline::support(config.model.name.clone(), &config.faq_base())
        .with_temperature(config.model.temperature)
        .with_timeout(config.timeout())
        .with_retry(config.retry_policy())
}

/// Customer support chain, one-shot or interactive.
async fn run_support(
    service: DynCompletionService,
    config: &Config,
    args: &SupportArgs,
) -> Result<i32> {
    let pipeline = support_pipeline(config);

    if let Some(ref message) = args.message {
        let output = pipeline.run(&*service, message).await?;
        for stage in &output.stages {
            println!("\n🔹 {}:\n{}", stage.name, stage.text);
        }
        return Ok(0);
    }

    println!("💬 Customer support. Type 'exit', 'quit' or 'bye' to leave.");
    let mut console = Console::stdio();
    while let Some(message) = console.next_input("\nHow can I help you today? ").await? {
        match pipeline.run(&*service, &message).await {
            Ok(output) => {
                if let Some(solution) = output.get("generate_solution") {
                    println!("\n🛠️  Solution:\n{}", solution);
                }
                if let Some(follow_up) = output.get("follow_up") {
                    println!("\n❓ {}", follow_up);
                }
            }
            Err(e) => eprintln!("\n❌ {}", e),
        }
    }

    println!("👋 Thank you for contacting support. Goodbye!");
    Ok(0)
}

/// Read a value from the command line or prompt for it.
async fn arg_or_prompt(value: &Option<String>, prompt: &str) -> Result<String> {
    if let Some(value) = value {
        return Ok(value.clone());
    }

    let mut console = Console::stdio();
    match console.read_line(prompt).await? {
        Some(line) if !line.is_empty() => Ok(line),
        _ => bail!("No input given"),
    }
}

/// Topic workflow: explain, then summarize.
async fn run_workflow(
    service: DynCompletionService,
    config: &Config,
    args: &WorkflowArgs,
) -> Result<i32> {
    let topic = arg_or_prompt(&args.topic, "Enter a topic: ").await?;

    let pipeline = Pipeline::topic_explainer(config.model.name.clone())
        .with_temperature(config.model.temperature)
        .with_timeout(config.timeout())
        .with_retry(config.retry_policy());

    println!("\n🔬 Running workflow for: {}", topic);
    let output = pipeline.run(&*service, &topic).await?;

    if let Some(content) = output.get("generate_content") {
        println!("\n📝 Generated Content:\n{}", content);
    }
    if let Some(summary) = output.final_text() {
        println!("\n📌 Summary:\n{}", summary);
    }
    Ok(0)
}

/// Hybrid app: decide, execute, summarize.
async fn run_hybrid(
    service: DynCompletionService,
    config: &Config,
    args: &HybridArgs,
) -> Result<i32> {
    let input = arg_or_prompt(
        &args.input,
        "What topic or task would you like assistance with? ",
    )
    .await?;

    let app = HybridApp::new(config.model.name.clone())
        .with_temperature(config.model.temperature)
        .with_decision_temperature(config.model.decision_temperature)
        .with_timeout(config.timeout())
        .with_retry(config.retry_policy());

    println!("\n🤔 Deciding the best action...");
    let outcome = app.run(&*service, &input).await?;

    println!("   Action: {}", outcome.decision.action);
    if let Some(ref e) = outcome.decision.error {
        println!("   ⚠️  {}", e);
    }

    println!("\n📝 Result:\n{}", outcome.result);
    if let Some(ref summary) = outcome.summary {
        println!("\n📌 Summary:\n{}", summary);
    }

    println!("\n✅ Workflow complete.");
    Ok(0)
}

/// Interactive autonomous agent loop.
async fn run_agent(service: DynCompletionService, config: &Config) -> Result<i32> {
    let agent = AutonomousAgent::new(config.model.name.clone())
        .with_temperature(config.model.temperature)
        .with_timeout(config.timeout())
        .with_retry(config.retry_policy());

    println!("🤖 Ask me anything. Type 'exit', 'quit' or 'bye' to leave.");
    let mut console = Console::stdio();
    while let Some(input) = console.next_input("You: ").await? {
        match agent.respond(&*service, &input).await {
            Ok(reply) => console.say(&format!("Agent: {}", reply.text())).await?,
            Err(e) => eprintln!("❌ {}", e),
        }
    }

    println!("Agent: Goodbye!");
    Ok(0)
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is installed, so problems are reported on stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}. Using defaults.", CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}
