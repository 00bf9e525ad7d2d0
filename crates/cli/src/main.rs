//! mergewise command-line tool.
//!
//! Lists the merge conflicts in a git working tree with an AI explanation of
//! each, and resolves them all with one strategy: keep the current side,
//! keep the incoming side, or merge both with a validated AI merge.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use mergewise_core::config::AppConfig;
use mergewise_core::conflict::{ConflictFormatter, ResolutionStrategy};
use mergewise_core::{OperationStatus, ResolutionEngine, ResolutionReport};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Resolve git merge conflicts, optionally with an AI-assisted merge.
#[derive(Parser, Debug)]
#[command(name = "mergewise", version, about = "List and resolve git merge conflicts")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply if it does not exist.
    #[arg(short, long, global = true, default_value = "mergewise.toml")]
    config: PathBuf,

    /// Repository work tree, overriding `repository.path` from the config.
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show every conflict with an AI analysis of both sides.
    Conflicts {
        /// Print the listing as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Resolve all conflicts with one strategy.
    Resolve {
        /// current, incoming, or both.
        strategy: String,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./mergewise.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", style::error(&format!("Error: {:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Init { ref output } => {
            let _guard = init_logging("warn", cli.verbose, None);
            cmd_init(output)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate => {
            let _guard = init_logging("warn", cli.verbose, None);
            cmd_validate(&cli.config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Conflicts { json } => {
            let config = load_config(&cli)?;
            let _guard = init_logging(
                &config.logging.level,
                cli.verbose,
                config.logging.directory.as_deref(),
            );
            let engine = build_engine(&config).await?;
            cmd_conflicts(&engine, json).await
        }
        Commands::Resolve {
            ref strategy,
            yes,
            json,
        } => {
            let config = load_config(&cli)?;
            let _guard = init_logging(
                &config.logging.level,
                cli.verbose,
                config.logging.directory.as_deref(),
            );
            let engine = build_engine(&config).await?;
            cmd_resolve(&engine, strategy, yes, json).await
        }
    }
}

/// Install the console subscriber and, if configured, a daily log file.
///
/// `RUST_LOG` takes precedence over `level`; `--verbose` over both.
fn init_logging(level: &str, verbose: bool, directory: Option<&Path>) -> Option<WorkerGuard> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);

    let (file, guard) = match directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mergewise.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    guard
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config =
        AppConfig::load_and_resolve(&cli.config).context("failed to load configuration")?;
    if let Some(repo) = &cli.repo {
        config.repository.path = repo.clone();
    }
    Ok(config)
}

async fn build_engine(config: &AppConfig) -> Result<ResolutionEngine> {
    ResolutionEngine::from_config(config).await.with_context(|| {
        format!(
            "failed to open repository at {}",
            config.repository.path.display()
        )
    })
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn exit_code(status: OperationStatus) -> ExitCode {
    match status {
        OperationStatus::Error => ExitCode::FAILURE,
        OperationStatus::Success | OperationStatus::Partial => ExitCode::SUCCESS,
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_conflicts(engine: &ResolutionEngine, json: bool) -> Result<ExitCode> {
    let progress = (!json).then(|| {
        spinner(format!(
            "Analyzing conflicts with {}...",
            engine.oracle_name()
        ))
    });
    let listing = engine.get_conflicts().await;
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&listing).context("failed to serialize listing")?
        );
    } else if listing.total_conflicts == 0 || listing.status == OperationStatus::Error {
        println!("{}", style::status_line(listing.status, &listing.message));
    } else {
        println!("{}", listing.message);
    }

    Ok(exit_code(listing.status))
}

async fn cmd_resolve(
    engine: &ResolutionEngine,
    strategy: &str,
    yes: bool,
    json: bool,
) -> Result<ExitCode> {
    // Invalid names are reported by the engine; only real runs are confirmed.
    let parsed = strategy.parse::<ResolutionStrategy>().ok();
    let resolving = parsed.filter(|s| *s != ResolutionStrategy::Interactive);

    if let Some(s) = resolving {
        if !yes && !json {
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Resolve ALL conflicts using '{}' ({})?",
                    s,
                    s.describe()
                ))
                .default(false)
                .interact()
                .context("failed to read confirmation")?;
            if !confirmed {
                println!("{}", style::warn("Resolution cancelled. No files were modified."));
                return Ok(ExitCode::SUCCESS);
            }
        }
    }

    let progress = match resolving {
        Some(s) if !json => {
            let message = if s.uses_oracle() {
                format!("Merging both versions with {}...", engine.oracle_name())
            } else {
                format!("Resolving conflicts with strategy: {}", s.as_str().to_uppercase())
            };
            Some(spinner(message))
        }
        _ => None,
    };
    let report = engine.resolve_conflicts(strategy).await;
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        );
    } else {
        print_report(&report);
    }

    Ok(exit_code(report.status))
}

fn print_report(report: &ResolutionReport) {
    if report.status == OperationStatus::Error || report.total_files == 0 {
        println!("{}", style::status_line(report.status, &report.message));
        return;
    }

    println!(
        "{}",
        ConflictFormatter::format_summary(
            report.total_files,
            report.total_conflicts,
            report.resolved,
            report.failures.len(),
        )
    );

    if !report.failures.is_empty() {
        println!();
        println!("{}", style::header("Failed Files"));
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["File", "Reason"]);
        for failure in &report.failures {
            table.add_row(vec![Cell::new(&failure.file), Cell::new(&failure.reason)]);
        }
        println!("{}", table);
    }

    let elapsed = report.completed_at - report.started_at;
    println!();
    println!(
        "{}",
        style::dim(&format!(
            "Finished in {:.1}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        ))
    );
}

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r#"# mergewise configuration

[repository]
path = "."

[oracle]
endpoint = "https://api-inference.huggingface.co/models"
model = "TinyLlama/TinyLlama-1.1B-Chat-v1.0"
token_env = "HF_TOKEN"
max_new_tokens = 1000
temperature = 0.1
top_k = 50
timeout_secs = 120

[merge]
max_retries = 2

[logging]
level = "warn"
# directory = "/var/log/mergewise"
"#;

    if output.exists() {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", output.display()))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;
        if !overwrite {
            println!(
                "{}",
                style::warn("Init cancelled. Existing file was not modified.")
            );
            return Ok(());
        }
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!(
            "Default configuration written to {}",
            output.display()
        ))
    );
    println!();
    println!("Next steps:");
    println!("  1. Set HF_TOKEN to a Hugging Face API token (only needed for 'both')");
    println!(
        "  2. Validate with: mergewise validate --config {}",
        output.display()
    );
    println!("  3. During a merge: mergewise conflicts, then mergewise resolve <strategy>");

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    println!("  [OK] Environment variable references processed");

    if let Err(e) = config.validate() {
        println!("  [FAIL] Validation error: {}", e);
        anyhow::bail!("configuration validation failed");
    }
    println!("  [OK] All required fields are valid");

    println!();
    println!("Configuration summary:");
    println!("  Repository   : {}", config.repository.path.display());
    println!("  Endpoint     : {}", config.oracle.endpoint);
    println!("  Model        : {}", config.oracle.model);
    println!(
        "  Token ({}) : {}",
        config.oracle.token_env,
        if config.oracle.token.is_some() {
            "set"
        } else {
            "NOT SET"
        }
    );
    println!("  Temperature  : {}", config.oracle.temperature);
    println!("  Timeout      : {}s", config.oracle.timeout_secs);
    println!("  Max retries  : {}", config.merge.max_retries);
    println!("  Log level    : {}", config.logging.level);
    println!();
    println!("{}", style::success("Configuration is valid."));

    Ok(())
}
