//! Jito Bundler - command line entry point

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigLoader, ConfigValidator, LoggingConfig, TrackingStrategy};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use types::{BundleHandle, OutcomeKind, TipAccount, TrackingOutcome};

mod app;
mod input;

use app::Application;

#[derive(Debug, Parser)]
#[command(name = "jito-bundler", version, about = "Submit and track Jito block-engine bundles")]
struct Cli {
    /// Configuration file (falls back to CONFIG_PATH, then config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Select and print one tip account
    TipAccount,
    /// Print a fresh blockhash from the upstream RPC
    Blockhash,
    /// Submit a bundle and track it to a terminal outcome
    Send(SendArgs),
    /// Track a bundle that was already submitted
    Status {
        bundle_id: String,
        #[arg(long)]
        strategy: Option<TrackingStrategy>,
    },
    /// Validate the configuration and print the report
    CheckConfig,
    /// Write an example configuration file
    InitConfig { path: PathBuf },
}

#[derive(Debug, Args)]
struct SendArgs {
    /// File with one encoded signed transaction per line, in bundle order
    #[arg(short, long)]
    file: PathBuf,
    /// Zero-based index of the tip transaction
    #[arg(long, requires = "tip_account")]
    tip_index: Option<usize>,
    /// Tip account the tip transaction pays
    #[arg(long, requires = "tip_index")]
    tip_account: Option<TipAccount>,
    #[arg(long)]
    strategy: Option<TrackingStrategy>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let cli = Cli::parse();

    if let Command::InitConfig { path } = &cli.command {
        init_logging(&LoggingConfig::default())?;
        ConfigLoader::create_example(path)?;
        info!(path = %path.display(), "Example configuration written");
        return Ok(ExitCode::SUCCESS);
    }

    let config_path = cli
        .config
        .clone()
        .or_else(|| env::var("CONFIG_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let config = ConfigLoader::load(&config_path).context("Failed to load configuration")?;

    init_logging(&config.logging)?;
    if dotenv_loaded {
        info!("Loaded environment variables from .env file");
    }
    info!(
        "Starting Jito Bundler v{} with {}",
        env!("CARGO_PKG_VERSION"),
        config_path.display()
    );

    run(cli.command, config).await
}

async fn run(command: Command, config: Config) -> Result<ExitCode> {
    if let Command::CheckConfig = command {
        let report = ConfigValidator::validate(&config);
        println!("{}", serde_json::to_string_pretty(&report)?);
        info!("{}", report.summary());
        return Ok(if report.is_valid() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let app = Application::new(config.clone())?;

    match command {
        Command::TipAccount => {
            println!("{}", app.tip_account().await?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Blockhash => {
            println!("{}", serde_json::to_string_pretty(&app.blockhash().await?)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Send(args) => {
            let tip = args.tip_index.zip(args.tip_account);
            let transactions = input::read_transactions(&args.file, config.relay.encoding, tip)?;
            info!(count = transactions.len(), file = %args.file.display(), "Loaded transactions");

            let outcome = app.send(transactions, args.strategy).await?;
            report_outcome(&outcome)
        }
        Command::Status {
            bundle_id,
            strategy,
        } => {
            let outcome = app.status(&BundleHandle::new(bundle_id), strategy).await?;
            report_outcome(&outcome)
        }
        Command::CheckConfig | Command::InitConfig { .. } => Ok(ExitCode::SUCCESS),
    }
}

/// Print the outcome and map it to the process exit code
fn report_outcome(outcome: &TrackingOutcome) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(ExitCode::from(exit_status(outcome.kind())))
}

/// 0 landed, 1 failed, 2 unknown
fn exit_status(kind: OutcomeKind) -> u8 {
    match kind {
        OutcomeKind::Landed => 0,
        OutcomeKind::Failed => 1,
        OutcomeKind::TimedOut => 2,
    }
}

/// Initialize logging; RUST_LOG and LOG_FORMAT override the configuration
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout carries command output
    match log_format.as_str() {
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize pretty logging")?;
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
    }

    if logging.level == "trace" || logging.level == "debug" {
        warn!("Debug/trace logging enabled - may impact performance in production");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_send_requires_tip_pair() {
        let result = Cli::try_parse_from(["jito-bundler", "send", "--file", "txs", "--tip-index", "1"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from([
            "jito-bundler",
            "send",
            "--file",
            "txs",
            "--tip-index",
            "1",
            "--tip-account",
            "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5",
            "--strategy",
            "event",
        ])
        .unwrap();

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.tip_index, Some(1));
                assert_eq!(args.strategy, Some(TrackingStrategy::Event));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_exit_codes_follow_outcome() {
        let handle = BundleHandle::new("b1");
        let timed_out = TrackingOutcome::timed_out(handle.clone(), std::time::Duration::from_secs(1), None);
        let failed = TrackingOutcome::failed(handle, None);

        assert_eq!(exit_status(OutcomeKind::Landed), 0);
        assert_eq!(exit_status(failed.kind()), 1);
        assert_eq!(exit_status(timed_out.kind()), 2);
    }
}
