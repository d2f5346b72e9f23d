//! hatchery: allocate tanks and track breeding cycles from the command line
//!
//! Talks to the farm backend's REST API. Reads `hatchery.toml` if present;
//! flags and `HATCHERY_*` environment variables override the file.

mod commands;

use clap::Parser;
use hatchery_core::{CascadePolicy, Hatchery, HatcheryConfig, HatcheryError};
use tracing::{debug, info};

use commands::Command;

#[derive(Parser)]
#[command(name = "hatchery")]
#[command(about = "Tank allocation and breeding-lifecycle tracker")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "hatchery.toml")]
    config: String,

    /// Backend API root (overrides config file)
    #[arg(long, env = "HATCHERY_BASE_URL")]
    base_url: Option<String>,

    /// Bearer token for the backend (overrides config file)
    #[arg(long, env = "HATCHERY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// What to do when part of a cascade delete fails
    /// (abort-and-report, best-effort-and-report)
    #[arg(long)]
    cascade_policy: Option<CascadePolicy>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hatchery=info".parse()?)
                .add_directive("hatchery_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = HatcheryConfig::load(&cli.config)?;

    // Apply CLI overrides
    if let Some(base_url) = cli.base_url {
        config.backend.base_url = base_url;
    }
    if let Some(api_key) = cli.api_key {
        config.backend.api_key = Some(api_key);
    }
    if let Some(policy) = cli.cascade_policy {
        config.allocation.cascade_policy = policy;
    }

    info!(backend = %config.backend.base_url, "Using farm backend");
    debug!(policy = %config.allocation.cascade_policy, "Cascade policy");

    let hatchery = Hatchery::from_config(&config)?;

    match commands::execute(&hatchery, config.poller_config(), cli.command).await {
        Ok(output) => {
            if !output.is_null() {
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            Ok(())
        }
        Err(e) => {
            report_failure(&e)?;
            std::process::exit(1);
        }
    }
}

/// Print the structured part of a failure on stdout, the message on stderr.
fn report_failure(error: &anyhow::Error) -> anyhow::Result<()> {
    match error.downcast_ref::<HatcheryError>() {
        Some(HatcheryError::Validation(errors)) => {
            println!("{}", serde_json::to_string_pretty(errors)?);
        }
        Some(HatcheryError::TankUnavailable { refreshed, .. }) => {
            println!("{}", serde_json::to_string_pretty(refreshed)?);
        }
        Some(HatcheryError::PartialCascade(report)) => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        _ => {}
    }
    eprintln!("Error: {}", error);
    Ok(())
}
