//! Focus Arbiter (focus-arbiter) - Main entry point
//!
//! Runs a scripted focus scenario against a fresh arbiter and prints the
//! transcript of results and delivered notifications.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use focus_arbiter::config::{ArbiterConfig, ConfigOverrides};
use focus_arbiter::scenario::Scenario;

/// Command-line arguments for focus-arbiter
#[derive(Parser, Debug)]
#[command(name = "focus-arbiter")]
#[command(about = "Run audio focus scenarios against the focus arbiter")]
#[command(version)]
struct Args {
    /// Scenario file (TOML)
    #[arg(short, long, env = "FOCUS_SCENARIO")]
    scenario: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long, env = "FOCUS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(short, long)]
    log_level: Option<String>,

    /// How long to wait for listeners to drain (milliseconds)
    #[arg(long)]
    flush_timeout_ms: Option<u64>,

    /// Print the transcript as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let config = ArbiterConfig::load(
        args.config.as_deref(),
        ConfigOverrides {
            log_level: args.log_level.clone(),
            flush_timeout_ms: args.flush_timeout_ms,
        },
    )
    .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "focus_arbiter={level},focus_common={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Running scenario {}", args.scenario.display());

    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("Failed to load scenario {}", args.scenario.display()))?;

    let transcript = scenario.run(&config).context("Scenario run failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&transcript)
            .context("Failed to serialize transcript")?;
        println!("{}", json);
    } else {
        print!("{}", transcript.render_text());
    }

    info!(
        "Scenario complete: {} steps ({} granted), {} notifications",
        transcript.steps.len(),
        transcript.granted_steps(),
        transcript.deliveries.len()
    );
    Ok(())
}
