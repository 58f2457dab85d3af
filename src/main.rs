//! Order-Replay main entry point
//!
//! This is the command-line interface for the order history harvester.

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use order_replay::capture::RecordedSession;
use order_replay::config::{load_config_with_hash, Config};
use order_replay::harvest::{HarvestReport, Harvester};
use order_replay::output::{
    print_summary, HarvestSummary, JsonFileSink, COMBINED_ORDER_DATA, ORDER_HISTORY_DATA,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Order-Replay: order and invoice history by request replay
///
/// Order-Replay captures the authenticated order history request from a
/// recorded browser session, then fetches the order history and every
/// order's invoices over plain HTTP behind a rate limiter.
#[derive(Parser, Debug)]
#[command(name = "order-replay")]
#[command(version = "1.0.0")]
#[command(about = "Order and invoice history by request replay", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Recorded browser exchanges (JSON) to capture the request template from
    #[arg(long, value_name = "FILE", required_unless_present = "dry_run")]
    capture: Option<PathBuf>,

    /// Override the number of orders to fetch
    #[arg(long, value_name = "N")]
    order_count: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be fetched without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(order_count) = cli.order_count {
        anyhow::ensure!(order_count > 0, "--order-count must be at least 1");
        config.fetch.order_count = order_count;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let capture = cli
        .capture
        .context("--capture is required unless --dry-run is given")?;
    handle_harvest(config, capture).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("order_replay=info,warn"),
            1 => EnvFilter::new("order_replay=debug,info"),
            2 => EnvFilter::new("order_replay=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the configuration and the planned run
fn handle_dry_run(config: &Config) {
    println!("=== Order-Replay Dry Run ===\n");

    println!("Rate Limit:");
    println!(
        "  {} request(s) per {}ms ({})",
        config.rate_limit.rps,
        config.rate_limit.time_unit_ms,
        if config.rate_limit.uniform_distribution {
            "uniform"
        } else {
            "burst"
        }
    );

    println!("\nFetch:");
    println!("  Orders: {}", config.fetch.order_count);
    println!("  Attempts per order: {}", config.fetch.attempts_limit);
    println!("  Request timeout: {}s", config.fetch.request_timeout_secs);

    println!("\nEndpoints:");
    println!("  Browser page: {}", config.endpoints.browser_url);
    println!("  Order history: {}", config.endpoints.order_history);
    println!("  Invoice overview: {}", config.endpoints.invoice_overview);
    if config.endpoints.fetch_invoice_details {
        println!("  Invoice detail: {}", config.endpoints.invoice_detail);
    }
    if config.endpoints.fetch_aggregations {
        println!("  Order aggregations: {}", config.endpoints.order_aggregations);
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest: capture, history, per-order data, output
async fn handle_harvest(config: Config, capture: PathBuf) -> anyhow::Result<()> {
    let session = RecordedSession::from_file(&capture)
        .with_context(|| format!("failed to load capture {}", capture.display()))?;
    tracing::info!(
        "Loaded {} recorded exchange(s) from {}",
        session.exchange_count(),
        capture.display()
    );

    let order_count = config.fetch.order_count;
    let sink = JsonFileSink::new(&config.output.directory, Local::now(), order_count, 2);
    let harvester = Harvester::new(config)?;

    let template = harvester.capture_template(&session).await?;

    tracing::info!("Getting order history data...");
    let orders = harvester.fetch_history(&template).await?;

    // Written before the per-order phase so a later failure keeps the history
    let history_path = sink.write(1, ORDER_HISTORY_DATA, &orders)?;

    tracing::info!("Getting invoice data...");
    let outcome = harvester.fetch_order_data(&template, &orders).await?;
    let combined_path = sink.write(2, COMBINED_ORDER_DATA, &outcome.combined)?;

    let report = HarvestReport {
        orders,
        combined: outcome.combined,
        dropped: outcome.dropped,
        skipped: outcome.skipped,
        attempts: outcome.attempts,
    };

    let mut summary = HarvestSummary::from_report(&report, order_count);
    summary.files_written = vec![history_path, combined_path];
    print_summary(&summary);

    Ok(())
}
