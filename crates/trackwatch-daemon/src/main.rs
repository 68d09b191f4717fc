//! TrackWatch daemon - live dashboard in the terminal
//!
//! Loads the configuration, builds the REST client and runs one
//! [`DashboardSession`] that keeps the tracking list current over the push
//! channel, falling back to polling while push is unavailable. The session
//! stops on SIGTERM/SIGINT.
//!
//! `--show <ID>` prints the detail statistics and hourly series for one
//! tracking and exits instead.

mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use trackwatch_api::{client::DashboardClient, provider::DashboardApiProvider};
use trackwatch_core::config::Config;
use trackwatch_core::domain::{StatsFilter, TrackingId};
use trackwatch_core::ports::IDashboardApi;
use trackwatch_sync::feed::NotificationQueue;
use trackwatch_sync::session::DashboardSession;

use crate::console::ConsoleSink;

/// TrackWatch - live tracking dashboard
#[derive(Parser, Debug)]
#[command(name = "trackwatchd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override server.base_url
    #[arg(long)]
    base_url: Option<String>,

    /// Override server.push_url
    #[arg(long)]
    push_url: Option<String>,

    /// Which trackings the list shows: all, active or inactive
    #[arg(long, default_value_t = StatsFilter::Active)]
    filter: StatsFilter,

    /// Print statistics for one tracking and exit
    #[arg(long, value_name = "ID")]
    show: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

// ============================================================================
// Configuration / logging
// ============================================================================

/// Log level from `-v`; zero keeps the configured level
fn log_level(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(base_url) = &args.base_url {
        config.server.base_url = base_url.clone();
    }
    if let Some(push_url) = &args.push_url {
        config.server.push_url = Some(push_url.clone());
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };
    apply_overrides(&mut config, args);

    let errors = config.validate();
    if !errors.is_empty() {
        let listed: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid configuration:\n  {}", listed.join("\n  "));
    }
    Ok(config)
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}

// ============================================================================
// Signal handling
// ============================================================================

/// Cancels `token` on SIGINT or SIGTERM
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Commands
// ============================================================================

async fn show_tracking(api: &dyn IDashboardApi, id: &str) -> Result<()> {
    let id = TrackingId::new(id)?;
    let (stats, hourly) = tokio::try_join!(api.fetch_tracking_stats(&id), api.fetch_hourly(&id))?;

    println!("Tracking {id}");
    println!(
        "  cumulative {} of {} ({}%)",
        stats.cumulative, stats.total, stats.percent_complete
    );
    println!(
        "  day {} of {} ({} remaining){}",
        stats.days_elapsed,
        stats.days_total,
        stats.days_remaining,
        if stats.is_complete { ", complete" } else { "" }
    );
    println!("  hourly:");
    for bucket in hourly {
        println!(
            "    {}  {}",
            bucket.beijing_date.format("%Y-%m-%d %H:00"),
            bucket.count
        );
    }
    Ok(())
}

async fn run_dashboard(config: &Config, api: Arc<dyn IDashboardApi>, filter: StatsFilter) {
    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let sink = Arc::new(ConsoleSink::new(
        std::io::stdout(),
        NotificationQueue::from_config(&config.notifications),
        filter,
    ));
    let mut session = DashboardSession::with_shutdown(config, api, sink, shutdown);

    if let Err(e) = session.run().await {
        warn!(error = %e, "Dashboard session ended with error");
    }
    session.dispose().await;
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_tracing(&log_level(args.verbose, &config.logging.level), args.json);

    let client = DashboardClient::new(&config.server).context("Failed to build HTTP client")?;
    let api: Arc<dyn IDashboardApi> = Arc::new(DashboardApiProvider::new(client));

    if let Some(id) = &args.show {
        return show_tracking(api.as_ref(), id).await;
    }

    info!(
        base_url = %config.server.base_url,
        push = config.server.push_url.is_some(),
        filter = %args.filter,
        "TrackWatch daemon starting"
    );
    run_dashboard(&config, api, args.filter).await;
    info!("TrackWatch daemon shut down gracefully");

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
