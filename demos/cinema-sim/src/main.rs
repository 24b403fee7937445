//! # cinema-sim
//!
//! Runs the cinema simulation until Ctrl-C (or `--duration` runs out), then
//! tears everything down once and prints the final counters.

use std::path::PathBuf;
use std::time::Duration;

use boxoffice::prelude::*;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "cinema-sim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file. Defaults to the built-in four-room cinema.
    #[arg(long, env = "BOXOFFICE_CONFIG")]
    config: Option<PathBuf>,

    /// Number of client actors (overrides the config file)
    #[arg(long)]
    clients: Option<usize>,

    /// Append-only log file (overrides the config file)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    duration: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CinemaConfig::load(path)?,
        None => CinemaConfig::default(),
    };
    if let Some(count) = cli.clients {
        config.clients.count = count;
    }
    if let Some(path) = cli.log_file {
        config.log_file = Some(path);
    }

    init_tracing(cli.verbose, config.log_file.as_deref())?;

    let cinema = Cinema::builder().config(config).start().await?;
    let teardown = cinema.teardown();

    match cli.duration {
        Some(secs) => tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("interrupted"),
            _ = tokio::time::sleep(Duration::from_secs(secs)) => info!(secs, "run time elapsed"),
        },
        None => {
            tokio::signal::ctrl_c().await?;
            info!("interrupted");
        }
    }

    teardown.run().await;
    let report = cinema.shutdown().await?;

    for (room_id, m) in &report.schedulers {
        info!(
            %room_id,
            cycles = m.cycles,
            starts = m.starts_delivered,
            ends = m.ends_delivered,
            dropped = m.dropped,
            "room summary"
        );
    }
    let d = report.dispatcher;
    info!(
        handled = d.handled,
        accepted = d.accepted,
        too_young = d.rejected_age,
        full = d.rejected_full,
        no_film = d.rejected_no_film,
        "dispatcher summary"
    );
    Ok(())
}

/// Stderr always; the log file too when it opens. A log file that cannot be
/// opened is reported and otherwise ignored.
fn init_tracing(verbose: bool, log_file: Option<&std::path::Path>) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let (sink, open_error) = match log_file.map(LogSink::open) {
        Some(Ok(sink)) => (Some(sink), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    let file_layer = sink.map(|sink| fmt::layer().with_ansi(false).with_writer(sink));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()?;

    if let (Some(path), Some(error)) = (log_file, open_error) {
        warn!(path = %path.display(), %error, "log file unavailable, logging to stderr only");
    }
    Ok(())
}
