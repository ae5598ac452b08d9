//! AtCoder announcement watcher CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;

use announce_watch::{
    error::Result,
    models::{Config, Series},
    notify::{DiscordWebhookSink, LogSink, Sink},
    pipeline::{SeriesQuery, StartGate, Watcher},
    storage::{ChangeStore, FileChangeStore},
    utils::http::{Fetch, HttpFetcher},
};
use clap::{Parser, Subcommand};

/// announce-watch - AtCoder contest announcement watcher
#[derive(Parser, Debug)]
#[command(
    name = "announce-watch",
    version,
    about = "Watches the AtCoder home page for new contest announcements"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the watched page forever and notify on new announcements
    Watch,

    /// Run a single poll cycle and exit
    Check,

    /// Send the newest panel announcement now
    Latest {
        /// Prefix the message with a test marker
        #[arg(long)]
        test: bool,
    },

    /// Find and send the newest announcement of a contest series
    Series {
        #[arg(value_enum)]
        series: Series,
    },

    /// Validate configuration
    Validate,
}

/// Guards the poll loop for the lifetime of the process.
static POLL_GATE: StartGate = StartGate::new();

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Webhook sink when a webhook is configured, otherwise a logging sink.
fn build_sink(config: &Config) -> Result<Arc<dyn Sink>> {
    match &config.notify.webhook_url {
        Some(webhook) => Ok(Arc::new(DiscordWebhookSink::new(webhook, &config.http)?)),
        None => {
            log::warn!("No webhook configured; notifications will only be logged");
            Ok(Arc::new(LogSink))
        }
    }
}

fn build_watcher(config: &Config, fetcher: Arc<dyn Fetch>) -> Result<Watcher> {
    let state_path = config.state_path();
    log::info!("Change record: {}", state_path.display());
    let store: Arc<dyn ChangeStore> = Arc::new(FileChangeStore::new(state_path));
    Watcher::new(config, fetcher, store, build_sink(config)?)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = dotenvy::dotenv() {
        log::debug!("No .env file loaded: {}", e);
    }

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(&config.http)?);

    match cli.command {
        Command::Watch => {
            let watcher = build_watcher(&config, Arc::clone(&fetcher))?;

            if config.watch.send_latest_on_startup {
                log::info!("Sending the latest announcement before polling starts...");
                if let Err(e) = watcher.announce_latest(true).await {
                    log::error!("Startup announcement failed: {}", e);
                }
            }

            if !POLL_GATE.try_start() {
                log::warn!("Poll loop already started");
                return Ok(());
            }
            watcher.run().await;
        }

        Command::Check => {
            let watcher = build_watcher(&config, fetcher)?;
            let outcome = watcher.poll_once().await?;
            log::info!("Poll cycle: {}", outcome);
        }

        Command::Latest { test } => {
            let watcher = build_watcher(&config, fetcher)?;
            match watcher.announce_latest(test).await? {
                Some(content) => log::info!("Sent: {} <{}>", content.title, content.url),
                None => log::info!("Nothing sent"),
            }
        }

        Command::Series { series } => {
            let sink = build_sink(&config)?;
            let query = SeriesQuery::new(&config, fetcher)?;
            match query.announce(series, sink.as_ref()).await? {
                Some(content) => log::info!("Latest {}: {} <{}>", series, content.title, content.url),
                None => log::info!("No recent {} announcement", series),
            }
        }

        Command::Validate => {
            log::info!("✓ Config OK (watching {})", config.source.home_url);
            log::info!("All validations passed!");
        }
    }

    Ok(())
}
