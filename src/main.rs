use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use altwatch::audit::{AuditSink, LogAuditSink, WebhookAuditSink};
use altwatch::config::Config;
use altwatch::db::{self, BanStore, MemoryBanStore};
use altwatch::handler::{JoinEvent, JoinHandler, PendingDispatches};
use altwatch::output::terminal;
use altwatch::platform::{DiscordPlatform, DryRunPlatform, ModerationPlatform};
use altwatch::scoring::{self, AccountSnapshot};

/// Altwatch: alt-account detection for Discord servers.
///
/// Scores joining members on account age, profile signals and ban history,
/// then bans, kicks or logs them according to the configured trust levels.
#[derive(Parser)]
#[command(name = "altwatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the ban-record database
    Init,

    /// Evaluate one account snapshot (JSON file) without acting on it
    Check {
        /// Path to the snapshot JSON
        snapshot: PathBuf,

        /// Skip the ban-history lookup and always score
        #[arg(long)]
        ignore_history: bool,
    },

    /// Handle join events read as JSON lines from stdin
    Watch {
        /// Keep ban records in memory only (lost on exit)
        #[arg(long)]
        memory: bool,
    },

    /// List recorded ban records, newest first
    Bans {
        /// Print as JSON in the banned-alts.json format
        #[arg(long)]
        json: bool,
    },

    /// Import a legacy banned-alts.json file
    Import {
        /// Path to banned-alts.json
        path: PathBuf,
    },

    /// Show store stats and configured actions
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("altwatch=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing altwatch database...");
            let config = Config::load()?;
            let count = init_store(&config)?.count()?;
            println!("Database initialized at: {}", config.db_path);
            println!("Ban records: {count}");
            println!("\nNext: put your detector settings in a JSON file and point");
            println!("ALTWATCH_DETECTOR_CONFIG at it (or use the built-in defaults).");
        }

        Commands::Check {
            snapshot,
            ignore_history,
        } => {
            let config = Config::load()?;
            let detector = config.load_detector()?;
            let json = std::fs::read_to_string(&snapshot)
                .with_context(|| format!("Failed to read snapshot {}", snapshot.display()))?;
            let snapshot: AccountSnapshot =
                serde_json::from_str(&json).context("Failed to parse account snapshot")?;

            let now = Utc::now();
            let result = if ignore_history {
                scoring::assess(&snapshot, &detector, false, now)
            } else if altwatch::status::is_initialized(&config.db_path) {
                let store = open_store(&config)?;
                scoring::evaluate(&snapshot, &detector, store.as_ref(), now)
            } else {
                warn!("No database yet, skipping the ban-history lookup");
                scoring::evaluate(&snapshot, &detector, &MemoryBanStore::new(), now)
            };
            terminal::display_evaluation(&result);
        }

        Commands::Watch { memory } => {
            let config = Config::load()?;
            let detector = Arc::new(config.load_detector()?);
            let store: Arc<dyn BanStore> = if memory {
                warn!("Using in-memory ban records; they will be lost on exit");
                Arc::new(MemoryBanStore::new())
            } else {
                init_store(&config)?
            };
            let platform = build_platform(&config)?;
            let audit = build_audit(&config)?;

            let handler = JoinHandler::new(detector, store, platform, audit);
            watch_stdin(&handler).await?;
        }

        Commands::Bans { json } => {
            let config = Config::load()?;
            let store = open_store(&config)?;
            let records = store.list()?;
            if json {
                println!("{}", db::legacy::export_ban_list(&records)?);
            } else {
                terminal::display_ban_list(&records);
            }
        }

        Commands::Import { path } => {
            let config = Config::load()?;
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let records = db::legacy::parse_legacy_ban_list(&json, Utc::now())?;
            let store = init_store(&config)?;

            let pb = ProgressBar::new(records.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  Importing [{bar:30}] {pos}/{len}")
                    .context("Invalid progress bar template")?,
            );

            let mut imported = 0usize;
            let mut skipped = 0usize;
            for record in &records {
                if store.insert_if_absent(record)? {
                    imported += 1;
                } else {
                    skipped += 1;
                }
                pb.inc(1);
            }
            pb.finish_and_clear();

            println!("  {} {imported} ban records imported", "✓".green());
            if skipped > 0 {
                println!(
                    "  {} {skipped} already recorded, kept the existing record",
                    "-".dimmed()
                );
            }
        }

        Commands::Status => {
            let config = Config::load()?;
            if !altwatch::status::is_initialized(&config.db_path) {
                println!("Database: not initialized");
                println!("\nRun `altwatch init` to set up the database.");
                return Ok(());
            }
            let store = open_store(&config)?;
            let detector = config.load_detector()?;
            altwatch::status::show(store.as_ref(), &config, &detector)?;
        }
    }

    Ok(())
}

/// Read JSON-lines join events until stdin closes or Ctrl-C, then wait for
/// outstanding actions and reports to finish.
async fn watch_stdin(handler: &JoinHandler) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = PendingDispatches::new();
    let mut handled = 0usize;

    info!("Watching stdin for join events");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let event: JoinEvent = match serde_json::from_str(line) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed join event");
                        continue;
                    }
                };
                let detection = handler.on_member_join(event);
                handled += 1;
                match detection.dispatch {
                    Some(task) => pending.push(task).await,
                    None => pending.reap().await,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, finishing outstanding actions");
                break;
            }
        }
    }

    let tally = pending.finish().await;
    info!(
        handled,
        dispatched = tally.completed,
        failures = tally.failures,
        audit_failures = tally.audit_failures,
        "Stopped watching"
    );
    Ok(())
}

fn build_platform(config: &Config) -> Result<Arc<dyn ModerationPlatform>> {
    if config.dry_run {
        info!("Dry run: bans and kicks will only be logged");
        return Ok(Arc::new(DryRunPlatform::new()));
    }
    config.require_bot_token()?;
    Ok(Arc::new(DiscordPlatform::new(
        &config.bot_token,
        config.action_timeout,
    )?))
}

fn build_audit(config: &Config) -> Result<Arc<dyn AuditSink>> {
    match &config.webhook_url {
        Some(url) => Ok(Arc::new(WebhookAuditSink::new(url, config.action_timeout)?)),
        None => {
            info!("ALTWATCH_WEBHOOK_URL not set, detections go to the log only");
            Ok(Arc::new(LogAuditSink))
        }
    }
}

#[cfg(feature = "sqlite")]
fn open_store(config: &Config) -> Result<Arc<dyn BanStore>> {
    db::open_sqlite(&config.db_path)
}

#[cfg(feature = "sqlite")]
fn init_store(config: &Config) -> Result<Arc<dyn BanStore>> {
    db::initialize_sqlite(&config.db_path)
}

#[cfg(not(feature = "sqlite"))]
fn open_store(_config: &Config) -> Result<Arc<dyn BanStore>> {
    anyhow::bail!(
        "Built without the 'sqlite' feature, so there is no durable store.\n\
         Rebuild with: cargo build --features sqlite"
    )
}

#[cfg(not(feature = "sqlite"))]
fn init_store(config: &Config) -> Result<Arc<dyn BanStore>> {
    open_store(config)
}
