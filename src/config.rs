// Process configuration: environment variables and the detector config path.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::scoring::DetectorConfig;

/// Central configuration loaded from environment variables.
///
/// Secrets come from env vars only. The .env file is loaded at startup via
/// dotenvy, before this runs.
pub struct Config {
    pub db_path: String,
    /// Explicit detector config path (ALTWATCH_DETECTOR_CONFIG).
    pub detector_config_path: Option<PathBuf>,
    /// Bot token for live ban/kick calls. Empty means dry run only.
    pub bot_token: String,
    /// Discord webhook for detection alerts.
    pub webhook_url: Option<String>,
    pub dry_run: bool,
    /// Bound on each outbound platform or webhook call.
    pub action_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Nothing is required here; `require_bot_token` checks the token for
    /// commands that act on Discord.
    pub fn load() -> Result<Self> {
        let action_timeout = match env::var("ALTWATCH_ACTION_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    anyhow::anyhow!("ALTWATCH_ACTION_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'")
                })?;
                if secs == 0 {
                    anyhow::bail!("ALTWATCH_ACTION_TIMEOUT_SECS must be at least 1");
                }
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(10),
        };

        Ok(Self {
            db_path: env::var("ALTWATCH_DB_PATH").unwrap_or_else(|_| "./altwatch.db".to_string()),
            detector_config_path: env::var("ALTWATCH_DETECTOR_CONFIG")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            bot_token: env::var("DISCORD_BOT_TOKEN").unwrap_or_default(),
            webhook_url: env::var("ALTWATCH_WEBHOOK_URL")
                .ok()
                .filter(|u| !u.is_empty()),
            dry_run: env::var("ALTWATCH_DRY_RUN")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            action_timeout,
        })
    }

    /// Check that the bot token is configured.
    /// Call this before building a live Discord platform.
    pub fn require_bot_token(&self) -> Result<()> {
        if self.bot_token.is_empty() {
            anyhow::bail!(
                "DISCORD_BOT_TOKEN not set. Add it to your .env file,\n\
                 or set ALTWATCH_DRY_RUN=1 to evaluate without acting."
            );
        }
        Ok(())
    }

    /// Where the detector config should come from: the explicit path, then
    /// `<config dir>/altwatch/detector.json` if it exists.
    pub fn resolve_detector_config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.detector_config_path {
            return Some(path.clone());
        }
        default_detector_config_path().filter(|p| p.exists())
    }

    /// Load the detector config, falling back to built-in defaults when no
    /// file is configured. A configured file that fails to load is an error.
    pub fn load_detector(&self) -> Result<DetectorConfig> {
        match self.resolve_detector_config_path() {
            Some(path) => {
                info!(path = %path.display(), "Loading detector config");
                DetectorConfig::load(&path)
            }
            None => {
                info!("No detector config file, using defaults");
                Ok(DetectorConfig::default())
            }
        }
    }
}

/// `<config dir>/altwatch/detector.json`, e.g. ~/.config/altwatch on Linux.
pub fn default_detector_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("altwatch").join("detector.json"))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
