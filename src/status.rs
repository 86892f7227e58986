// System status display: store stats, detector config, action table.

use std::path::Path;

use anyhow::Result;

use crate::config::Config;
use crate::db::BanStore;
use crate::scoring::DetectorConfig;

/// Display system status to the terminal.
pub fn show(store: &dyn BanStore, config: &Config, detector: &DetectorConfig) -> Result<()> {
    let file_size = std::fs::metadata(&config.db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", config.db_path, file_size);

    let records = store.list()?;
    println!("Ban records: {}", records.len());
    if let Some(latest) = records.first() {
        println!(
            "  Latest: {} ({}, {})",
            latest.identity, latest.category, latest.recorded_at
        );
    }

    match config.resolve_detector_config_path() {
        Some(path) => println!("Detector config: {}", path.display()),
        None => println!("Detector config: built-in defaults"),
    }
    println!("Exempt users: {}", detector.exempt.len());
    println!(
        "Custom suspicious patterns: {}",
        detector.matcher.custom_pattern_count()
    );

    let mode = if config.dry_run {
        "dry run"
    } else if config.bot_token.is_empty() {
        "live (DISCORD_BOT_TOKEN not set)"
    } else {
        "live"
    };
    println!("Platform: {mode}");
    println!(
        "Alerts: {}",
        if config.webhook_url.is_some() {
            "webhook"
        } else {
            "log only"
        }
    );

    crate::output::terminal::display_policy(&detector.policy);

    Ok(())
}

/// Whether the database file exists yet.
pub fn is_initialized(db_path: &str) -> bool {
    Path::new(db_path).exists()
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
