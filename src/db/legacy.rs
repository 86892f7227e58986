// Legacy ban list: the `banned-alts.json` file the older bot kept.
//
// Shape: a JSON array of `[userId, {reason, timestamp, ...}]` pairs. The
// older bot wrote either `category`/`score` or `severity`, so both are
// accepted. Export writes the same shape back, with every BanRecord field.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::BanRecord;
use crate::scoring::category::TrustCategory;

#[derive(Debug, Serialize, Deserialize)]
struct LegacyEntry {
    reason: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default, skip_serializing)]
    severity: Option<f64>,
}

/// Parse a legacy ban list.
///
/// Entries without a category were recorded by the severity-based bot, which
/// only stored confirmed alts, so they come in as mega-suspicious. A missing
/// or unparseable timestamp falls back to `now`.
pub fn parse_legacy_ban_list(json: &str, now: DateTime<Utc>) -> Result<Vec<BanRecord>> {
    let entries: Vec<(String, LegacyEntry)> =
        serde_json::from_str(json).context("Failed to parse legacy ban list")?;

    entries
        .into_iter()
        .map(|(identity, entry)| {
            let category = match entry.category.as_deref() {
                Some(c) => c
                    .parse::<TrustCategory>()
                    .with_context(|| format!("Bad category for {identity}"))?,
                None => TrustCategory::MegaSuspicious,
            };
            let recorded_at = entry
                .timestamp
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or(now);
            Ok(BanRecord {
                identity,
                reason: entry.reason,
                category,
                score: entry.score.or(entry.severity).unwrap_or(0.0),
                recorded_at,
            })
        })
        .collect()
}

/// Serialize records into the legacy shape.
pub fn export_ban_list(records: &[BanRecord]) -> Result<String> {
    let entries: Vec<(&str, LegacyEntry)> = records
        .iter()
        .map(|r| {
            (
                r.identity.as_str(),
                LegacyEntry {
                    reason: r.reason.clone(),
                    timestamp: Some(r.recorded_at.to_rfc3339()),
                    category: Some(r.category.to_string()),
                    score: Some(r.score),
                    severity: None,
                },
            )
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}
