// Discord webhook reporter: posts one embed per detection.
//
// The embed layout follows the old bot's alert: identity block, weighted
// score breakdown, reasons, action taken, then avatar/servers/trust level.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use super::traits::{AuditSink, DetectionReport};
use crate::platform::retry::{with_retry, RateLimited};
use crate::scoring::breakdown::Factor;

const FOOTER: &str = "Alt Account Protection System";

/// Embed field values are capped at 1024 characters.
const MAX_FIELD_CHARS: usize = 1000;

pub struct WebhookAuditSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookAuditSink {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    async fn post_once(&self, payload: &Value) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .context("Webhook request failed")?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|b| b.get("retry_after").and_then(Value::as_f64))
                .filter(|s| s.is_finite() && *s >= 0.0)
                .map(Duration::from_secs_f64);
            return Err(RateLimited { retry_after }.into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Webhook returned {}: {}", status, body);
        }
        Ok(())
    }
}

#[async_trait]
impl AuditSink for WebhookAuditSink {
    async fn report_detection(&self, report: &DetectionReport) -> Result<()> {
        let payload = json!({ "embeds": [build_embed(report)] });
        with_retry(|| self.post_once(&payload)).await
    }
}

fn field(name: &str, value: String, inline: bool) -> Value {
    json!({
        "name": name,
        "value": crate::output::truncate_chars(&value, MAX_FIELD_CHARS),
        "inline": inline,
    })
}

/// Monospace table of weighted factor contributions and the total.
pub fn format_breakdown(report: &DetectionReport) -> Option<String> {
    let breakdown = &report.result.breakdown;
    if breakdown.is_empty() {
        return None;
    }
    let mut text = String::from("```\n");
    for factor in Factor::ALL {
        if breakdown.per_factor.contains_key(&factor) {
            let label = format!("{}:", factor.label());
            text.push_str(&format!("{label:<13}{:.1}\n", breakdown.weighted(factor)));
        }
    }
    text.push_str(&format!("{}\n", "─".repeat(19)));
    text.push_str(&format!("{:<13}{:.1}\n", "TOTAL:", report.result.total_score));
    text.push_str("```");
    Some(text)
}

/// Build the alert embed. Pure, so the layout is testable without HTTP.
pub fn build_embed(report: &DetectionReport) -> Value {
    let result = &report.result;
    let snapshot = &report.snapshot;
    let category = result.category;
    let user = format!("{} ({})", snapshot.username, snapshot.identity);

    let created = snapshot
        .created_at()
        .map(|t| format!("<t:{}:R>", t.timestamp()))
        .unwrap_or_else(|| "Unknown".to_string());
    let age = snapshot
        .account_age_days(report.reported_at)
        .map(|d| format!("{d:.1} days"))
        .unwrap_or_else(|| "Unknown".to_string());

    let mut fields = vec![
        field("👤 User", user, true),
        field("📅 Account Created", created, true),
        field("⏰ Account Age", age, true),
    ];
    if let Some(table) = format_breakdown(report) {
        fields.push(field("📊 Trust Score Breakdown", table, false));
    }
    if !result.reasons.is_empty() {
        fields.push(field("⚠️ Detection Reasons", result.reasons.join("\n"), false));
    }
    fields.push(field("🔨 Action Taken", report.action_taken.to_string(), false));

    let avatar = if snapshot.has_custom_avatar {
        "✅ Custom"
    } else {
        "❌ Default"
    };
    let mutual = snapshot
        .mutual_guild_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    fields.push(field("🖼️ Avatar", avatar.to_string(), true));
    fields.push(field("🌐 Mutual Servers", mutual, true));
    fields.push(field("🎯 Trust Level", format!("`{category}`"), true));

    json!({
        "color": category.color(),
        "title": format!(
            "{} Alt Account Detection: {}",
            category.emoji(),
            category.as_str().to_uppercase()
        ),
        "description": format!("**{}** - {}", snapshot.username, category.description()),
        "fields": fields,
        "timestamp": report.reported_at.to_rfc3339(),
        "footer": { "text": FOOTER },
    })
}
