// Discord REST implementation of ModerationPlatform.
//
// Plain reqwest against the v10 API; no gateway connection. The audit-log
// reason travels in the X-Audit-Log-Reason header, which Discord expects
// URL-encoded.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::retry::{with_retry, RateLimited};
use super::traits::ModerationPlatform;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Discord caps audit-log reasons at 512 characters.
const MAX_REASON_CHARS: usize = 512;

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: Option<f64>,
}

pub struct DiscordPlatform {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl DiscordPlatform {
    /// Build a client with a bot token. Every request is bounded by `timeout`.
    pub fn new(token: &str, timeout: Duration) -> Result<Self> {
        Self::with_base_url(token, timeout, DEFAULT_API_BASE)
    }

    pub fn with_base_url(token: &str, timeout: Duration, base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("DiscordBot (https://github.com/altwatch/altwatch, 0.1)")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// One request, no retries. A 429 becomes a RateLimited error.
    async fn send_once(
        &self,
        method: Method,
        path: &str,
        reason: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.token))
            .header("X-Audit-Log-Reason", encode_reason(reason));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Discord request to {path} failed"))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .json::<RateLimitBody>()
                .await
                .ok()
                .and_then(|b| b.retry_after)
                .filter(|s| s.is_finite() && *s >= 0.0)
                .map(Duration::from_secs_f64);
            return Err(RateLimited { retry_after }.into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Discord API returned {}: {}", status, body);
        }
        Ok(())
    }
}

/// Truncate to Discord's limit, then percent-encode for the header.
fn encode_reason(reason: &str) -> String {
    // leave room for the "..." truncate_chars appends
    let truncated = crate::output::truncate_chars(reason, MAX_REASON_CHARS - 3);
    utf8_percent_encode(&truncated, NON_ALPHANUMERIC).to_string()
}

#[async_trait]
impl ModerationPlatform for DiscordPlatform {
    async fn ban(&self, guild_id: &str, identity: &str, reason: &str) -> Result<()> {
        let path = format!("/guilds/{guild_id}/bans/{identity}");
        let body = json!({ "delete_message_seconds": 0 });
        with_retry(|| self.send_once(Method::PUT, &path, reason, Some(&body))).await?;
        info!(guild_id, identity, "Banned member");
        Ok(())
    }

    async fn kick(&self, guild_id: &str, identity: &str, reason: &str) -> Result<()> {
        let path = format!("/guilds/{guild_id}/members/{identity}");
        with_retry(|| self.send_once(Method::DELETE, &path, reason, None)).await?;
        info!(guild_id, identity, "Kicked member");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_reason() {
        assert_eq!(
            encode_reason("Alt detected - Trust level: suspicious"),
            "Alt%20detected%20%2D%20Trust%20level%3A%20suspicious"
        );
    }

    #[test]
    fn test_encode_reason_truncates() {
        let long = "a".repeat(600);
        let encoded = encode_reason(&long);
        assert_eq!(encoded.matches('a').count(), MAX_REASON_CHARS - 3);
        assert!(encoded.ends_with("%2E%2E%2E"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let p = DiscordPlatform::with_base_url("t", Duration::from_secs(1), "http://localhost/api/").unwrap();
        assert_eq!(p.base_url, "http://localhost/api");
    }
}
