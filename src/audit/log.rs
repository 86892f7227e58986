// Log-only audit sink, used when no webhook is configured.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use super::traits::{AuditSink, DetectionReport};

pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn report_detection(&self, report: &DetectionReport) -> Result<()> {
        let result = &report.result;
        let reasons = result.reasons.join("; ");
        if report.action_taken.is_failure() {
            warn!(
                guild_id = %report.guild_id,
                identity = %result.identity,
                category = result.category.as_str(),
                score = result.total_score,
                action = %report.action_taken,
                reasons = %reasons,
                "Detection (action failed)"
            );
        } else {
            info!(
                guild_id = %report.guild_id,
                identity = %result.identity,
                category = result.category.as_str(),
                score = result.total_score,
                action = %report.action_taken,
                reasons = %reasons,
                "Detection"
            );
        }
        Ok(())
    }
}
