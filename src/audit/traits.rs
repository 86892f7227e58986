// Audit sink trait and the report it receives.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::scoring::evaluate::EvaluationResult;
use crate::scoring::policy::Action;
use crate::scoring::snapshot::AccountSnapshot;

/// What actually happened after a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionTaken {
    None,
    Logged,
    Banned,
    Kicked,
    BannedPreviouslyDetected,
    /// The platform rejected the call; the record (if any) stands.
    Failed { action: Action, error: String },
}

impl ActionTaken {
    pub fn is_failure(&self) -> bool {
        matches!(self, ActionTaken::Failed { .. })
    }
}

impl fmt::Display for ActionTaken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionTaken::None => write!(f, "No action"),
            ActionTaken::Logged => write!(f, "📝 Logged (No action taken)"),
            ActionTaken::Banned => write!(f, "🔨 Banned"),
            ActionTaken::Kicked => write!(f, "👢 Kicked"),
            ActionTaken::BannedPreviouslyDetected => write!(f, "🔨 Banned (Previously detected)"),
            ActionTaken::Failed { action, error } => {
                write!(f, "⚠️ {} failed: {}", action.as_str(), error)
            }
        }
    }
}

/// Everything the audit channel gets for one join.
#[derive(Debug, Clone)]
pub struct DetectionReport {
    pub guild_id: String,
    pub snapshot: AccountSnapshot,
    pub result: EvaluationResult,
    pub action_taken: ActionTaken,
    pub reported_at: DateTime<Utc>,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn report_detection(&self, report: &DetectionReport) -> Result<()>;
}
