// Dry-run platform: logs what would have happened and succeeds.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::traits::ModerationPlatform;
use crate::scoring::policy::Action;

/// One action the dry-run platform was asked to take.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAction {
    pub action: Action,
    pub guild_id: String,
    pub identity: String,
    pub reason: String,
}

#[derive(Default)]
pub struct DryRunPlatform {
    planned: Mutex<Vec<PlannedAction>>,
}

impl DryRunPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything requested so far, oldest first.
    pub fn planned(&self) -> Vec<PlannedAction> {
        self.planned
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn plan(&self, action: Action, guild_id: &str, identity: &str, reason: &str) {
        info!(
            action = action.as_str(),
            guild_id, identity, reason, "Dry run: not calling Discord"
        );
        if let Ok(mut planned) = self.planned.lock() {
            planned.push(PlannedAction {
                action,
                guild_id: guild_id.to_string(),
                identity: identity.to_string(),
                reason: reason.to_string(),
            });
        }
    }
}

#[async_trait]
impl ModerationPlatform for DryRunPlatform {
    async fn ban(&self, guild_id: &str, identity: &str, reason: &str) -> Result<()> {
        self.plan(Action::Ban, guild_id, identity, reason);
        Ok(())
    }

    async fn kick(&self, guild_id: &str, identity: &str, reason: &str) -> Result<()> {
        self.plan(Action::Kick, guild_id, identity, reason);
        Ok(())
    }
}
