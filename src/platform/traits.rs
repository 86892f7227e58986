// Moderation platform trait: the outbound ban/kick surface.
//
// DiscordPlatform talks to the REST API; DryRunPlatform only logs. The
// handler holds an Arc<dyn ModerationPlatform> and never knows which.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ModerationPlatform: Send + Sync {
    /// Ban a member from a guild.
    async fn ban(&self, guild_id: &str, identity: &str, reason: &str) -> Result<()>;

    /// Remove a member from a guild without banning.
    async fn kick(&self, guild_id: &str, identity: &str, reason: &str) -> Result<()>;
}
