// Moderation platform: where ban and kick decisions are carried out.
//
// The ModerationPlatform trait is the seam. DiscordPlatform calls the REST
// API with 429 retry; DryRunPlatform records and logs without side effects.

pub mod discord;
pub mod dry_run;
pub mod retry;
pub mod traits;

pub use discord::DiscordPlatform;
pub use dry_run::DryRunPlatform;
pub use traits::ModerationPlatform;
