// Account snapshot: the immutable view of a joining member.
//
// Built fresh for every join event by whatever bridges the chat platform to
// us (the `watch` command reads these as JSON lines). Optional fields have
// documented defaults so the scorers never see a "missing" value.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Discord's snowflake epoch (2015-01-01T00:00:00Z) in milliseconds.
pub const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Presence status as reported by the gateway.
///
/// An absent presence deserializes to `None` on the snapshot and is scored
/// the same as `Offline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Idle,
    Dnd,
    Invisible,
    Offline,
    #[serde(other)]
    Unknown,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Idle => "idle",
            PresenceStatus::Dnd => "dnd",
            PresenceStatus::Invisible => "invisible",
            PresenceStatus::Offline => "offline",
            PresenceStatus::Unknown => "unknown",
        }
    }
}

/// Kind of rich-presence activity. Only the first four count as real activity.
///
/// Deserializes from either a name (`"game"`) or a raw Discord activity
/// type number (`0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "ActivityRepr")]
pub enum ActivityKind {
    Game,
    Listening,
    Watching,
    Competing,
    Other,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ActivityRepr {
    Type(u64),
    Name(String),
}

impl From<ActivityRepr> for ActivityKind {
    fn from(repr: ActivityRepr) -> Self {
        match repr {
            ActivityRepr::Type(kind) => ActivityKind::from_discord_type(kind),
            ActivityRepr::Name(name) => ActivityKind::from_name(&name),
        }
    }
}

impl ActivityKind {
    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "game" | "playing" => ActivityKind::Game,
            "listening" => ActivityKind::Listening,
            "watching" => ActivityKind::Watching,
            "competing" => ActivityKind::Competing,
            _ => ActivityKind::Other,
        }
    }

    /// Map a Discord activity type number to a kind.
    /// Streaming (1) and custom status (4) are not recognized activity.
    pub fn from_discord_type(kind: u64) -> Self {
        match kind {
            0 => ActivityKind::Game,
            2 => ActivityKind::Listening,
            3 => ActivityKind::Watching,
            5 => ActivityKind::Competing,
            _ => ActivityKind::Other,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ActivityKind::Other)
    }
}

/// Profile badges. Unknown badge names deserialize to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    Staff,
    Partner,
    CertifiedModerator,
    HypesquadEvents,
    HypesquadBravery,
    HypesquadBrilliance,
    HypesquadBalance,
    EarlySupporter,
    BugHunterLevel1,
    BugHunterLevel2,
    ActiveDeveloper,
    #[serde(other)]
    Other,
}

/// Discord public user-flag bits and the badge each one grants.
const PUBLIC_FLAG_BADGES: &[(u64, Badge)] = &[
    (1 << 0, Badge::Staff),
    (1 << 1, Badge::Partner),
    (1 << 2, Badge::HypesquadEvents),
    (1 << 3, Badge::BugHunterLevel1),
    (1 << 6, Badge::HypesquadBravery),
    (1 << 7, Badge::HypesquadBrilliance),
    (1 << 8, Badge::HypesquadBalance),
    (1 << 9, Badge::EarlySupporter),
    (1 << 14, Badge::BugHunterLevel2),
    (1 << 18, Badge::CertifiedModerator),
    (1 << 22, Badge::ActiveDeveloper),
];

impl Badge {
    /// Decode a Discord `public_flags` bitfield into a badge set.
    ///
    /// Bits we don't score (verified bot, team user, ...) collapse into a
    /// single `Other` so the account still counts as "has badges".
    pub fn from_public_flags(flags: u64) -> BTreeSet<Badge> {
        let mut badges = BTreeSet::new();
        let mut known_bits = 0u64;
        for &(bit, badge) in PUBLIC_FLAG_BADGES {
            known_bits |= bit;
            if flags & bit != 0 {
                badges.insert(badge);
            }
        }
        if flags & !known_bits != 0 {
            badges.insert(Badge::Other);
        }
        badges
    }
}

/// What kind of avatar the account has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarKind {
    Default,
    Static,
    Animated,
}

impl AvatarKind {
    /// Classify a Discord avatar hash. Animated avatars are prefixed `a_`.
    pub fn from_hash(hash: Option<&str>) -> Self {
        match hash {
            None | Some("") => AvatarKind::Default,
            Some(h) if h.starts_with("a_") => AvatarKind::Animated,
            Some(_) => AvatarKind::Static,
        }
    }
}

/// Immutable per-join snapshot of the attributes the scorers read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Stable user identifier (a Discord snowflake in practice).
    pub identity: String,
    /// When absent, derived from the identity snowflake.
    #[serde(default)]
    pub account_created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub presence_status: Option<PresenceStatus>,
    #[serde(default)]
    pub activities: BTreeSet<ActivityKind>,
    pub username: String,
    /// Server nickname or global name. Falls back to the username when absent.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub badges: BTreeSet<Badge>,
    /// Raw `public_flags` bitfield, merged into `badges` when present.
    #[serde(default)]
    pub public_flags: Option<u64>,
    /// Discord avatar hash. When present it decides the avatar kind and the
    /// two flags below are ignored.
    #[serde(default, alias = "avatar")]
    pub avatar_hash: Option<String>,
    #[serde(default)]
    pub has_custom_avatar: bool,
    #[serde(default)]
    pub avatar_is_animated: bool,
    #[serde(default)]
    pub has_banner: bool,
    #[serde(default)]
    pub boosted_since: Option<DateTime<Utc>>,
    /// Servers shared with the bot, this one included. `None` means unknown.
    #[serde(default)]
    pub mutual_guild_count: Option<u32>,
}

impl AccountSnapshot {
    /// A bare snapshot with only identity and username set. Everything else
    /// takes its absent default.
    pub fn new(identity: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            account_created_at: None,
            presence_status: None,
            activities: BTreeSet::new(),
            username: username.into(),
            display_name: None,
            badges: BTreeSet::new(),
            public_flags: None,
            avatar_hash: None,
            has_custom_avatar: false,
            avatar_is_animated: false,
            has_banner: false,
            boosted_since: None,
            mutual_guild_count: None,
        }
    }

    /// Creation time, falling back to the snowflake timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.account_created_at
            .or_else(|| snowflake_timestamp(&self.identity))
    }

    /// Fractional account age in days at `now`, if the creation time is known.
    pub fn account_age_days(&self, now: DateTime<Utc>) -> Option<f64> {
        self.created_at()
            .map(|created| (now - created).num_milliseconds() as f64 / 86_400_000.0)
    }

    /// Presence with the absent case folded into `Offline`.
    pub fn effective_status(&self) -> PresenceStatus {
        self.presence_status.unwrap_or(PresenceStatus::Offline)
    }

    /// Badge set merged with anything decoded from `public_flags`.
    pub fn effective_badges(&self) -> BTreeSet<Badge> {
        let mut badges = self.badges.clone();
        if let Some(flags) = self.public_flags {
            badges.extend(Badge::from_public_flags(flags));
        }
        badges
    }

    /// Display name as members see it; the username when none is set.
    pub fn effective_display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    pub fn avatar_kind(&self) -> AvatarKind {
        if let Some(hash) = &self.avatar_hash {
            return AvatarKind::from_hash(Some(hash));
        }
        match (self.has_custom_avatar, self.avatar_is_animated) {
            (false, _) => AvatarKind::Default,
            (true, true) => AvatarKind::Animated,
            (true, false) => AvatarKind::Static,
        }
    }

    pub fn is_booster(&self) -> bool {
        self.boosted_since.is_some()
    }
}

/// Extract the creation timestamp embedded in a Discord snowflake.
pub fn snowflake_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let raw: u64 = id.parse().ok()?;
    let millis = i64::try_from(raw >> 22).ok()? + DISCORD_EPOCH_MS;
    Utc.timestamp_millis_opt(millis).single()
}
