// Factor scorers: one pure function per signal.
//
// Each scorer returns an unweighted contribution: positive means more
// suspicious, negative means more trustworthy. None of them can fail; absent
// inputs take the branch the rule defines for absence.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex_lite::Regex;

use super::snapshot::{ActivityKind, AvatarKind, Badge, PresenceStatus};

/// Words that show up in throwaway and secondary account names.
pub const SUSPICIOUS_WORDS: &[&str] = &[
    "alt",
    "backup",
    "secondary",
    "temp",
    "test",
    "fake",
    "new",
    "bot",
    "throwaway",
    "spare",
    "extra",
    "second",
    "third",
    "another",
];

/// Matches text against the built-in word list plus operator-supplied patterns.
#[derive(Debug, Clone, Default)]
pub struct TextMatcher {
    custom: Vec<Regex>,
}

impl TextMatcher {
    /// Compile the custom patterns. A pattern that fails to compile is a
    /// configuration error.
    pub fn new(patterns: &[String]) -> Result<Self> {
        let custom = patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("Invalid suspicious pattern: {p}")))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { custom })
    }

    pub fn custom_pattern_count(&self) -> usize {
        self.custom.len()
    }

    /// True if the text contains a suspicious word (case-insensitive) or
    /// matches any custom pattern. Stops at the first hit.
    pub fn is_suspicious(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        SUSPICIOUS_WORDS.iter().any(|w| lower.contains(w))
            || self.custom.iter().any(|re| re.is_match(text))
    }
}

/// Account age step function.
///
/// An unknown creation time scores as the oldest band.
pub fn age_score(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(created) = created_at else {
        return -4.0;
    };
    let days = (now - created).num_milliseconds() as f64 / 86_400_000.0;
    match days {
        d if d < 1.0 => 10.0,
        d if d < 3.0 => 8.0,
        d if d < 7.0 => 6.0,
        d if d < 14.0 => 4.0,
        d if d < 30.0 => 2.0,
        d if d < 90.0 => 0.0,
        d if d < 365.0 => -2.0,
        _ => -4.0,
    }
}

pub fn status_score(status: Option<PresenceStatus>) -> f64 {
    match status {
        None | Some(PresenceStatus::Offline) => 2.0,
        Some(PresenceStatus::Invisible) => 3.0,
        Some(PresenceStatus::Idle) => 1.0,
        Some(PresenceStatus::Dnd) => 0.0,
        Some(PresenceStatus::Online) => -1.0,
        Some(PresenceStatus::Unknown) => 0.0,
    }
}

/// No activity at all is suspicious; each recognized kind earns -1, capped at -3.
pub fn activity_score(activities: &BTreeSet<ActivityKind>) -> f64 {
    if activities.is_empty() {
        return 2.0;
    }
    let recognized = activities.iter().filter(|a| a.is_recognized()).count();
    if recognized == 0 {
        return 0.0;
    }
    -(recognized.min(3) as f64)
}

pub fn username_score(username: &str, matcher: &TextMatcher) -> f64 {
    let mut score = 0.0;

    if matcher.is_suspicious(username) {
        score += 4.0;
    }
    if longest_digit_run(username) >= 4 {
        score += 3.0;
    }
    if is_short_prefix_with_digits(username) {
        score += 4.0;
    }
    if username.chars().filter(|c| !c.is_ascii_alphanumeric()).count() > 3 {
        score += 2.0;
    }

    score
}

/// Scores the name members see. Callers pass the username when no display
/// name is set, which earns the same-as-username point.
pub fn displayname_score(display_name: &str, username: &str, matcher: &TextMatcher) -> f64 {
    let mut score = 0.0;

    if matcher.is_suspicious(display_name) {
        score += 3.0;
    }

    let letters = display_name.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let caps = display_name.chars().filter(|c| c.is_ascii_uppercase()).count();
    let caps_fraction = if letters > 0 {
        caps as f64 / letters as f64
    } else {
        0.0
    };
    if caps_fraction > 0.7 {
        score -= 2.0;
    }
    if caps_fraction < 0.1 && letters > 3 {
        score += 1.0;
    }

    let symbols = display_name
        .chars()
        .filter(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace())
        .count();
    if symbols > 4 {
        score += 2.0;
    }

    if display_name == username {
        score += 1.0;
    }

    score
}

fn badge_value(badge: Badge) -> f64 {
    match badge {
        Badge::Staff => -10.0,
        Badge::Partner => -8.0,
        Badge::CertifiedModerator => -6.0,
        Badge::HypesquadEvents
        | Badge::HypesquadBravery
        | Badge::HypesquadBrilliance
        | Badge::HypesquadBalance => -2.0,
        Badge::EarlySupporter => -3.0,
        Badge::BugHunterLevel1 => -2.0,
        Badge::BugHunterLevel2 => -4.0,
        Badge::ActiveDeveloper => -3.0,
        Badge::Other => 0.0,
    }
}

/// No badges is suspicious; trust-signaling badges subtract, floored at -10.
pub fn badges_score(badges: &BTreeSet<Badge>) -> f64 {
    if badges.is_empty() {
        return 4.0;
    }
    let total: f64 = badges.iter().map(|b| badge_value(*b)).sum();
    total.max(-10.0)
}

pub fn booster_score(is_booster: bool) -> f64 {
    if is_booster {
        -4.0
    } else {
        2.0
    }
}

pub fn avatar_score(avatar: AvatarKind) -> f64 {
    match avatar {
        AvatarKind::Default => 3.0,
        AvatarKind::Animated => -2.0,
        AvatarKind::Static => -1.0,
    }
}

pub fn banner_score(has_banner: bool) -> f64 {
    if has_banner {
        -2.0
    } else {
        1.0
    }
}

/// Prior-detection and server-overlap adjustment.
///
/// A recorded prior detection adds 10. The mutual-guild rules stack: one
/// server (only this one) adds 2, more than 5 subtracts 2, more than 10
/// subtracts another 3. An unknown count contributes nothing.
pub fn prior_ban_score(prior_ban: bool, mutual_guilds: Option<u32>) -> f64 {
    let mut score = 0.0;
    if prior_ban {
        score += 10.0;
    }
    match mutual_guilds {
        Some(1) => score += 2.0,
        Some(n) if n > 5 => {
            score -= 2.0;
            if n > 10 {
                score -= 3.0;
            }
        }
        _ => {}
    }
    score
}

fn longest_digit_run(text: &str) -> usize {
    let mut best = 0;
    let mut run = 0;
    for c in text.chars() {
        if c.is_ascii_digit() {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

/// "ab123" style names: 1-3 ASCII letters followed only by digits.
fn is_short_prefix_with_digits(text: &str) -> bool {
    let prefix_len = text.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    if !(1..=3).contains(&prefix_len) {
        return false;
    }
    let rest = &text[prefix_len..];
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}
