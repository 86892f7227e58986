// Policy table: what to do about each trust category.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::category::TrustCategory;

/// Action to take on a joining member, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    None,
    Log,
    Kick,
    Ban,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::None => "none",
            Action::Log => "log",
            Action::Kick => "kick",
            Action::Ban => "ban",
        }
    }

    /// Ban and kick need a call to the platform.
    pub fn is_enforcement(&self) -> bool {
        matches!(self, Action::Kick | Action::Ban)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action used for a category the table doesn't mention.
pub const FALLBACK_ACTION: Action = Action::Log;

/// Category → action mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyTable {
    actions: BTreeMap<TrustCategory, Action>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            actions: BTreeMap::from([
                (TrustCategory::MegaSuspicious, Action::Ban),
                (TrustCategory::HighlySuspicious, Action::Ban),
                (TrustCategory::Suspicious, Action::Kick),
                (TrustCategory::Newbie, Action::Log),
                (TrustCategory::Normal, Action::None),
                (TrustCategory::Trusted, Action::None),
                (TrustCategory::HighlyTrusted, Action::None),
            ]),
        }
    }
}

impl PolicyTable {
    pub fn from_entries(entries: impl IntoIterator<Item = (TrustCategory, Action)>) -> Self {
        Self {
            actions: entries.into_iter().collect(),
        }
    }

    /// Resolve a category, falling back to `log` when unmapped.
    pub fn resolve(&self, category: TrustCategory) -> Action {
        self.actions
            .get(&category)
            .copied()
            .unwrap_or(FALLBACK_ACTION)
    }

    /// Categories the table leaves to the fallback.
    pub fn unmapped(&self) -> Vec<TrustCategory> {
        TrustCategory::ALL
            .iter()
            .filter(|c| !self.actions.contains_key(c))
            .copied()
            .collect()
    }

    /// Categories that trigger something other than `none`, most severe first.
    pub fn active_entries(&self) -> Vec<(TrustCategory, Action)> {
        TrustCategory::ALL
            .iter()
            .rev()
            .map(|c| (*c, self.resolve(*c)))
            .filter(|(_, a)| *a != Action::None)
            .collect()
    }
}

/// Resolve a category against a table.
pub fn resolve_action(category: TrustCategory, table: &PolicyTable) -> Action {
    table.resolve(category)
}
