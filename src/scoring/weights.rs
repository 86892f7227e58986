// Detector weights: one multiplier per named signal.
//
// Thirteen named weights, matching the operator-facing configuration. A key
// left out of a configured table weighs 1.0 (identity), and the loader warns
// about it so nobody mis-weights a factor by accident.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Weight applied when a key is absent from the table.
pub const MISSING_WEIGHT: f64 = 1.0;

/// Named weight keys. The camelCase aliases accept configs written for the
/// older bot (`ageWeight`, `pfpWeight`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightKey {
    #[serde(alias = "ageWeight")]
    Age,
    #[serde(alias = "statusWeight")]
    Status,
    #[serde(alias = "activityWeight")]
    Activity,
    #[serde(alias = "usernameWordsWeight")]
    UsernameWords,
    #[serde(alias = "usernameSymbolsWeight")]
    UsernameSymbols,
    #[serde(alias = "displaynameWordsWeight")]
    DisplaynameWords,
    #[serde(alias = "displaynameCapsWeight")]
    DisplaynameCaps,
    #[serde(alias = "displaynameSymbolsWeight")]
    DisplaynameSymbols,
    #[serde(alias = "flagsWeight")]
    Flags,
    #[serde(alias = "boosterWeight")]
    Booster,
    #[serde(alias = "pfpWeight")]
    Pfp,
    #[serde(alias = "bannerWeight")]
    Banner,
    #[serde(alias = "customWeight")]
    Custom,
}

impl WeightKey {
    pub const ALL: [WeightKey; 13] = [
        WeightKey::Age,
        WeightKey::Status,
        WeightKey::Activity,
        WeightKey::UsernameWords,
        WeightKey::UsernameSymbols,
        WeightKey::DisplaynameWords,
        WeightKey::DisplaynameCaps,
        WeightKey::DisplaynameSymbols,
        WeightKey::Flags,
        WeightKey::Booster,
        WeightKey::Pfp,
        WeightKey::Banner,
        WeightKey::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightKey::Age => "age",
            WeightKey::Status => "status",
            WeightKey::Activity => "activity",
            WeightKey::UsernameWords => "username_words",
            WeightKey::UsernameSymbols => "username_symbols",
            WeightKey::DisplaynameWords => "displayname_words",
            WeightKey::DisplaynameCaps => "displayname_caps",
            WeightKey::DisplaynameSymbols => "displayname_symbols",
            WeightKey::Flags => "flags",
            WeightKey::Booster => "booster",
            WeightKey::Pfp => "pfp",
            WeightKey::Banner => "banner",
            WeightKey::Custom => "custom",
        }
    }

    /// Default multiplier for this key.
    pub fn default_weight(&self) -> f64 {
        match self {
            WeightKey::Age => 2.0,
            WeightKey::Status => 1.0,
            WeightKey::Activity => 1.0,
            WeightKey::UsernameWords => 2.0,
            WeightKey::UsernameSymbols => 1.5,
            WeightKey::DisplaynameWords => 1.5,
            WeightKey::DisplaynameCaps => 0.5,
            WeightKey::DisplaynameSymbols => 1.0,
            WeightKey::Flags => 2.0,
            WeightKey::Booster => 2.0,
            WeightKey::Pfp => 1.5,
            WeightKey::Banner => 1.0,
            WeightKey::Custom => 1.0,
        }
    }
}

/// The weight table. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightConfig {
    weights: BTreeMap<WeightKey, f64>,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            weights: WeightKey::ALL
                .iter()
                .map(|k| (*k, k.default_weight()))
                .collect(),
        }
    }
}

impl WeightConfig {
    /// Build a table from explicit entries. Keys not given weigh 1.0.
    pub fn from_entries(entries: impl IntoIterator<Item = (WeightKey, f64)>) -> Self {
        Self {
            weights: entries.into_iter().collect(),
        }
    }

    /// Multiplier for a key, `MISSING_WEIGHT` if the table doesn't have it.
    pub fn get(&self, key: WeightKey) -> f64 {
        self.weights.get(&key).copied().unwrap_or(MISSING_WEIGHT)
    }

    /// Keys that will fall back to `MISSING_WEIGHT`.
    pub fn missing_keys(&self) -> Vec<WeightKey> {
        WeightKey::ALL
            .iter()
            .filter(|k| !self.weights.contains_key(k))
            .copied()
            .collect()
    }

    /// Reject NaN and infinite weights.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.weights {
            if !value.is_finite() {
                anyhow::bail!("Weight '{}' must be a finite number, got {value}", key.as_str());
            }
        }
        Ok(())
    }
}
