// Score breakdown: per-factor contributions and their weighted sum.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::weights::{WeightConfig, WeightKey};

/// Scored factors, in declaration order. The order drives summation and the
/// order reasons are listed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Age,
    Status,
    Activity,
    Username,
    Displayname,
    Flags,
    Booster,
    Pfp,
    Banner,
    Custom,
}

impl Factor {
    pub const ALL: [Factor; 10] = [
        Factor::Age,
        Factor::Status,
        Factor::Activity,
        Factor::Username,
        Factor::Displayname,
        Factor::Flags,
        Factor::Booster,
        Factor::Pfp,
        Factor::Banner,
        Factor::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Age => "age",
            Factor::Status => "status",
            Factor::Activity => "activity",
            Factor::Username => "username",
            Factor::Displayname => "displayname",
            Factor::Flags => "flags",
            Factor::Booster => "booster",
            Factor::Pfp => "pfp",
            Factor::Banner => "banner",
            Factor::Custom => "custom",
        }
    }

    /// Human label used in alerts and terminal output.
    pub fn label(&self) -> &'static str {
        match self {
            Factor::Age => "Age",
            Factor::Status => "Status",
            Factor::Activity => "Activity",
            Factor::Username => "Username",
            Factor::Displayname => "Displayname",
            Factor::Flags => "Badges",
            Factor::Booster => "Booster",
            Factor::Pfp => "Avatar",
            Factor::Banner => "Banner",
            Factor::Custom => "History",
        }
    }

    /// The weight that scales this factor. Symbol and caps sub-rules are
    /// folded into the username/displayname scores, so those factors use the
    /// "words" weights.
    pub fn weight_key(&self) -> WeightKey {
        match self {
            Factor::Age => WeightKey::Age,
            Factor::Status => WeightKey::Status,
            Factor::Activity => WeightKey::Activity,
            Factor::Username => WeightKey::UsernameWords,
            Factor::Displayname => WeightKey::DisplaynameWords,
            Factor::Flags => WeightKey::Flags,
            Factor::Booster => WeightKey::Booster,
            Factor::Pfp => WeightKey::Pfp,
            Factor::Banner => WeightKey::Banner,
            Factor::Custom => WeightKey::Custom,
        }
    }
}

/// Unweighted per-factor scores, the weights applied, and the weighted total.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub per_factor: BTreeMap<Factor, f64>,
    pub weights: BTreeMap<Factor, f64>,
    pub total: f64,
}

impl ScoreBreakdown {
    /// Unweighted score for a factor (0.0 if it wasn't scored).
    pub fn raw(&self, factor: Factor) -> f64 {
        self.per_factor.get(&factor).copied().unwrap_or(0.0)
    }

    /// Weighted contribution of a factor to the total.
    pub fn weighted(&self, factor: Factor) -> f64 {
        self.raw(factor) * self.weights.get(&factor).copied().unwrap_or(1.0)
    }

    pub fn is_empty(&self) -> bool {
        self.per_factor.is_empty()
    }
}

/// Weight each factor and sum in declaration order.
pub fn aggregate(per_factor: BTreeMap<Factor, f64>, weights: &WeightConfig) -> ScoreBreakdown {
    let applied: BTreeMap<Factor, f64> = per_factor
        .keys()
        .map(|f| (*f, weights.get(f.weight_key())))
        .collect();

    let total = per_factor
        .iter()
        .map(|(f, raw)| raw * applied[f])
        .sum();

    ScoreBreakdown {
        per_factor,
        weights: applied,
        total,
    }
}
