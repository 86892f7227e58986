// Reason synthesis: turn a breakdown into short explanations for moderators.
//
// A factor earns a reason when its *weighted* contribution is strictly above
// its materiality threshold. Factors without a threshold never produce one.
// Reasons come out in factor declaration order, not by size.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::breakdown::{Factor, ScoreBreakdown};
use super::snapshot::PresenceStatus;

/// Per-factor materiality thresholds, compared against weighted scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReasonThresholds {
    thresholds: BTreeMap<Factor, f64>,
}

impl Default for ReasonThresholds {
    fn default() -> Self {
        Self {
            thresholds: BTreeMap::from([
                (Factor::Age, 5.0),
                (Factor::Status, 2.0),
                (Factor::Username, 3.0),
                (Factor::Displayname, 2.0),
                (Factor::Flags, 3.0),
                (Factor::Booster, 1.0),
                (Factor::Pfp, 2.0),
            ]),
        }
    }
}

impl ReasonThresholds {
    pub fn from_entries(entries: impl IntoIterator<Item = (Factor, f64)>) -> Self {
        Self {
            thresholds: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, factor: Factor) -> Option<f64> {
        self.thresholds.get(&factor).copied()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (factor, value) in &self.thresholds {
            if !value.is_finite() {
                anyhow::bail!(
                    "Reason threshold for '{}' must be finite, got {value}",
                    factor.as_str()
                );
            }
        }
        Ok(())
    }
}

/// Facts about the member that some reasons quote back.
#[derive(Debug, Clone, Copy)]
pub struct ReasonContext {
    pub account_age_days: Option<f64>,
    pub status: PresenceStatus,
}

fn reason_text(factor: Factor, ctx: &ReasonContext) -> String {
    match factor {
        Factor::Age => match ctx.account_age_days {
            Some(days) => format!("New account ({days:.1} days old)"),
            None => "New account".to_string(),
        },
        Factor::Status => format!("Suspicious status ({})", ctx.status.as_str()),
        Factor::Activity => "No visible activity".to_string(),
        Factor::Username => "Suspicious username pattern".to_string(),
        Factor::Displayname => "Suspicious display name".to_string(),
        Factor::Flags => "No profile badges".to_string(),
        Factor::Booster => "Not a server booster".to_string(),
        Factor::Pfp => "Default avatar".to_string(),
        Factor::Banner => "No profile banner".to_string(),
        Factor::Custom => "Few mutual servers or prior detection".to_string(),
    }
}

/// Explain which factors pushed the score up.
pub fn synthesize(
    breakdown: &ScoreBreakdown,
    thresholds: &ReasonThresholds,
    ctx: &ReasonContext,
) -> Vec<String> {
    Factor::ALL
        .iter()
        .filter(|f| breakdown.per_factor.contains_key(f))
        .filter(|f| {
            thresholds
                .get(**f)
                .is_some_and(|limit| breakdown.weighted(**f) > limit)
        })
        .map(|f| reason_text(*f, ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::breakdown::aggregate;
    use crate::scoring::weights::WeightConfig;

    fn ctx() -> ReasonContext {
        ReasonContext {
            account_age_days: Some(0.5),
            status: PresenceStatus::Invisible,
        }
    }

    #[test]
    fn test_threshold_is_strict_and_weighted() {
        // age raw 4 * weight 2 = 8 > 5; pfp raw 1 * 1.5 = 1.5, not > 2
        let raw = BTreeMap::from([(Factor::Age, 4.0), (Factor::Pfp, 1.0)]);
        let b = aggregate(raw, &WeightConfig::default());
        let reasons = synthesize(&b, &ReasonThresholds::default(), &ctx());
        assert_eq!(reasons, vec!["New account (0.5 days old)".to_string()]);
    }

    #[test]
    fn test_exactly_at_threshold_is_not_material() {
        // booster raw 0.5 * 2 = 1.0, threshold is > 1
        let raw = BTreeMap::from([(Factor::Booster, 0.5)]);
        let b = aggregate(raw, &WeightConfig::default());
        assert!(synthesize(&b, &ReasonThresholds::default(), &ctx()).is_empty());
    }

    #[test]
    fn test_declaration_order_not_magnitude() {
        let raw = BTreeMap::from([(Factor::Pfp, 3.0), (Factor::Status, 3.0), (Factor::Age, 10.0)]);
        let b = aggregate(raw, &WeightConfig::default());
        let reasons = synthesize(&b, &ReasonThresholds::default(), &ctx());
        assert_eq!(
            reasons,
            vec![
                "New account (0.5 days old)".to_string(),
                "Suspicious status (invisible)".to_string(),
                "Default avatar".to_string(),
            ]
        );
    }
}
