// Trust categories: seven ordered suspicion tiers and the thresholds that
// carve the score axis into them.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MEGA_SUSPICIOUS: f64 = 30.0;
pub const DEFAULT_HIGHLY_SUSPICIOUS: f64 = 20.0;
pub const DEFAULT_SUSPICIOUS: f64 = 10.0;
pub const DEFAULT_NEWBIE: f64 = 5.0;
pub const DEFAULT_NORMAL: f64 = -5.0;
pub const DEFAULT_TRUSTED: f64 = -15.0;

/// Trust category, ordered from least to most suspicious.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrustCategory {
    HighlyTrusted,
    Trusted,
    Normal,
    Newbie,
    Suspicious,
    HighlySuspicious,
    MegaSuspicious,
}

impl TrustCategory {
    pub const ALL: [TrustCategory; 7] = [
        TrustCategory::HighlyTrusted,
        TrustCategory::Trusted,
        TrustCategory::Normal,
        TrustCategory::Newbie,
        TrustCategory::Suspicious,
        TrustCategory::HighlySuspicious,
        TrustCategory::MegaSuspicious,
    ];

    /// Classify with the default thresholds.
    pub fn from_score(score: f64) -> Self {
        CategoryThresholds::default().classify(score)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrustCategory::HighlyTrusted => "highly-trusted",
            TrustCategory::Trusted => "trusted",
            TrustCategory::Normal => "normal",
            TrustCategory::Newbie => "newbie",
            TrustCategory::Suspicious => "suspicious",
            TrustCategory::HighlySuspicious => "highly-suspicious",
            TrustCategory::MegaSuspicious => "mega-suspicious",
        }
    }

    /// Newbie and above get an alert.
    pub fn is_flagged(&self) -> bool {
        *self >= TrustCategory::Newbie
    }

    /// Highly-suspicious and above are remembered as known alts.
    pub fn records_ban(&self) -> bool {
        *self >= TrustCategory::HighlySuspicious
    }

    /// Embed color for alerts.
    pub fn color(&self) -> u32 {
        match self {
            TrustCategory::HighlyTrusted => 0x00FF00,
            TrustCategory::Trusted => 0x00AA00,
            TrustCategory::Normal => 0x0099FF,
            TrustCategory::Newbie => 0xFFAA00,
            TrustCategory::Suspicious => 0xFF6600,
            TrustCategory::HighlySuspicious => 0xFF0000,
            TrustCategory::MegaSuspicious => 0x8B0000,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            TrustCategory::HighlyTrusted | TrustCategory::Trusted => "✅",
            TrustCategory::Normal => "🔵",
            TrustCategory::Newbie => "🟠",
            TrustCategory::Suspicious => "⚠️",
            TrustCategory::HighlySuspicious => "🔴",
            TrustCategory::MegaSuspicious => "🚫",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TrustCategory::HighlyTrusted => "Highly trusted account - Could apply for staff",
            TrustCategory::Trusted => "Trusted account - Very reliable",
            TrustCategory::Normal => "Normal account - Nothing suspicious",
            TrustCategory::Newbie => "New to Discord - Monitor carefully",
            TrustCategory::Suspicious => "Suspicious account - Possible alt",
            TrustCategory::HighlySuspicious => "Highly suspicious - Almost certainly an alt",
            TrustCategory::MegaSuspicious => "Meets all alt account criteria",
        }
    }
}

impl fmt::Display for TrustCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TrustCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        TrustCategory::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Unknown trust category: {s}"))
    }
}

/// Lower bound (inclusive) of each band except highly-trusted, which takes
/// everything below `trusted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CategoryThresholds {
    pub mega_suspicious: f64,
    pub highly_suspicious: f64,
    pub suspicious: f64,
    pub newbie: f64,
    pub normal: f64,
    pub trusted: f64,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self {
            mega_suspicious: DEFAULT_MEGA_SUSPICIOUS,
            highly_suspicious: DEFAULT_HIGHLY_SUSPICIOUS,
            suspicious: DEFAULT_SUSPICIOUS,
            newbie: DEFAULT_NEWBIE,
            normal: DEFAULT_NORMAL,
            trusted: DEFAULT_TRUSTED,
        }
    }
}

impl CategoryThresholds {
    /// Bands from most to least suspicious.
    fn bands(&self) -> [(f64, TrustCategory); 6] {
        [
            (self.mega_suspicious, TrustCategory::MegaSuspicious),
            (self.highly_suspicious, TrustCategory::HighlySuspicious),
            (self.suspicious, TrustCategory::Suspicious),
            (self.newbie, TrustCategory::Newbie),
            (self.normal, TrustCategory::Normal),
            (self.trusted, TrustCategory::Trusted),
        ]
    }

    /// Map a total score to its category. Boundary values land in the more
    /// suspicious band. NaN fails every comparison and lands in highly-trusted.
    pub fn classify(&self, score: f64) -> TrustCategory {
        self.bands()
            .iter()
            .find(|(threshold, _)| score >= *threshold)
            .map(|(_, category)| *category)
            .unwrap_or(TrustCategory::HighlyTrusted)
    }

    /// Thresholds must be finite and strictly decreasing.
    pub fn validate(&self) -> Result<()> {
        let bands = self.bands();
        for (threshold, category) in &bands {
            if !threshold.is_finite() {
                anyhow::bail!("Threshold for {category} must be finite, got {threshold}");
            }
        }
        for pair in bands.windows(2) {
            let (upper, upper_cat) = pair[0];
            let (lower, lower_cat) = pair[1];
            if lower >= upper {
                anyhow::bail!(
                    "Threshold for {lower_cat} ({lower}) must be below {upper_cat} ({upper})"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_ascending_suspicion() {
        assert!(TrustCategory::HighlyTrusted < TrustCategory::Trusted);
        assert!(TrustCategory::HighlySuspicious < TrustCategory::MegaSuspicious);
    }

    #[test]
    fn test_from_str_round_trip() {
        for c in TrustCategory::ALL {
            assert_eq!(c.as_str().parse::<TrustCategory>().unwrap(), c);
        }
        assert!("very-sus".parse::<TrustCategory>().is_err());
    }

    #[test]
    fn test_non_monotonic_thresholds_rejected() {
        let t = CategoryThresholds {
            suspicious: 25.0,
            ..Default::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_infinite_threshold_rejected() {
        let t = CategoryThresholds {
            mega_suspicious: f64::INFINITY,
            ..Default::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_custom_thresholds_classify() {
        let t = CategoryThresholds {
            mega_suspicious: 50.0,
            ..Default::default()
        };
        assert_eq!(t.classify(40.0), TrustCategory::HighlySuspicious);
        assert_eq!(t.classify(50.0), TrustCategory::MegaSuspicious);
    }

    #[test]
    fn test_serde_kebab_case() {
        let json = serde_json::to_string(&TrustCategory::MegaSuspicious).unwrap();
        assert_eq!(json, "\"mega-suspicious\"");
    }
}
