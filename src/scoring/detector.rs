// Detector configuration: everything the evaluation needs, loaded once.
//
// Read from a JSON document at startup and never changed afterwards. Any
// invalid value is fatal: the caller must not start handling joins with a
// half-valid config.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use super::category::CategoryThresholds;
use super::factors::TextMatcher;
use super::policy::PolicyTable;
use super::reasons::ReasonThresholds;
use super::weights::WeightConfig;

/// On-disk shape of the detector config. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    #[serde(default)]
    weights: Option<WeightConfig>,
    #[serde(default)]
    thresholds: CategoryThresholds,
    #[serde(default)]
    trust_level_actions: PolicyTable,
    #[serde(default)]
    reason_thresholds: ReasonThresholds,
    #[serde(default)]
    exempt_users: Vec<String>,
    #[serde(default)]
    custom_suspicious_patterns: Vec<String>,
}

/// Validated, immutable detector configuration.
#[derive(Debug, Clone, Default)]
pub struct DetectorConfig {
    pub weights: WeightConfig,
    pub thresholds: CategoryThresholds,
    pub policy: PolicyTable,
    pub reason_thresholds: ReasonThresholds,
    /// Identities that skip every check, the history gate included.
    pub exempt: HashSet<String>,
    pub matcher: TextMatcher,
}

impl DetectorConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: DetectorConfigFile =
            serde_json::from_str(json).context("Failed to parse detector config")?;
        Self::from_file_config(file)
    }

    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read detector config at {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid detector config {}", path.display()))
    }

    fn from_file_config(file: DetectorConfigFile) -> Result<Self> {
        let weights = match file.weights {
            Some(weights) => {
                let missing = weights.missing_keys();
                if !missing.is_empty() {
                    let names: Vec<&str> = missing.iter().map(|k| k.as_str()).collect();
                    warn!(
                        missing = names.join(", "),
                        "Weights not configured, using 1.0 for them"
                    );
                }
                weights
            }
            None => WeightConfig::default(),
        };
        weights.validate()?;
        file.thresholds.validate()?;
        file.reason_thresholds.validate()?;

        let unmapped = file.trust_level_actions.unmapped();
        if !unmapped.is_empty() {
            let names: Vec<&str> = unmapped.iter().map(|c| c.as_str()).collect();
            warn!(
                categories = names.join(", "),
                "Trust levels without an action will be logged"
            );
        }

        let matcher = TextMatcher::new(&file.custom_suspicious_patterns)?;

        Ok(Self {
            weights,
            thresholds: file.thresholds,
            policy: file.trust_level_actions,
            reason_thresholds: file.reason_thresholds,
            exempt: file.exempt_users.into_iter().collect(),
            matcher,
        })
    }

    pub fn is_exempt(&self, identity: &str) -> bool {
        self.exempt.contains(identity)
    }
}
