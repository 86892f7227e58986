// Data models: the ban record and its legacy on-disk shape.
//
// These are the types that flow between the evaluation pipeline and the
// stores. They're separate from the queries so the scoring code can use
// them without depending on rusqlite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::category::TrustCategory;

/// A remembered alt detection. Never edited; a re-detection replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanRecord {
    pub identity: String,
    pub reason: String,
    pub category: TrustCategory,
    pub score: f64,
    pub recorded_at: DateTime<Utc>,
}

impl BanRecord {
    /// Record for a fresh detection, with the standard reason text.
    pub fn from_detection(
        identity: &str,
        category: TrustCategory,
        score: f64,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity: identity.to_string(),
            reason: format!("Trust level: {category} (score: {score:.1})"),
            category,
            score,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_reason_text() {
        let r = BanRecord::from_detection("1", TrustCategory::MegaSuspicious, 42.0, Utc::now());
        assert_eq!(r.reason, "Trust level: mega-suspicious (score: 42.0)");
    }
}
