// Evaluation: one snapshot in, one decision out.
//
// Order matters: exemption first, then the ban-history gate, then full
// scoring. The gate and exemption paths never touch the factor scorers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::breakdown::{aggregate, Factor, ScoreBreakdown};
use super::category::TrustCategory;
use super::detector::DetectorConfig;
use super::factors;
use super::policy::{resolve_action, Action};
use super::reasons::{synthesize, ReasonContext};
use super::snapshot::AccountSnapshot;
use crate::db::{BanRecord, BanStore};

/// Which path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Exempt,
    HistoryMatch,
    Scored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub identity: String,
    pub outcome: Outcome,
    pub category: TrustCategory,
    pub total_score: f64,
    pub breakdown: ScoreBreakdown,
    pub action: Action,
    pub reasons: Vec<String>,
    /// The stored record that triggered a history match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_record: Option<BanRecord>,
}

impl EvaluationResult {
    fn exempt(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            outcome: Outcome::Exempt,
            category: TrustCategory::Normal,
            total_score: 0.0,
            breakdown: ScoreBreakdown::default(),
            action: Action::None,
            reasons: Vec::new(),
            prior_record: None,
        }
    }

    fn history_match(record: BanRecord) -> Self {
        Self {
            identity: record.identity.clone(),
            outcome: Outcome::HistoryMatch,
            category: TrustCategory::MegaSuspicious,
            total_score: record.score,
            breakdown: ScoreBreakdown::default(),
            action: Action::Ban,
            reasons: vec![format!(
                "previously detected alt, original reason: {}",
                record.reason
            )],
            prior_record: Some(record),
        }
    }

    /// True if this result should reach the audit channel.
    pub fn is_reportable(&self) -> bool {
        match self.outcome {
            Outcome::Exempt => false,
            Outcome::HistoryMatch => true,
            Outcome::Scored => self.category.is_flagged(),
        }
    }
}

/// Run every factor scorer and weight the results.
///
/// `prior_ban` feeds the history factor only; it does not short-circuit.
pub fn score_snapshot(
    snapshot: &AccountSnapshot,
    config: &DetectorConfig,
    prior_ban: bool,
    now: DateTime<Utc>,
) -> ScoreBreakdown {
    let matcher = &config.matcher;
    let per_factor = BTreeMap::from([
        (Factor::Age, factors::age_score(snapshot.created_at(), now)),
        (Factor::Status, factors::status_score(snapshot.presence_status)),
        (Factor::Activity, factors::activity_score(&snapshot.activities)),
        (
            Factor::Username,
            factors::username_score(&snapshot.username, matcher),
        ),
        (
            Factor::Displayname,
            factors::displayname_score(
                snapshot.effective_display_name(),
                &snapshot.username,
                matcher,
            ),
        ),
        (
            Factor::Flags,
            factors::badges_score(&snapshot.effective_badges()),
        ),
        (Factor::Booster, factors::booster_score(snapshot.is_booster())),
        (Factor::Pfp, factors::avatar_score(snapshot.avatar_kind())),
        (Factor::Banner, factors::banner_score(snapshot.has_banner)),
        (
            Factor::Custom,
            factors::prior_ban_score(prior_ban, snapshot.mutual_guild_count),
        ),
    ]);
    aggregate(per_factor, &config.weights)
}

/// Full scoring path, no exemption or history gate.
pub fn assess(
    snapshot: &AccountSnapshot,
    config: &DetectorConfig,
    prior_ban: bool,
    now: DateTime<Utc>,
) -> EvaluationResult {
    let breakdown = score_snapshot(snapshot, config, prior_ban, now);
    let category = config.thresholds.classify(breakdown.total);
    let action = resolve_action(category, &config.policy);
    let ctx = ReasonContext {
        account_age_days: snapshot.account_age_days(now),
        status: snapshot.effective_status(),
    };
    let reasons = synthesize(&breakdown, &config.reason_thresholds, &ctx);

    debug!(
        identity = %snapshot.identity,
        score = breakdown.total,
        category = category.as_str(),
        "Scored account"
    );

    EvaluationResult {
        identity: snapshot.identity.clone(),
        outcome: Outcome::Scored,
        category,
        total_score: breakdown.total,
        breakdown,
        action,
        reasons,
        prior_record: None,
    }
}

/// Evaluate a joining account.
///
/// Read-only: the store is consulted, never written. A store read failure
/// is logged and treated as "no record" so a flaky store can't block joins.
pub fn evaluate(
    snapshot: &AccountSnapshot,
    config: &DetectorConfig,
    store: &dyn BanStore,
    now: DateTime<Utc>,
) -> EvaluationResult {
    if config.is_exempt(&snapshot.identity) {
        debug!(identity = %snapshot.identity, "Exempt account, skipping checks");
        return EvaluationResult::exempt(&snapshot.identity);
    }

    match store.get(&snapshot.identity) {
        Ok(Some(record)) => return EvaluationResult::history_match(record),
        Ok(None) => {}
        Err(e) => {
            warn!(
                identity = %snapshot.identity,
                error = %e,
                "Ban store lookup failed, scoring as if no record exists"
            );
        }
    }

    assess(snapshot, config, false, now)
}
