// Composition tests: verifying that the scoring pieces chain together.
//
// These exercise the data flow between modules:
//   snapshot -> factor scorers -> aggregate -> classify -> policy -> reasons
// plus the ban-history gate in front of it, against in-memory stores.
// No network calls.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use altwatch::audit::LogAuditSink;
use altwatch::db::legacy::parse_legacy_ban_list;
use altwatch::db::{BanRecord, BanStore, MemoryBanStore};
use altwatch::handler::{JoinEvent, JoinHandler};
use altwatch::platform::DryRunPlatform;
use altwatch::scoring::breakdown::{aggregate, Factor};
use altwatch::scoring::snapshot::{ActivityKind, Badge, PresenceStatus};
use altwatch::scoring::{
    assess, evaluate, score_snapshot, AccountSnapshot, Action, DetectorConfig, Outcome,
    TrustCategory,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Half-day-old throwaway: generated name, nothing on the profile.
fn throwaway() -> AccountSnapshot {
    let mut s = AccountSnapshot::new("1000000000000000001", "xk4821");
    s.account_created_at = Some(now() - Duration::hours(12));
    s.display_name = Some("xk4821".to_string());
    s.mutual_guild_count = Some(1);
    s
}

/// Old, badged, boosting account.
fn veteran() -> AccountSnapshot {
    let mut s = AccountSnapshot::new("2000", "JordanK");
    s.account_created_at = Some(now() - Duration::days(400));
    s.badges.insert(Badge::Staff);
    s.has_custom_avatar = true;
    s.boosted_since = Some(now() - Duration::days(90));
    s
}

// ============================================================
// End-to-end scenarios
// ============================================================

#[test]
fn throwaway_account_is_mega_suspicious_and_banned() {
    let config = DetectorConfig::default();
    let store = MemoryBanStore::new();
    let result = evaluate(&throwaway(), &config, &store, now());

    assert_eq!(result.outcome, Outcome::Scored);
    assert_eq!(result.breakdown.raw(Factor::Age), 10.0);
    assert!(result.breakdown.raw(Factor::Username) >= 7.0);
    assert_eq!(result.breakdown.raw(Factor::Pfp), 3.0);
    assert_eq!(result.breakdown.raw(Factor::Flags), 4.0);
    assert_eq!(result.breakdown.raw(Factor::Booster), 2.0);
    assert_eq!(result.total_score, 59.0);
    assert_eq!(result.category, TrustCategory::MegaSuspicious);
    assert_eq!(result.action, Action::Ban);
    assert_eq!(
        result.reasons,
        vec![
            "New account (0.5 days old)",
            "Suspicious username pattern",
            "No profile badges",
            "Not a server booster",
            "Default avatar",
        ]
    );
}

#[test]
fn veteran_account_is_highly_trusted() {
    let result = evaluate(
        &veteran(),
        &DetectorConfig::default(),
        &MemoryBanStore::new(),
        now(),
    );
    assert!(result.total_score <= -15.0);
    assert_eq!(result.category, TrustCategory::HighlyTrusted);
    assert_eq!(result.action, Action::None);
    assert!(result.reasons.is_empty());
}

#[test]
fn recorded_identity_rejoins_and_is_banned() {
    let store = MemoryBanStore::new();
    let mut record = BanRecord::from_detection(
        &throwaway().identity,
        TrustCategory::MegaSuspicious,
        42.0,
        now() - Duration::days(3),
    );
    record.reason = "mega-suspicious (score: 42.0)".to_string();
    store.put(&record).unwrap();

    // even a squeaky-clean profile is caught by the gate
    let mut rejoin = veteran();
    rejoin.identity = record.identity.clone();
    let result = evaluate(&rejoin, &DetectorConfig::default(), &store, now());

    assert_eq!(result.outcome, Outcome::HistoryMatch);
    assert_eq!(result.action, Action::Ban);
    assert_eq!(result.reasons.len(), 1);
    assert!(result.reasons[0].contains("previously detected"));
    assert!(result.reasons[0].contains("mega-suspicious (score: 42.0)"));
}

#[test]
fn gate_overrides_non_ban_policy() {
    let config = DetectorConfig::from_json(
        r#"{"trust_level_actions": {"mega-suspicious": "log", "highly-suspicious": "log"}}"#,
    )
    .unwrap();
    let store = MemoryBanStore::new();
    store
        .put(&BanRecord::from_detection(
            "2000",
            TrustCategory::HighlySuspicious,
            21.0,
            now(),
        ))
        .unwrap();
    let result = evaluate(&veteran(), &config, &store, now());
    assert_eq!(result.action, Action::Ban);
}

#[test]
fn gate_is_idempotent_across_rejoins() {
    let store = MemoryBanStore::new();
    store
        .put(&BanRecord::from_detection(
            "2000",
            TrustCategory::MegaSuspicious,
            35.0,
            now(),
        ))
        .unwrap();
    let config = DetectorConfig::default();
    let first = evaluate(&veteran(), &config, &store, now());
    let second = evaluate(&veteran(), &config, &store, now() + Duration::days(30));
    assert_eq!(first, second);
}

#[test]
fn exempt_identity_bypasses_gate_and_scoring() {
    let config = DetectorConfig::from_json(r#"{"exempt_users": ["1000000000000000001"]}"#).unwrap();
    let store = MemoryBanStore::new();
    store
        .put(&BanRecord::from_detection(
            "1000000000000000001",
            TrustCategory::MegaSuspicious,
            59.0,
            now(),
        ))
        .unwrap();
    let result = evaluate(&throwaway(), &config, &store, now());
    assert_eq!(result.outcome, Outcome::Exempt);
    assert_eq!(result.category, TrustCategory::Normal);
    assert_eq!(result.total_score, 0.0);
    assert_eq!(result.action, Action::None);
}

// ============================================================
// Aggregation invariants
// ============================================================

#[test]
fn total_is_weighted_sum_of_factors() {
    for snapshot in [throwaway(), veteran()] {
        let b = score_snapshot(&snapshot, &DetectorConfig::default(), false, now());
        let expected: f64 = Factor::ALL.iter().map(|f| b.weighted(*f)).sum();
        assert!((b.total - expected).abs() < 1e-9);
    }
}

#[test]
fn factor_order_does_not_change_total() {
    let config = DetectorConfig::default();
    let b = score_snapshot(&throwaway(), &config, false, now());
    let reversed: BTreeMap<Factor, f64> = b
        .per_factor
        .iter()
        .rev()
        .map(|(f, v)| (*f, *v))
        .collect();
    let again = aggregate(reversed, &config.weights);
    assert!((again.total - b.total).abs() < 1e-9);
}

#[test]
fn evaluation_is_deterministic() {
    let config = DetectorConfig::default();
    let a = assess(&throwaway(), &config, false, now());
    let b = assess(&throwaway(), &config, false, now());
    assert_eq!(a.breakdown, b.breakdown);
    assert_eq!(a.category, b.category);
}

#[test]
fn more_suspicion_never_lowers_category() {
    let config = DetectorConfig::default();
    let mut s = veteran();
    let before = assess(&s, &config, false, now()).category;
    s.presence_status = Some(PresenceStatus::Invisible);
    s.boosted_since = None;
    let after = assess(&s, &config, false, now()).category;
    assert!(after >= before);
}

#[test]
fn activities_pull_score_down() {
    let config = DetectorConfig::default();
    let idle = assess(&throwaway(), &config, false, now());
    let mut busy = throwaway();
    busy.activities.insert(ActivityKind::Game);
    busy.activities.insert(ActivityKind::Listening);
    let busy = assess(&busy, &config, false, now());
    // 2 -> -2 on a weight of 1
    assert_eq!(idle.total_score - busy.total_score, 4.0);
}

// ============================================================
// Config and legacy data feeding the pipeline
// ============================================================

#[test]
fn configured_weights_change_the_total() {
    let config = DetectorConfig::from_json(
        r#"{"weights": {"age": 0, "status": 1, "activity": 1, "username_words": 2,
            "usernameSymbolsWeight": 1.5, "displayname_words": 1.5, "displayname_caps": 0.5,
            "displayname_symbols": 1, "flags": 2, "booster": 2, "pfp": 1.5, "banner": 1,
            "custom": 1}}"#,
    )
    .unwrap();
    let result = assess(&throwaway(), &config, false, now());
    assert_eq!(result.total_score, 39.0);
    assert_eq!(result.category, TrustCategory::MegaSuspicious);
}

#[test]
fn custom_pattern_raises_username_score() {
    let mut s = throwaway();
    s.username = "raidleader".to_string();
    s.display_name = Some("Jordan".to_string());
    let plain = assess(&s, &DetectorConfig::default(), false, now());
    let config = DetectorConfig::from_json(r#"{"custom_suspicious_patterns": ["^raid"]}"#).unwrap();
    let patterned = assess(&s, &config, false, now());
    assert_eq!(patterned.breakdown.raw(Factor::Username), 4.0);
    assert_eq!(
        patterned.total_score - plain.total_score,
        8.0,
        "+4 raw at weight 2"
    );
}

#[test]
fn legacy_ban_list_feeds_the_gate() {
    let json = r#"[["1000000000000000001", {"reason": "Account age: 0.3 days",
        "timestamp": "2024-11-02T10:00:00.000Z", "severity": 70}]]"#;
    let store = MemoryBanStore::new();
    for record in parse_legacy_ban_list(json, now()).unwrap() {
        store.insert_if_absent(&record).unwrap();
    }
    let result = evaluate(&throwaway(), &DetectorConfig::default(), &store, now());
    assert_eq!(result.outcome, Outcome::HistoryMatch);
    assert_eq!(result.total_score, 70.0);
    assert!(result.reasons[0].ends_with("Account age: 0.3 days"));
}

#[test]
fn bare_profile_scores_display_name_as_username() {
    let config = DetectorConfig::default();
    let mut named = throwaway();
    let mut bare = throwaway();
    bare.display_name = None;
    named.display_name = Some(named.username.clone());
    let a = score_snapshot(&bare, &config, false, now());
    let b = score_snapshot(&named, &config, false, now());
    assert_eq!(a.raw(Factor::Displayname), 1.0);
    assert_eq!(a.total, b.total);
}

#[test]
fn bridge_payload_with_avatar_hash_and_activity_types() {
    let line = r#"{"guild_id": "g", "member": {"identity": "42", "username": "abc123",
        "avatar": "a_1f2e", "activities": [0, 2]}}"#;
    let event: JoinEvent = serde_json::from_str(line).unwrap();
    let b = score_snapshot(&event.member, &DetectorConfig::default(), false, now());
    assert_eq!(b.raw(Factor::Pfp), -2.0);
    assert_eq!(b.raw(Factor::Activity), -2.0);
}

#[test]
fn snowflake_supplies_missing_creation_time() {
    // 175928847299117063 was created 2016-04-30, so it is years old
    let mut s = AccountSnapshot::new("175928847299117063", "JordanK");
    s.account_created_at = None;
    let b = score_snapshot(&s, &DetectorConfig::default(), false, now());
    assert_eq!(b.raw(Factor::Age), -4.0);
}

// ============================================================
// Handler over the pieces
// ============================================================

#[tokio::test]
async fn handler_records_once_then_gates() {
    let store = Arc::new(MemoryBanStore::new());
    let platform = Arc::new(DryRunPlatform::new());
    let handler = JoinHandler::new(
        Arc::new(DetectorConfig::default()),
        store.clone(),
        platform.clone(),
        Arc::new(LogAuditSink),
    );
    let event = JoinEvent {
        guild_id: "guild".to_string(),
        member: throwaway(),
    };

    let first = handler.on_member_join_at(event.clone(), now());
    assert!(first.recorded);
    first.dispatch.unwrap().await.unwrap();

    let second = handler.on_member_join_at(event, now() + Duration::hours(1));
    assert_eq!(second.result.outcome, Outcome::HistoryMatch);
    assert!(!second.recorded);
    second.dispatch.unwrap().await.unwrap();

    assert_eq!(store.count().unwrap(), 1);
    let planned = platform.planned();
    assert_eq!(planned.len(), 2);
    assert!(planned[1].reason.starts_with("Alt account - Previously detected: "));
}

#[test]
fn join_event_parses_from_json_line() {
    let line = r#"{"guild_id": "g", "member": {"identity": "42", "username": "abc123",
        "presence_status": "dnd", "activities": ["game"], "public_flags": 4}}"#;
    let event: JoinEvent = serde_json::from_str(line).unwrap();
    assert_eq!(event.member.presence_status, Some(PresenceStatus::Dnd));
    assert!(event.member.effective_badges().contains(&Badge::HypesquadEvents));
}
