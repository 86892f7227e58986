// Join handler: the async adapter around `evaluate`.
//
// Evaluation and the ban-record write happen inline, before the handler
// returns, so the next join for the same identity already sees the record.
// The platform call and the audit report run on a spawned task: a slow or
// rate-limited Discord never holds up the next evaluation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audit::{ActionTaken, AuditSink, DetectionReport};
use crate::db::{BanRecord, BanStore};
use crate::platform::ModerationPlatform;
use crate::scoring::evaluate::{evaluate, EvaluationResult, Outcome};
use crate::scoring::policy::Action;
use crate::scoring::snapshot::AccountSnapshot;
use crate::scoring::DetectorConfig;

/// A member joined a guild.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinEvent {
    pub guild_id: String,
    pub member: AccountSnapshot,
}

/// How the side effects of one detection went.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub identity: String,
    pub action_taken: ActionTaken,
    /// Set when the audit sink was called and failed.
    pub audit_error: Option<String>,
    pub reported: bool,
}

/// The decision for one join, plus the handle of its side-effect task.
pub struct Detection {
    pub result: EvaluationResult,
    /// True if this join created a new ban record.
    pub recorded: bool,
    pub dispatch: Option<JoinHandle<DispatchReport>>,
}

#[derive(Clone)]
pub struct JoinHandler {
    config: Arc<DetectorConfig>,
    store: Arc<dyn BanStore>,
    platform: Arc<dyn ModerationPlatform>,
    audit: Arc<dyn AuditSink>,
}

impl JoinHandler {
    pub fn new(
        config: Arc<DetectorConfig>,
        store: Arc<dyn BanStore>,
        platform: Arc<dyn ModerationPlatform>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            store,
            platform,
            audit,
        }
    }

    /// Handle a join using the current time. Must run inside a tokio runtime.
    pub fn on_member_join(&self, event: JoinEvent) -> Detection {
        self.on_member_join_at(event, Utc::now())
    }

    pub fn on_member_join_at(&self, event: JoinEvent, now: DateTime<Utc>) -> Detection {
        let JoinEvent { guild_id, member } = event;
        let result = evaluate(&member, &self.config, self.store.as_ref(), now);

        match result.outcome {
            Outcome::Exempt => {
                debug!(identity = %member.identity, "Exempt member joined");
            }
            Outcome::HistoryMatch => {
                info!(
                    identity = %member.identity,
                    username = %member.username,
                    "Previously detected alt attempting to rejoin"
                );
            }
            Outcome::Scored if result.category.is_flagged() => {
                info!(
                    identity = %member.identity,
                    username = %member.username,
                    category = result.category.as_str(),
                    score = result.total_score,
                    action = result.action.as_str(),
                    "Flagged member"
                );
            }
            Outcome::Scored => {
                info!(
                    identity = %member.identity,
                    username = %member.username,
                    category = result.category.as_str(),
                    score = result.total_score,
                    "Member passed checks"
                );
            }
        }

        let recorded = self.record_if_needed(&result, now);

        let needs_dispatch = result.is_reportable() || result.action.is_enforcement();
        let dispatch = needs_dispatch.then(|| {
            let platform = Arc::clone(&self.platform);
            let audit = Arc::clone(&self.audit);
            let result = result.clone();
            tokio::spawn(async move {
                carry_out(platform, audit, guild_id, member, result, now).await
            })
        });

        Detection {
            result,
            recorded,
            dispatch,
        }
    }

    /// Write a ban record for highly-suspicious and above. Only the scored
    /// path records: a history match already has one.
    fn record_if_needed(&self, result: &EvaluationResult, now: DateTime<Utc>) -> bool {
        if result.outcome != Outcome::Scored || !result.category.records_ban() {
            return false;
        }
        let record =
            BanRecord::from_detection(&result.identity, result.category, result.total_score, now);
        match self.store.insert_if_absent(&record) {
            Ok(true) => true,
            Ok(false) => {
                debug!(identity = %result.identity, "Ban record already exists, keeping it");
                false
            }
            Err(e) => {
                warn!(identity = %result.identity, error = %e, "Failed to write ban record");
                false
            }
        }
    }
}

/// Audit-log reason sent with the platform call.
pub fn action_reason(result: &EvaluationResult) -> String {
    if let Some(prior) = &result.prior_record {
        return format!("Alt account - Previously detected: {}", prior.reason);
    }
    match result.action {
        Action::Kick => format!("Alt detected - Trust level: {}", result.category),
        _ => format!(
            "Alt detected - Trust level: {} (score: {:.1})",
            result.category, result.total_score
        ),
    }
}

/// Carry out the action, then report. Never fails: errors are folded into
/// the returned report.
async fn carry_out(
    platform: Arc<dyn ModerationPlatform>,
    audit: Arc<dyn AuditSink>,
    guild_id: String,
    member: AccountSnapshot,
    result: EvaluationResult,
    now: DateTime<Utc>,
) -> DispatchReport {
    let reason = action_reason(&result);
    let outcome = match result.action {
        Action::Ban => Some(platform.ban(&guild_id, &result.identity, &reason).await),
        Action::Kick => Some(platform.kick(&guild_id, &result.identity, &reason).await),
        Action::Log | Action::None => None,
    };

    let action_taken = match (result.action, outcome) {
        (action, Some(Err(e))) => {
            warn!(
                identity = %result.identity,
                action = action.as_str(),
                error = %e,
                "Moderation action failed"
            );
            ActionTaken::Failed {
                action,
                error: format!("{e:#}"),
            }
        }
        (Action::Ban, _) if result.outcome == Outcome::HistoryMatch => {
            ActionTaken::BannedPreviouslyDetected
        }
        (Action::Ban, _) => ActionTaken::Banned,
        (Action::Kick, _) => ActionTaken::Kicked,
        (Action::Log, _) => ActionTaken::Logged,
        (Action::None, _) => ActionTaken::None,
    };

    let identity = result.identity.clone();
    let reported = result.is_reportable();
    let mut audit_error = None;
    if reported {
        let report = DetectionReport {
            guild_id,
            snapshot: member,
            result,
            action_taken: action_taken.clone(),
            reported_at: now,
        };
        if let Err(e) = audit.report_detection(&report).await {
            warn!(identity = %identity, error = %e, "Failed to deliver audit report");
            audit_error = Some(format!("{e:#}"));
        }
    }

    DispatchReport {
        identity,
        action_taken,
        audit_error,
        reported,
    }
}

/// Totals over finished dispatch tasks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTally {
    pub completed: usize,
    /// Failed bans or kicks, plus tasks that panicked.
    pub failures: usize,
    pub audit_failures: usize,
}

/// Dispatch tasks still in flight. Finished tasks are awaited and counted
/// as new ones arrive, so the tally covers every task, not only the ones
/// still running at shutdown.
#[derive(Default)]
pub struct PendingDispatches {
    tasks: Vec<JoinHandle<DispatchReport>>,
    tally: DispatchTally,
}

impl PendingDispatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tally(&self) -> DispatchTally {
        self.tally
    }

    /// Count whatever has finished, then track `task`.
    pub async fn push(&mut self, task: JoinHandle<DispatchReport>) {
        self.reap().await;
        self.tasks.push(task);
    }

    /// Await and count the tasks that have already finished.
    pub async fn reap(&mut self) {
        let (done, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|task| task.is_finished());
        self.tasks = running;
        for task in done {
            let outcome = task.await;
            self.record(outcome);
        }
    }

    /// Wait for every outstanding task and return the final tally.
    pub async fn finish(mut self) -> DispatchTally {
        for task in std::mem::take(&mut self.tasks) {
            let outcome = task.await;
            self.record(outcome);
        }
        self.tally
    }

    fn record(&mut self, outcome: Result<DispatchReport, tokio::task::JoinError>) {
        match outcome {
            Ok(report) => {
                self.tally.completed += 1;
                if report.action_taken.is_failure() {
                    self.tally.failures += 1;
                }
                if report.audit_error.is_some() {
                    self.tally.audit_failures += 1;
                }
            }
            Err(e) => {
                warn!(error = %e, "Dispatch task panicked");
                self.tally.failures += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryBanStore;
    use crate::platform::DryRunPlatform;
    use crate::scoring::category::TrustCategory;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAudit {
        reports: Mutex<Vec<DetectionReport>>,
        fail: bool,
    }

    #[async_trait]
    impl AuditSink for RecordingAudit {
        async fn report_detection(&self, report: &DetectionReport) -> Result<()> {
            self.reports.lock().unwrap().push(report.clone());
            if self.fail {
                anyhow::bail!("webhook down");
            }
            Ok(())
        }
    }

    struct ForbiddenPlatform;

    #[async_trait]
    impl ModerationPlatform for ForbiddenPlatform {
        async fn ban(&self, _g: &str, _i: &str, _r: &str) -> Result<()> {
            anyhow::bail!("Discord API returned 403 Forbidden")
        }
        async fn kick(&self, _g: &str, _i: &str, _r: &str) -> Result<()> {
            anyhow::bail!("Discord API returned 403 Forbidden")
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn alt_event(id: &str) -> JoinEvent {
        let mut member = AccountSnapshot::new(id, "xk4821");
        member.account_created_at = Some(now() - Duration::hours(12));
        member.display_name = Some("xk4821".to_string());
        member.mutual_guild_count = Some(1);
        JoinEvent {
            guild_id: "g1".to_string(),
            member,
        }
    }

    fn trusted_event(id: &str) -> JoinEvent {
        let mut member = AccountSnapshot::new(id, "JordanK");
        member.account_created_at = Some(now() - Duration::days(400));
        member.badges.insert(crate::scoring::snapshot::Badge::Staff);
        member.has_custom_avatar = true;
        member.boosted_since = Some(now() - Duration::days(30));
        JoinEvent {
            guild_id: "g1".to_string(),
            member,
        }
    }

    #[tokio::test]
    async fn test_alt_is_recorded_banned_and_reported() {
        let store = Arc::new(MemoryBanStore::new());
        let platform = Arc::new(DryRunPlatform::new());
        let audit = Arc::new(RecordingAudit::default());
        let handler = JoinHandler::new(
            Arc::new(DetectorConfig::default()),
            store.clone(),
            platform.clone(),
            audit.clone(),
        );

        let detection = handler.on_member_join_at(alt_event("77"), now());
        assert!(detection.recorded);
        assert_eq!(detection.result.category, TrustCategory::MegaSuspicious);
        let record = store.get("77").unwrap().unwrap();
        assert_eq!(record.reason, "Trust level: mega-suspicious (score: 59.0)");

        let report = detection.dispatch.unwrap().await.unwrap();
        assert_eq!(report.action_taken, ActionTaken::Banned);
        assert!(report.reported);
        let planned = platform.planned();
        assert_eq!(planned.len(), 1);
        assert_eq!(
            planned[0].reason,
            "Alt detected - Trust level: mega-suspicious (score: 59.0)"
        );
        assert_eq!(audit.reports.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejoin_hits_history_gate() {
        let store = Arc::new(MemoryBanStore::new());
        let platform = Arc::new(DryRunPlatform::new());
        let handler = JoinHandler::new(
            Arc::new(DetectorConfig::default()),
            store.clone(),
            platform.clone(),
            Arc::new(RecordingAudit::default()),
        );

        let first = handler.on_member_join_at(alt_event("77"), now());
        first.dispatch.unwrap().await.unwrap();

        let second = handler.on_member_join_at(alt_event("77"), now() + Duration::days(1));
        assert_eq!(second.result.outcome, Outcome::HistoryMatch);
        assert!(!second.recorded);
        let report = second.dispatch.unwrap().await.unwrap();
        assert_eq!(report.action_taken, ActionTaken::BannedPreviouslyDetected);
        assert_eq!(
            platform.planned()[1].reason,
            "Alt account - Previously detected: Trust level: mega-suspicious (score: 59.0)"
        );
        // the original record is untouched
        assert_eq!(store.get("77").unwrap().unwrap().recorded_at, now());
    }

    #[tokio::test]
    async fn test_trusted_member_is_not_dispatched() {
        let store = Arc::new(MemoryBanStore::new());
        let handler = JoinHandler::new(
            Arc::new(DetectorConfig::default()),
            store.clone(),
            Arc::new(DryRunPlatform::new()),
            Arc::new(RecordingAudit::default()),
        );
        let detection = handler.on_member_join_at(trusted_event("5"), now());
        assert_eq!(detection.result.category, TrustCategory::HighlyTrusted);
        assert!(detection.dispatch.is_none());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_ban_keeps_record_and_reports_failure() {
        let store = Arc::new(MemoryBanStore::new());
        let audit = Arc::new(RecordingAudit::default());
        let handler = JoinHandler::new(
            Arc::new(DetectorConfig::default()),
            store.clone(),
            Arc::new(ForbiddenPlatform),
            audit.clone(),
        );
        let detection = handler.on_member_join_at(alt_event("88"), now());
        let report = detection.dispatch.unwrap().await.unwrap();
        assert!(report.action_taken.is_failure());
        assert!(store.get("88").unwrap().is_some());
        let reports = audit.reports.lock().unwrap();
        assert!(reports[0].action_taken.to_string().contains("403 Forbidden"));
    }

    #[tokio::test]
    async fn test_audit_failure_is_contained() {
        let audit = Arc::new(RecordingAudit {
            fail: true,
            ..Default::default()
        });
        let handler = JoinHandler::new(
            Arc::new(DetectorConfig::default()),
            Arc::new(MemoryBanStore::new()),
            Arc::new(DryRunPlatform::new()),
            audit,
        );
        let report = handler
            .on_member_join_at(alt_event("99"), now())
            .dispatch
            .unwrap()
            .await
            .unwrap();
        assert_eq!(report.action_taken, ActionTaken::Banned);
        assert!(report.audit_error.unwrap().contains("webhook down"));
    }

    #[tokio::test]
    async fn test_pending_dispatches_count_tasks_that_finished_early() {
        let handler = JoinHandler::new(
            Arc::new(DetectorConfig::default()),
            Arc::new(MemoryBanStore::new()),
            Arc::new(ForbiddenPlatform),
            Arc::new(RecordingAudit::default()),
        );
        let mut pending = PendingDispatches::new();

        let first = handler.on_member_join_at(alt_event("1"), now()).dispatch.unwrap();
        while !first.is_finished() {
            tokio::task::yield_now().await;
        }
        pending.push(first).await;
        let second = handler.on_member_join_at(alt_event("2"), now()).dispatch.unwrap();
        pending.push(second).await;

        // the first task was finished when the second arrived
        assert_eq!(pending.tally().completed, 1);
        assert_eq!(pending.len(), 1);

        let tally = pending.finish().await;
        assert_eq!(
            tally,
            DispatchTally {
                completed: 2,
                failures: 2,
                audit_failures: 0,
            }
        );
    }

    #[test]
    fn test_kick_reason_has_no_score() {
        let mut result = crate::scoring::assess(
            &alt_event("1").member,
            &DetectorConfig::default(),
            false,
            now(),
        );
        result.action = Action::Kick;
        result.category = TrustCategory::Suspicious;
        assert_eq!(action_reason(&result), "Alt detected - Trust level: suspicious");
    }
}
