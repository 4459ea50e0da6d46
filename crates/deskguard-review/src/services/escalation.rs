//! Hierarchical escalation of overdue work items.
//!
//! A periodic sweep walks open work items whose deadline has passed through
//! an ordered staff hierarchy (team lead, manager, admin by default). The
//! first escalation waits out a grace window after the deadline; each
//! re-escalation waits out a back-off interval since the previous one. The
//! level transition is compare-and-swap in the store, so overlapping sweeps
//! cannot double-escalate an item, and the flow is commit-then-notify: the
//! transition (plus its audit event) commits first, notification delivery is
//! best-effort afterwards.
//!
//! This subsystem reads work items and mutates only their escalation state;
//! creating and closing them belongs to the external ticket/task store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ReviewError, Result};
use crate::types::{EscalationRole, StaffId, WorkItemId};

/// Default number of items examined per sweep.
pub const DEFAULT_SWEEP_BATCH_SIZE: usize = 50;

// ============================================================================
// Domain Types
// ============================================================================

/// The escalation-relevant view of a ticket or internal task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier.
    pub id: WorkItemId,
    /// Short human-readable subject, used in notifications.
    pub subject: String,
    /// Response deadline. Items without a deadline are never escalated.
    pub deadline: Option<DateTime<Utc>>,
    /// Current escalation level (0 = not yet escalated). Only ever
    /// increases, one step per escalation event.
    pub current_escalation_level: i32,
    /// When the item was last escalated.
    pub last_escalated_at: Option<DateTime<Utc>>,
    /// Staff member currently responsible for the item.
    pub assignee: Option<StaffId>,
    /// Closed or cancelled items are excluded from sweeps.
    pub is_open: bool,
}

/// A staff member as seen by the escalation resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    pub display_name: String,
    pub role: EscalationRole,
    pub is_active: bool,
}

/// Configuration for the escalation sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Highest escalation level; items at this level are left alone.
    #[serde(default = "default_max_level")]
    pub max_level: i32,

    /// Minutes after the deadline before the first escalation.
    #[serde(default = "default_grace_window_minutes")]
    pub grace_window_minutes: i64,

    /// Minimum minutes between successive escalations of one item.
    #[serde(default = "default_re_escalation_interval_minutes")]
    pub re_escalation_interval_minutes: i64,

    /// Ordered hierarchy: level N is served by `hierarchy[N - 1]`.
    #[serde(default = "default_hierarchy")]
    pub hierarchy: Vec<EscalationRole>,
}

fn default_max_level() -> i32 {
    3
}

fn default_grace_window_minutes() -> i64 {
    60
}

fn default_re_escalation_interval_minutes() -> i64 {
    240
}

fn default_hierarchy() -> Vec<EscalationRole> {
    vec![
        EscalationRole::TeamLead,
        EscalationRole::Manager,
        EscalationRole::Admin,
    ]
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            max_level: default_max_level(),
            grace_window_minutes: default_grace_window_minutes(),
            re_escalation_interval_minutes: default_re_escalation_interval_minutes(),
            hierarchy: default_hierarchy(),
        }
    }
}

impl EscalationPolicy {
    /// Grace window as a duration.
    pub fn grace_window(&self) -> Duration {
        Duration::minutes(self.grace_window_minutes)
    }

    /// Re-escalation back-off as a duration.
    pub fn re_escalation_interval(&self) -> Duration {
        Duration::minutes(self.re_escalation_interval_minutes)
    }

    /// The ceiling actually reachable: a hierarchy shorter than
    /// `max_level` caps the ceiling at its own length.
    pub fn effective_max_level(&self) -> i32 {
        self.max_level.min(self.hierarchy.len() as i32)
    }

    /// Role serving a given escalation level (1-indexed).
    pub fn role_for_level(&self, level: i32) -> Option<EscalationRole> {
        if level < 1 {
            return None;
        }
        self.hierarchy.get((level - 1) as usize).copied()
    }
}

/// Audit record of one committed escalation transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationEvent {
    pub work_item_id: WorkItemId,
    pub from_level: i32,
    pub to_level: i32,
    pub role: EscalationRole,
    pub notified_staff: StaffId,
    /// How far past the deadline the item was at escalation time.
    pub overdue_seconds: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Notification payload delivered to a staff-facing channel.
#[derive(Debug, Clone, Serialize)]
pub struct EscalationNotice {
    pub work_item_id: WorkItemId,
    pub subject: String,
    pub level: i32,
    pub assignee: Option<StaffId>,
    pub notified_staff: StaffId,
    pub overdue_seconds: i64,
    pub message: String,
}

/// Summary returned by one sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepSummary {
    /// Items examined.
    pub processed: usize,
    /// Items whose level was raised.
    pub escalated: usize,
    /// Items examined but left alone (not yet due, at ceiling, lost race).
    pub skipped: usize,
    /// Per-item failures; one bad item never aborts the sweep.
    pub errors: Vec<SweepError>,
}

impl SweepSummary {
    /// Whether any item failed during the sweep.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A per-item failure recorded during a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepError {
    pub work_item_id: WorkItemId,
    pub reason: String,
}

/// Outcome of examining a single item.
enum ItemOutcome {
    Escalated { to_level: i32 },
    Skipped(&'static str),
}

enum Eligibility {
    Due { next_level: i32 },
    NotDue(&'static str),
    AtCeiling,
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Read/write access to work item escalation state.
#[async_trait::async_trait]
pub trait WorkItemStore: Send + Sync {
    /// Open items with a deadline in the past, oldest deadline first.
    async fn list_overdue(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<WorkItem>>;

    /// Get a work item by ID.
    async fn get(&self, id: WorkItemId) -> Result<Option<WorkItem>>;

    /// Commit an escalation transition atomically with its audit event.
    ///
    /// Compare-and-swap on the level: the transition applies only if the
    /// stored level still equals `event.from_level`. Returns `false` when
    /// the item changed underneath us (another sweep won the race) or no
    /// longer qualifies; nothing is written in that case.
    async fn commit_escalation(&self, event: &EscalationEvent) -> Result<bool>;
}

/// Resolves hierarchy roles to concrete staff members.
#[async_trait::async_trait]
pub trait StaffDirectory: Send + Sync {
    /// First active staff member holding the role, if any.
    async fn resolve_role(&self, role: EscalationRole) -> Result<Option<StaffMember>>;

    /// Get a staff member by ID.
    async fn get(&self, id: StaffId) -> Result<Option<StaffMember>>;
}

/// Staff-facing notification channel. Delivery is best-effort.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notice: EscalationNotice) -> Result<()>;
}

// ============================================================================
// In-Memory Collaborators (for testing)
// ============================================================================

/// In-memory work item store for testing.
#[derive(Debug, Default)]
pub struct InMemoryWorkItemStore {
    items: Arc<RwLock<HashMap<Uuid, WorkItem>>>,
    events: Arc<RwLock<Vec<EscalationEvent>>>,
}

impl InMemoryWorkItemStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a work item.
    pub async fn insert(&self, item: WorkItem) {
        self.items.write().await.insert(item.id.into_inner(), item);
    }

    /// All recorded escalation events, oldest first.
    pub async fn events(&self) -> Vec<EscalationEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait::async_trait]
impl WorkItemStore for InMemoryWorkItemStore {
    async fn list_overdue(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<WorkItem>> {
        let items = self.items.read().await;
        let mut overdue: Vec<_> = items
            .values()
            .filter(|i| i.is_open && i.deadline.is_some_and(|d| d < now))
            .cloned()
            .collect();
        overdue.sort_by_key(|i| i.deadline);
        overdue.truncate(limit);
        Ok(overdue)
    }

    async fn get(&self, id: WorkItemId) -> Result<Option<WorkItem>> {
        Ok(self.items.read().await.get(&id.into_inner()).cloned())
    }

    async fn commit_escalation(&self, event: &EscalationEvent) -> Result<bool> {
        let mut items = self.items.write().await;
        match items.get_mut(&event.work_item_id.into_inner()) {
            Some(item)
                if item.is_open && item.current_escalation_level == event.from_level =>
            {
                item.current_escalation_level = event.to_level;
                item.last_escalated_at = Some(event.occurred_at);
                self.events.write().await.push(event.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// In-memory staff directory for testing.
#[derive(Debug, Default)]
pub struct InMemoryStaffDirectory {
    staff: Arc<RwLock<Vec<StaffMember>>>,
}

impl InMemoryStaffDirectory {
    /// Create a new in-memory directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a staff member.
    pub async fn add(&self, member: StaffMember) {
        self.staff.write().await.push(member);
    }
}

#[async_trait::async_trait]
impl StaffDirectory for InMemoryStaffDirectory {
    async fn resolve_role(&self, role: EscalationRole) -> Result<Option<StaffMember>> {
        Ok(self
            .staff
            .read()
            .await
            .iter()
            .find(|s| s.role == role && s.is_active)
            .cloned())
    }

    async fn get(&self, id: StaffId) -> Result<Option<StaffMember>> {
        Ok(self.staff.read().await.iter().find(|s| s.id == id).cloned())
    }
}

/// Notification sink that records notices; can be armed to fail, for
/// exercising the best-effort delivery path.
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    sent: Arc<RwLock<Vec<EscalationNotice>>>,
    failing: AtomicBool,
}

impl RecordingNotificationSink {
    /// Create a new recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Notices delivered so far.
    pub async fn sent(&self) -> Vec<EscalationNotice> {
        self.sent.read().await.clone()
    }
}

#[async_trait::async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn notify(&self, notice: EscalationNotice) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ReviewError::NotificationDelivery(
                "notification channel unavailable".to_string(),
            ));
        }
        self.sent.write().await.push(notice);
        Ok(())
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service that runs escalation sweeps over overdue work items.
pub struct EscalationService {
    work_items: Arc<dyn WorkItemStore>,
    staff: Arc<dyn StaffDirectory>,
    notifier: Arc<dyn NotificationSink>,
    policy: EscalationPolicy,
    batch_size: usize,
}

impl EscalationService {
    /// Create a new escalation service.
    pub fn new(
        work_items: Arc<dyn WorkItemStore>,
        staff: Arc<dyn StaffDirectory>,
        notifier: Arc<dyn NotificationSink>,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            work_items,
            staff,
            notifier,
            policy,
            batch_size: DEFAULT_SWEEP_BATCH_SIZE,
        }
    }

    /// Override the per-sweep batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// The configured policy.
    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    /// Run one escalation sweep.
    ///
    /// Processes every overdue item independently; a failure on one item is
    /// recorded in the summary and the sweep continues.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepSummary> {
        let overdue = self.work_items.list_overdue(now, self.batch_size).await?;
        let mut summary = SweepSummary::default();

        if overdue.is_empty() {
            debug!("No overdue work items found");
            return Ok(summary);
        }

        info!(count = overdue.len(), "Found overdue work items to examine");

        for item in overdue {
            summary.processed += 1;
            match self.escalate_item(&item, now).await {
                Ok(ItemOutcome::Escalated { to_level }) => {
                    summary.escalated += 1;
                    info!(
                        work_item_id = %item.id,
                        level = to_level,
                        "Escalated overdue work item"
                    );
                }
                Ok(ItemOutcome::Skipped(reason)) => {
                    summary.skipped += 1;
                    debug!(work_item_id = %item.id, reason, "Skipped work item");
                }
                Err(e) => {
                    warn!(
                        work_item_id = %item.id,
                        error = %e,
                        "Failed to escalate work item"
                    );
                    summary.errors.push(SweepError {
                        work_item_id: item.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            processed = summary.processed,
            escalated = summary.escalated,
            skipped = summary.skipped,
            failed = summary.errors.len(),
            "Completed escalation sweep"
        );

        Ok(summary)
    }

    /// Examine one item and escalate it if due.
    async fn escalate_item(&self, item: &WorkItem, now: DateTime<Utc>) -> Result<ItemOutcome> {
        let next_level = match self.check_eligibility(item, now) {
            Eligibility::Due { next_level } => next_level,
            Eligibility::NotDue(reason) => return Ok(ItemOutcome::Skipped(reason)),
            Eligibility::AtCeiling => return Ok(ItemOutcome::Skipped("at maximum level")),
        };

        // Eligibility bounds next_level by the effective ceiling, which is
        // itself capped by the hierarchy length.
        let Some(role) = self.policy.role_for_level(next_level) else {
            return Ok(ItemOutcome::Skipped("at maximum level"));
        };

        let target = self
            .staff
            .resolve_role(role)
            .await?
            .ok_or(ReviewError::UnresolvableEscalationTarget {
                item: item.id,
                role,
            })?;

        // item.deadline is Some: eligibility requires it.
        let overdue_by = now - item.deadline.unwrap_or(now);

        let event = EscalationEvent {
            work_item_id: item.id,
            from_level: item.current_escalation_level,
            to_level: next_level,
            role,
            notified_staff: target.id,
            overdue_seconds: overdue_by.num_seconds(),
            occurred_at: now,
        };

        // Commit first; notification is best-effort afterwards. Exact-once
        // applies to the level transition, not to delivery.
        if !self.work_items.commit_escalation(&event).await? {
            return Ok(ItemOutcome::Skipped("level changed by a concurrent sweep"));
        }

        let notice = EscalationNotice {
            work_item_id: item.id,
            subject: item.subject.clone(),
            level: next_level,
            assignee: item.assignee,
            notified_staff: target.id,
            overdue_seconds: overdue_by.num_seconds(),
            message: format!(
                "'{}' is overdue by {} and has been escalated to level {} ({}: {})",
                item.subject,
                format_overdue(overdue_by),
                next_level,
                role,
                target.display_name,
            ),
        };

        if let Err(e) = self.notifier.notify(notice).await {
            warn!(
                work_item_id = %item.id,
                level = next_level,
                error = %e,
                "Escalation committed but notification delivery failed"
            );
        }

        Ok(ItemOutcome::Escalated {
            to_level: next_level,
        })
    }

    fn check_eligibility(&self, item: &WorkItem, now: DateTime<Utc>) -> Eligibility {
        if !item.is_open {
            return Eligibility::NotDue("item is closed");
        }
        let Some(deadline) = item.deadline else {
            return Eligibility::NotDue("no deadline set");
        };

        let level = item.current_escalation_level;
        if level >= self.policy.effective_max_level() {
            return Eligibility::AtCeiling;
        }

        if now <= deadline + self.policy.grace_window() {
            return Eligibility::NotDue("within grace window");
        }

        if level >= 1 {
            if let Some(last) = item.last_escalated_at {
                if now - last <= self.policy.re_escalation_interval() {
                    return Eligibility::NotDue("re-escalation interval not elapsed");
                }
            }
        }

        Eligibility::Due {
            next_level: level + 1,
        }
    }
}

fn format_overdue(overdue: Duration) -> String {
    let hours = overdue.num_hours();
    let minutes = (overdue.num_minutes() - hours * 60).abs();
    format!("{hours}h{minutes:02}m")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overdue_item(hours_overdue: i64) -> WorkItem {
        WorkItem {
            id: WorkItemId::new(),
            subject: "Refund request #4417".to_string(),
            deadline: Some(Utc::now() - Duration::hours(hours_overdue)),
            current_escalation_level: 0,
            last_escalated_at: None,
            assignee: Some(StaffId::new()),
            is_open: true,
        }
    }

    fn staff(role: EscalationRole, active: bool) -> StaffMember {
        StaffMember {
            id: StaffId::new(),
            display_name: format!("{role} person"),
            role,
            is_active: active,
        }
    }

    struct Fixture {
        service: EscalationService,
        items: Arc<InMemoryWorkItemStore>,
        directory: Arc<InMemoryStaffDirectory>,
        sink: Arc<RecordingNotificationSink>,
    }

    async fn fixture() -> Fixture {
        let items = Arc::new(InMemoryWorkItemStore::new());
        let directory = Arc::new(InMemoryStaffDirectory::new());
        for role in [
            EscalationRole::TeamLead,
            EscalationRole::Manager,
            EscalationRole::Admin,
        ] {
            directory.add(staff(role, true)).await;
        }
        let sink = Arc::new(RecordingNotificationSink::new());
        let service = EscalationService::new(
            items.clone(),
            directory.clone(),
            sink.clone(),
            EscalationPolicy::default(),
        );
        Fixture {
            service,
            items,
            directory,
            sink,
        }
    }

    #[tokio::test]
    async fn test_first_escalation_past_grace_window() {
        let f = fixture().await;
        let item = overdue_item(2);
        let id = item.id;
        f.items.insert(item).await;

        let summary = f.service.sweep(Utc::now()).await.unwrap();
        assert_eq!(summary.escalated, 1);
        assert!(!summary.has_errors());

        let stored = f.items.get(id).await.unwrap().unwrap();
        assert_eq!(stored.current_escalation_level, 1);
        assert!(stored.last_escalated_at.is_some());

        let events = f.items.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from_level, 0);
        assert_eq!(events[0].to_level, 1);
        assert_eq!(events[0].role, EscalationRole::TeamLead);

        let sent = f.sink.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].level, 1);
        assert!(sent[0].message.contains("Refund request #4417"));
        assert!(sent[0].message.contains("team_lead"));
    }

    #[tokio::test]
    async fn test_within_grace_window_is_skipped() {
        let f = fixture().await;
        let now = Utc::now();
        let mut item = overdue_item(0);
        item.deadline = Some(now - Duration::minutes(30)); // grace is 60m
        let id = item.id;
        f.items.insert(item).await;

        let summary = f.service.sweep(now).await.unwrap();
        assert_eq!(summary.escalated, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(
            f.items.get(id).await.unwrap().unwrap().current_escalation_level,
            0
        );
    }

    #[tokio::test]
    async fn test_immediate_second_sweep_does_not_re_escalate() {
        let f = fixture().await;
        let item = overdue_item(2);
        let id = item.id;
        f.items.insert(item).await;

        let now = Utc::now();
        let first = f.service.sweep(now).await.unwrap();
        assert_eq!(first.escalated, 1);

        let second = f.service.sweep(now + Duration::minutes(1)).await.unwrap();
        assert_eq!(second.escalated, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(
            f.items.get(id).await.unwrap().unwrap().current_escalation_level,
            1
        );
    }

    #[tokio::test]
    async fn test_re_escalation_after_interval_elapses() {
        let f = fixture().await;
        let item = overdue_item(12);
        let id = item.id;
        f.items.insert(item).await;

        let now = Utc::now();
        f.service.sweep(now).await.unwrap();

        // Just under the 4h interval: nothing happens.
        let early = f.service.sweep(now + Duration::hours(3)).await.unwrap();
        assert_eq!(early.escalated, 0);

        // Past the interval: level 2, manager notified.
        let late = f
            .service
            .sweep(now + Duration::hours(4) + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(late.escalated, 1);

        let stored = f.items.get(id).await.unwrap().unwrap();
        assert_eq!(stored.current_escalation_level, 2);
        let events = f.items.events().await;
        assert_eq!(events.last().unwrap().role, EscalationRole::Manager);
    }

    #[tokio::test]
    async fn test_max_level_is_a_hard_ceiling() {
        let f = fixture().await;
        let mut item = overdue_item(500);
        item.current_escalation_level = 3;
        item.last_escalated_at = Some(Utc::now() - Duration::days(10));
        let id = item.id;
        f.items.insert(item).await;

        let summary = f.service.sweep(Utc::now()).await.unwrap();
        assert_eq!(summary.escalated, 0);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.has_errors());
        assert_eq!(
            f.items.get(id).await.unwrap().unwrap().current_escalation_level,
            3
        );
    }

    #[tokio::test]
    async fn test_short_hierarchy_caps_the_ceiling() {
        let items = Arc::new(InMemoryWorkItemStore::new());
        let directory = Arc::new(InMemoryStaffDirectory::new());
        directory.add(staff(EscalationRole::TeamLead, true)).await;
        let sink = Arc::new(RecordingNotificationSink::new());
        let policy = EscalationPolicy {
            hierarchy: vec![EscalationRole::TeamLead],
            ..Default::default()
        };
        assert_eq!(policy.effective_max_level(), 1);
        let service = EscalationService::new(items.clone(), directory, sink, policy);

        let mut item = overdue_item(20);
        item.current_escalation_level = 1;
        item.last_escalated_at = Some(Utc::now() - Duration::hours(10));
        items.insert(item).await;

        let summary = service.sweep(Utc::now()).await.unwrap();
        assert_eq!(summary.escalated, 0);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_closed_items_are_left_alone() {
        let f = fixture().await;
        let mut item = overdue_item(5);
        item.is_open = false;
        f.items.insert(item).await;

        let summary = f.service.sweep(Utc::now()).await.unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.escalated, 0);
    }

    #[tokio::test]
    async fn test_unresolvable_role_is_isolated() {
        let items = Arc::new(InMemoryWorkItemStore::new());
        let directory = Arc::new(InMemoryStaffDirectory::new());
        // Team lead exists but is inactive: level 1 cannot be resolved.
        directory.add(staff(EscalationRole::TeamLead, false)).await;
        directory.add(staff(EscalationRole::Manager, true)).await;
        let sink = Arc::new(RecordingNotificationSink::new());
        let service = EscalationService::new(
            items.clone(),
            directory,
            sink,
            EscalationPolicy::default(),
        );

        // Three overdue items; all need level 1 and fail identically, so
        // check error isolation with a healthy item at level 1 instead.
        let failing = overdue_item(3);
        let failing_id = failing.id;
        items.insert(failing).await;

        let mut healthy = overdue_item(12);
        healthy.current_escalation_level = 1;
        healthy.last_escalated_at = Some(Utc::now() - Duration::hours(6));
        let healthy_id = healthy.id;
        items.insert(healthy).await;

        let summary = service.sweep(Utc::now()).await.unwrap();
        assert_eq!(summary.escalated, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].work_item_id, failing_id);
        assert!(summary.errors[0].reason.contains("team_lead"));

        assert_eq!(
            items.get(failing_id).await.unwrap().unwrap().current_escalation_level,
            0
        );
        assert_eq!(
            items.get(healthy_id).await.unwrap().unwrap().current_escalation_level,
            2
        );
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_roll_back() {
        let f = fixture().await;
        f.sink.set_failing(true);
        let item = overdue_item(2);
        let id = item.id;
        f.items.insert(item).await;

        let summary = f.service.sweep(Utc::now()).await.unwrap();
        // Commit-then-notify: the transition stands, delivery is best-effort.
        assert_eq!(summary.escalated, 1);
        assert!(!summary.has_errors());
        assert_eq!(
            f.items.get(id).await.unwrap().unwrap().current_escalation_level,
            1
        );
        assert!(f.sink.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_lost_cas_race_counts_as_skip() {
        let f = fixture().await;
        let item = overdue_item(2);
        let id = item.id;
        f.items.insert(item.clone()).await;

        // Simulate a concurrent sweep winning the race before our commit.
        let concurrent = EscalationEvent {
            work_item_id: id,
            from_level: 0,
            to_level: 1,
            role: EscalationRole::TeamLead,
            notified_staff: StaffId::new(),
            overdue_seconds: 7200,
            occurred_at: Utc::now(),
        };
        assert!(f.items.commit_escalation(&concurrent).await.unwrap());

        // The service still holds the stale level-0 snapshot.
        let outcome = f.service.escalate_item(&item, Utc::now()).await.unwrap();
        assert!(matches!(outcome, ItemOutcome::Skipped(_)));
        assert_eq!(
            f.items.get(id).await.unwrap().unwrap().current_escalation_level,
            1
        );
    }

    #[tokio::test]
    async fn test_notice_reports_overdue_duration() {
        let f = fixture().await;
        let now = Utc::now();
        let mut item = overdue_item(0);
        item.deadline = Some(now - Duration::minutes(150));
        f.items.insert(item).await;

        f.service.sweep(now).await.unwrap();
        let sent = f.sink.sent().await;
        assert_eq!(sent[0].overdue_seconds, 150 * 60);
        assert!(sent[0].message.contains("2h30m"));
    }

    #[tokio::test]
    async fn test_inactive_staff_is_never_resolved() {
        let f = fixture().await;
        let inactive = staff(EscalationRole::TeamLead, false);
        f.directory.add(inactive).await;

        let resolved = f
            .directory
            .resolve_role(EscalationRole::TeamLead)
            .await
            .unwrap()
            .unwrap();
        assert!(resolved.is_active);
    }

    #[test]
    fn test_policy_defaults() {
        let policy = EscalationPolicy::default();
        assert_eq!(policy.max_level, 3);
        assert_eq!(policy.grace_window(), Duration::hours(1));
        assert_eq!(policy.re_escalation_interval(), Duration::hours(4));
        assert_eq!(policy.role_for_level(1), Some(EscalationRole::TeamLead));
        assert_eq!(policy.role_for_level(3), Some(EscalationRole::Admin));
        assert_eq!(policy.role_for_level(4), None);
    }
}
