//! Work item row model and Postgres store.
//!
//! `commit_escalation` runs the compare-and-swap and the audit event insert
//! in one transaction: either the level moves and the event exists, or
//! neither happened.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

use deskguard_review::services::{EscalationEvent, WorkItem, WorkItemStore};
use deskguard_review::{EscalationRole, Result, WorkItemId};

/// Raw `work_items` row.
#[derive(Debug, Clone, FromRow)]
pub struct WorkItemRow {
    pub id: Uuid,
    pub subject: String,
    pub deadline: Option<DateTime<Utc>>,
    pub current_escalation_level: i32,
    pub last_escalated_at: Option<DateTime<Utc>>,
    pub assignee: Option<Uuid>,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
}

impl From<WorkItemRow> for WorkItem {
    fn from(row: WorkItemRow) -> Self {
        WorkItem {
            id: row.id.into(),
            subject: row.subject,
            deadline: row.deadline,
            current_escalation_level: row.current_escalation_level,
            last_escalated_at: row.last_escalated_at,
            assignee: row.assignee.map(Into::into),
            is_open: row.is_open,
        }
    }
}

/// Raw `escalation_events` row.
#[derive(Debug, Clone, FromRow)]
pub struct EscalationEventRow {
    pub id: Uuid,
    pub work_item_id: Uuid,
    pub from_level: i32,
    pub to_level: i32,
    pub role: EscalationRole,
    pub notified_staff: Uuid,
    pub overdue_seconds: i64,
    pub occurred_at: DateTime<Utc>,
}

impl From<EscalationEventRow> for EscalationEvent {
    fn from(row: EscalationEventRow) -> Self {
        EscalationEvent {
            work_item_id: row.work_item_id.into(),
            from_level: row.from_level,
            to_level: row.to_level,
            role: row.role,
            notified_staff: row.notified_staff.into(),
            overdue_seconds: row.overdue_seconds,
            occurred_at: row.occurred_at,
        }
    }
}

/// Postgres-backed work item store.
#[derive(Debug, Clone)]
pub struct PgWorkItemStore {
    pool: PgPool,
}

impl PgWorkItemStore {
    /// Create a new store over a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Escalation history for a work item, oldest first.
    pub async fn escalation_history(&self, id: WorkItemId) -> Result<Vec<EscalationEvent>> {
        let rows: Vec<EscalationEventRow> = sqlx::query_as(
            r#"
            SELECT * FROM escalation_events
            WHERE work_item_id = $1
            ORDER BY occurred_at ASC
            "#,
        )
        .bind(id.into_inner())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait::async_trait]
impl WorkItemStore for PgWorkItemStore {
    async fn list_overdue(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<WorkItem>> {
        let rows: Vec<WorkItemRow> = sqlx::query_as(
            r#"
            SELECT * FROM work_items
            WHERE is_open AND deadline IS NOT NULL AND deadline < $1
            ORDER BY deadline ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get(&self, id: WorkItemId) -> Result<Option<WorkItem>> {
        let row: Option<WorkItemRow> = sqlx::query_as("SELECT * FROM work_items WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn commit_escalation(&self, event: &EscalationEvent) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE work_items
            SET current_escalation_level = $1, last_escalated_at = $2
            WHERE id = $3 AND is_open AND current_escalation_level = $4
            "#,
        )
        .bind(event.to_level)
        .bind(event.occurred_at)
        .bind(event.work_item_id.into_inner())
        .bind(event.from_level)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO escalation_events
                (work_item_id, from_level, to_level, role, notified_staff,
                 overdue_seconds, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.work_item_id.into_inner())
        .bind(event.from_level)
        .bind(event.to_level)
        .bind(event.role)
        .bind(event.notified_staff.into_inner())
        .bind(event.overdue_seconds)
        .bind(event.occurred_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_row_conversion() {
        let row = WorkItemRow {
            id: Uuid::new_v4(),
            subject: "Refund request".to_string(),
            deadline: Some(Utc::now()),
            current_escalation_level: 1,
            last_escalated_at: Some(Utc::now()),
            assignee: None,
            is_open: true,
            created_at: Utc::now(),
        };
        let item = WorkItem::from(row.clone());
        assert_eq!(item.id.into_inner(), row.id);
        assert_eq!(item.current_escalation_level, 1);
        assert!(item.assignee.is_none());
    }

    #[test]
    fn test_event_row_conversion() {
        let row = EscalationEventRow {
            id: Uuid::new_v4(),
            work_item_id: Uuid::new_v4(),
            from_level: 0,
            to_level: 1,
            role: EscalationRole::TeamLead,
            notified_staff: Uuid::new_v4(),
            overdue_seconds: 3600,
            occurred_at: Utc::now(),
        };
        let event = EscalationEvent::from(row);
        assert_eq!(event.from_level, 0);
        assert_eq!(event.to_level, 1);
        assert_eq!(event.role, EscalationRole::TeamLead);
    }
}
