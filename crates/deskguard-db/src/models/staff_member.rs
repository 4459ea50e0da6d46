//! Staff member row model and Postgres directory.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

use deskguard_review::services::{StaffDirectory, StaffMember};
use deskguard_review::{EscalationRole, Result, StaffId};

/// Raw `staff_members` row.
#[derive(Debug, Clone, FromRow)]
pub struct StaffMemberRow {
    pub id: Uuid,
    pub display_name: String,
    pub role: EscalationRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<StaffMemberRow> for StaffMember {
    fn from(row: StaffMemberRow) -> Self {
        StaffMember {
            id: row.id.into(),
            display_name: row.display_name,
            role: row.role,
            is_active: row.is_active,
        }
    }
}

/// Postgres-backed staff directory.
#[derive(Debug, Clone)]
pub struct PgStaffDirectory {
    pool: PgPool,
}

impl PgStaffDirectory {
    /// Create a new directory over a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StaffDirectory for PgStaffDirectory {
    async fn resolve_role(&self, role: EscalationRole) -> Result<Option<StaffMember>> {
        // Longest-tenured active holder wins, so resolution is stable
        // between sweeps.
        let row: Option<StaffMemberRow> = sqlx::query_as(
            r#"
            SELECT * FROM staff_members
            WHERE role = $1 AND is_active
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get(&self, id: StaffId) -> Result<Option<StaffMember>> {
        let row: Option<StaffMemberRow> =
            sqlx::query_as("SELECT * FROM staff_members WHERE id = $1")
                .bind(id.into_inner())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Into::into))
    }
}
