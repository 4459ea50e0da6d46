//! Draft review row model and Postgres store.
//!
//! The pending-status precondition lives in the SQL itself: every
//! transition is `UPDATE ... WHERE status = 'pending' RETURNING *`, so a
//! review that was already decided simply matches no row.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

use deskguard_review::services::{CreateDraftReviewInput, DraftReviewStore, ReviewTransition};
use deskguard_review::{DraftReview, Intent, QualityScore, Result, ReviewStatus};

use super::quality_score_from_db;

/// Raw `draft_reviews` row.
#[derive(Debug, Clone, FromRow)]
pub struct DraftReviewRow {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub requester_message: String,
    pub draft_content: String,
    pub intent: String,
    pub confidence: f32,
    pub status: ReviewStatus,
    pub quality_score: Option<i16>,
    pub final_content: Option<String>,
    pub feedback_note: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl DraftReviewRow {
    fn into_domain(self) -> Result<DraftReview> {
        let quality_score = self.quality_score.map(quality_score_from_db).transpose()?;
        Ok(DraftReview {
            id: self.id.into(),
            subject_id: self.subject_id.into(),
            requester_message: self.requester_message,
            draft_content: self.draft_content,
            intent: Intent::new(self.intent),
            confidence: self.confidence,
            status: self.status,
            quality_score,
            final_content: self.final_content,
            feedback_note: self.feedback_note,
            reviewed_by: self.reviewed_by.map(Into::into),
            created_at: self.created_at,
            reviewed_at: self.reviewed_at,
        })
    }
}

/// Postgres-backed draft review store.
#[derive(Debug, Clone)]
pub struct PgDraftReviewStore {
    pool: PgPool,
}

impl PgDraftReviewStore {
    /// Create a new store over a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DraftReviewStore for PgDraftReviewStore {
    async fn create(&self, input: CreateDraftReviewInput) -> Result<DraftReview> {
        let row: DraftReviewRow = sqlx::query_as(
            r#"
            INSERT INTO draft_reviews
                (subject_id, requester_message, draft_content, intent, confidence)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(input.subject_id.into_inner())
        .bind(&input.requester_message)
        .bind(&input.draft_content)
        .bind(input.intent.as_str())
        .bind(input.confidence)
        .fetch_one(&self.pool)
        .await?;

        row.into_domain()
    }

    async fn get(&self, id: deskguard_review::ReviewId) -> Result<Option<DraftReview>> {
        let row: Option<DraftReviewRow> =
            sqlx::query_as("SELECT * FROM draft_reviews WHERE id = $1")
                .bind(id.into_inner())
                .fetch_optional(&self.pool)
                .await?;

        row.map(DraftReviewRow::into_domain).transpose()
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<DraftReview>> {
        let rows: Vec<DraftReviewRow> = sqlx::query_as(
            r#"
            SELECT * FROM draft_reviews
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DraftReviewRow::into_domain).collect()
    }

    async fn transition(
        &self,
        id: deskguard_review::ReviewId,
        transition: ReviewTransition,
    ) -> Result<Option<DraftReview>> {
        let row: Option<DraftReviewRow> = match transition {
            ReviewTransition::Approve { staff, quality } => {
                sqlx::query_as(
                    r#"
                    UPDATE draft_reviews
                    SET status = 'approved',
                        quality_score = $2,
                        final_content = draft_content,
                        reviewed_by = $3,
                        reviewed_at = NOW()
                    WHERE id = $1 AND status = 'pending'
                    RETURNING *
                    "#,
                )
                .bind(id.into_inner())
                .bind(i16::from(quality.value()))
                .bind(staff.into_inner())
                .fetch_optional(&self.pool)
                .await?
            }
            ReviewTransition::EditAndApprove {
                staff,
                content,
                quality,
                note,
            } => {
                sqlx::query_as(
                    r#"
                    UPDATE draft_reviews
                    SET status = 'edited',
                        quality_score = $2,
                        final_content = $3,
                        feedback_note = $4,
                        reviewed_by = $5,
                        reviewed_at = NOW()
                    WHERE id = $1 AND status = 'pending'
                    RETURNING *
                    "#,
                )
                .bind(id.into_inner())
                .bind(i16::from(quality.value()))
                .bind(&content)
                .bind(note.as_deref())
                .bind(staff.into_inner())
                .fetch_optional(&self.pool)
                .await?
            }
            ReviewTransition::Reject { staff, note } => {
                sqlx::query_as(
                    r#"
                    UPDATE draft_reviews
                    SET status = 'rejected',
                        quality_score = $2,
                        final_content = NULL,
                        feedback_note = $3,
                        reviewed_by = $4,
                        reviewed_at = NOW()
                    WHERE id = $1 AND status = 'pending'
                    RETURNING *
                    "#,
                )
                .bind(id.into_inner())
                .bind(i16::from(QualityScore::MIN.value()))
                .bind(&note)
                .bind(staff.into_inner())
                .fetch_optional(&self.pool)
                .await?
            }
        };

        row.map(DraftReviewRow::into_domain).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_row() -> DraftReviewRow {
        DraftReviewRow {
            id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            requester_message: "where is my refund?".to_string(),
            draft_content: "your refund is on its way".to_string(),
            intent: "refund".to_string(),
            confidence: 0.82,
            status: ReviewStatus::Pending,
            quality_score: None,
            final_content: None,
            feedback_note: None,
            reviewed_by: None,
            created_at: Utc::now(),
            reviewed_at: None,
        }
    }

    #[test]
    fn test_row_conversion_pending() {
        let row = pending_row();
        let review = row.clone().into_domain().unwrap();
        assert_eq!(review.id.into_inner(), row.id);
        assert_eq!(review.status, ReviewStatus::Pending);
        assert!(review.quality_score.is_none());
        assert_eq!(review.intent.as_str(), "refund");
    }

    #[test]
    fn test_row_conversion_decided() {
        let mut row = pending_row();
        row.status = ReviewStatus::Approved;
        row.quality_score = Some(5);
        row.final_content = Some(row.draft_content.clone());
        row.reviewed_by = Some(Uuid::new_v4());
        row.reviewed_at = Some(Utc::now());

        let review = row.into_domain().unwrap();
        assert_eq!(review.quality_score.unwrap().value(), 5);
        assert!(review.reviewed_by.is_some());
    }

    #[test]
    fn test_row_conversion_rejects_bad_score() {
        let mut row = pending_row();
        row.quality_score = Some(9);
        assert!(row.into_domain().is_err());
    }
}
