//! Learning example row model and Postgres store.
//!
//! Promotion idempotency is the `UNIQUE (source_review_id)` constraint:
//! `INSERT ... ON CONFLICT DO NOTHING` followed by a lookup makes retried
//! promotions return the existing example instead of failing.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

use deskguard_review::services::{ExamplePoolStats, LearningExample, LearningExampleStore};
use deskguard_review::{ExampleId, Intent, Result, ReviewError, ReviewId};

use super::quality_score_from_db;

/// Raw `learning_examples` row.
#[derive(Debug, Clone, FromRow)]
pub struct LearningExampleRow {
    pub id: Uuid,
    pub source_review_id: Uuid,
    pub intent: String,
    pub source_message: String,
    pub response_text: String,
    pub quality_score: i16,
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

impl LearningExampleRow {
    fn into_domain(self) -> Result<LearningExample> {
        Ok(LearningExample {
            id: self.id.into(),
            source_review_id: self.source_review_id.into(),
            intent: Intent::new(self.intent),
            source_message: self.source_message,
            response_text: self.response_text,
            quality_score: quality_score_from_db(self.quality_score)?,
            created_at: self.created_at,
            active: self.active,
        })
    }
}

/// Postgres-backed learning example store.
#[derive(Debug, Clone)]
pub struct PgLearningExampleStore {
    pool: PgPool,
}

impl PgLearningExampleStore {
    /// Create a new store over a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LearningExampleStore for PgLearningExampleStore {
    async fn insert_if_absent(
        &self,
        example: LearningExample,
    ) -> Result<(LearningExample, bool)> {
        let inserted: Option<LearningExampleRow> = sqlx::query_as(
            r#"
            INSERT INTO learning_examples
                (id, source_review_id, intent, source_message, response_text,
                 quality_score, created_at, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source_review_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(example.id.into_inner())
        .bind(example.source_review_id.into_inner())
        .bind(example.intent.as_str())
        .bind(&example.source_message)
        .bind(&example.response_text)
        .bind(i16::from(example.quality_score.value()))
        .bind(example.created_at)
        .bind(example.active)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((row.into_domain()?, true));
        }

        // Lost to an earlier promotion of the same review.
        let existing = self
            .find_by_source(example.source_review_id)
            .await?
            .ok_or(ReviewError::ReviewNotFound(example.source_review_id))?;
        Ok((existing, false))
    }

    async fn get(&self, id: ExampleId) -> Result<Option<LearningExample>> {
        let row: Option<LearningExampleRow> =
            sqlx::query_as("SELECT * FROM learning_examples WHERE id = $1")
                .bind(id.into_inner())
                .fetch_optional(&self.pool)
                .await?;

        row.map(LearningExampleRow::into_domain).transpose()
    }

    async fn find_by_source(&self, review_id: ReviewId) -> Result<Option<LearningExample>> {
        let row: Option<LearningExampleRow> =
            sqlx::query_as("SELECT * FROM learning_examples WHERE source_review_id = $1")
                .bind(review_id.into_inner())
                .fetch_optional(&self.pool)
                .await?;

        row.map(LearningExampleRow::into_domain).transpose()
    }

    async fn deactivate(&self, id: ExampleId) -> Result<bool> {
        let result = sqlx::query("UPDATE learning_examples SET active = FALSE WHERE id = $1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn top_for_intent(&self, intent: &Intent, limit: usize) -> Result<Vec<LearningExample>> {
        let rows: Vec<LearningExampleRow> = sqlx::query_as(
            r#"
            SELECT * FROM learning_examples
            WHERE active AND intent = $1
            ORDER BY quality_score DESC, created_at DESC
            LIMIT $2
            "#,
        )
        .bind(intent.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(LearningExampleRow::into_domain)
            .collect()
    }

    async fn top(&self, limit: usize) -> Result<Vec<LearningExample>> {
        let rows: Vec<LearningExampleRow> = sqlx::query_as(
            r#"
            SELECT * FROM learning_examples
            WHERE active
            ORDER BY quality_score DESC, created_at DESC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(LearningExampleRow::into_domain)
            .collect()
    }

    async fn stats(&self) -> Result<ExamplePoolStats> {
        let per_intent: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT intent, COUNT(*) FROM learning_examples
            WHERE active
            GROUP BY intent
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let (inactive,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM learning_examples WHERE NOT active")
                .fetch_one(&self.pool)
                .await?;

        let mut stats = ExamplePoolStats::default();
        for (intent, count) in per_intent {
            let count = usize::try_from(count).unwrap_or(0);
            stats.active += count;
            stats.active_by_intent.insert(intent, count);
        }
        stats.inactive = usize::try_from(inactive).unwrap_or(0);
        Ok(stats)
    }
}
