//! Learning example curation.
//!
//! High-quality reviewed drafts are promoted into a ranked pool of
//! (request, response) examples reused as few-shot material when building
//! prompts for the draft source. Examples are immutable once created;
//! deactivation is the only permitted mutation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ReviewError, Result};
use crate::types::{ExampleId, Intent, QualityScore, ReviewId};

use super::review::DraftReview;

// ============================================================================
// Domain Types
// ============================================================================

/// A curated (request, response) pair sourced from a reviewed draft.
///
/// Every example originates from exactly one [`DraftReview`] with a quality
/// score of at least [`QualityScore::PROMOTION_THRESHOLD`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningExample {
    /// Unique identifier.
    pub id: ExampleId,
    /// The review this example was promoted from. At most one example per
    /// review.
    pub source_review_id: ReviewId,
    /// Intent label of the source message.
    pub intent: Intent,
    /// The requester message that produced the draft.
    pub source_message: String,
    /// The staff-approved response text (the edited text when the review
    /// was edited).
    pub response_text: String,
    /// Staff quality rating, always >= 4.
    pub quality_score: QualityScore,
    /// When the example was promoted.
    pub created_at: DateTime<Utc>,
    /// Soft-deletion flag; inactive examples are never retrieved.
    pub active: bool,
}

/// Aggregate counts over the example pool, per intent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExamplePoolStats {
    /// Active example count per intent label.
    pub active_by_intent: HashMap<String, usize>,
    /// Total active examples.
    pub active: usize,
    /// Total deactivated examples.
    pub inactive: usize,
}

// ============================================================================
// Store Trait
// ============================================================================

/// Trait for learning example storage backends.
#[async_trait::async_trait]
pub trait LearningExampleStore: Send + Sync {
    /// Insert an example unless one already exists for its source review.
    ///
    /// Returns the stored example and whether this call created it. The
    /// uniqueness key is `source_review_id`; this is what makes promotion
    /// idempotent under retries.
    async fn insert_if_absent(&self, example: LearningExample)
        -> Result<(LearningExample, bool)>;

    /// Get an example by ID.
    async fn get(&self, id: ExampleId) -> Result<Option<LearningExample>>;

    /// Find the example promoted from a given review, if any.
    async fn find_by_source(&self, review_id: ReviewId) -> Result<Option<LearningExample>>;

    /// Soft-delete an example. Returns false when the ID is unknown.
    async fn deactivate(&self, id: ExampleId) -> Result<bool>;

    /// Best active examples for an intent, ranked by quality score
    /// descending, then creation time descending.
    async fn top_for_intent(&self, intent: &Intent, limit: usize) -> Result<Vec<LearningExample>>;

    /// Best active examples across all intents, same ranking.
    async fn top(&self, limit: usize) -> Result<Vec<LearningExample>>;

    /// Aggregate pool counts.
    async fn stats(&self) -> Result<ExamplePoolStats>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

/// In-memory learning example store for testing.
#[derive(Debug, Default)]
pub struct InMemoryLearningExampleStore {
    examples: Arc<RwLock<HashMap<Uuid, LearningExample>>>,
}

impl InMemoryLearningExampleStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self {
            examples: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the example count.
    pub async fn count(&self) -> usize {
        self.examples.read().await.len()
    }

    /// Clear all data.
    pub async fn clear(&self) {
        self.examples.write().await.clear();
    }
}

fn rank(examples: &mut Vec<LearningExample>) {
    examples.sort_by(|a, b| {
        b.quality_score
            .cmp(&a.quality_score)
            .then(b.created_at.cmp(&a.created_at))
    });
}

#[async_trait::async_trait]
impl LearningExampleStore for InMemoryLearningExampleStore {
    async fn insert_if_absent(
        &self,
        example: LearningExample,
    ) -> Result<(LearningExample, bool)> {
        let mut examples = self.examples.write().await;

        if let Some(existing) = examples
            .values()
            .find(|e| e.source_review_id == example.source_review_id)
        {
            return Ok((existing.clone(), false));
        }

        examples.insert(example.id.into_inner(), example.clone());
        Ok((example, true))
    }

    async fn get(&self, id: ExampleId) -> Result<Option<LearningExample>> {
        Ok(self.examples.read().await.get(&id.into_inner()).cloned())
    }

    async fn find_by_source(&self, review_id: ReviewId) -> Result<Option<LearningExample>> {
        Ok(self
            .examples
            .read()
            .await
            .values()
            .find(|e| e.source_review_id == review_id)
            .cloned())
    }

    async fn deactivate(&self, id: ExampleId) -> Result<bool> {
        let mut examples = self.examples.write().await;
        match examples.get_mut(&id.into_inner()) {
            Some(example) => {
                example.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn top_for_intent(&self, intent: &Intent, limit: usize) -> Result<Vec<LearningExample>> {
        let examples = self.examples.read().await;
        let mut matching: Vec<_> = examples
            .values()
            .filter(|e| e.active && e.intent == *intent)
            .cloned()
            .collect();
        rank(&mut matching);
        matching.truncate(limit);
        Ok(matching)
    }

    async fn top(&self, limit: usize) -> Result<Vec<LearningExample>> {
        let examples = self.examples.read().await;
        let mut all: Vec<_> = examples.values().filter(|e| e.active).cloned().collect();
        rank(&mut all);
        all.truncate(limit);
        Ok(all)
    }

    async fn stats(&self) -> Result<ExamplePoolStats> {
        let examples = self.examples.read().await;
        let mut stats = ExamplePoolStats::default();
        for example in examples.values() {
            if example.active {
                stats.active += 1;
                *stats
                    .active_by_intent
                    .entry(example.intent.as_str().to_string())
                    .or_default() += 1;
            } else {
                stats.inactive += 1;
            }
        }
        Ok(stats)
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service that promotes reviewed drafts and answers example queries.
pub struct CuratorService {
    store: Arc<dyn LearningExampleStore>,
}

impl CuratorService {
    /// Create a new curator service.
    pub fn new(store: Arc<dyn LearningExampleStore>) -> Self {
        Self { store }
    }

    /// Promote a reviewed draft into the example pool.
    ///
    /// Idempotent on the review ID: repeat calls (e.g. a retried review
    /// submission) return the already-promoted example instead of creating
    /// a second one.
    pub async fn promote(&self, review: &DraftReview) -> Result<LearningExample> {
        if !review.status.is_terminal() {
            return Err(ReviewError::Validation(format!(
                "cannot promote review {} while it is still pending",
                review.id
            )));
        }

        let quality = review.quality_score.ok_or_else(|| {
            ReviewError::Validation(format!("review {} has no quality score", review.id))
        })?;
        if !quality.is_promotable() {
            return Err(ReviewError::Validation(format!(
                "review {} has quality {} below the promotion threshold",
                review.id, quality
            )));
        }

        let response_text = review.final_content.clone().ok_or_else(|| {
            ReviewError::Validation(format!(
                "review {} has no final content to promote",
                review.id
            ))
        })?;

        let example = LearningExample {
            id: ExampleId::new(),
            source_review_id: review.id,
            intent: review.intent.clone(),
            source_message: review.requester_message.clone(),
            response_text,
            quality_score: quality,
            created_at: Utc::now(),
            active: true,
        };

        let (stored, created) = self.store.insert_if_absent(example).await?;
        if created {
            info!(
                example_id = %stored.id,
                review_id = %review.id,
                intent = %stored.intent,
                quality = %stored.quality_score,
                "Promoted reviewed draft into the example pool"
            );
        } else {
            debug!(
                example_id = %stored.id,
                review_id = %review.id,
                "Review was already promoted; returning existing example"
            );
        }
        Ok(stored)
    }

    /// Best active examples for an intent, for few-shot prompt seeding.
    pub async fn top_examples_for_intent(
        &self,
        intent: &Intent,
        limit: usize,
    ) -> Result<Vec<LearningExample>> {
        self.store.top_for_intent(intent, limit).await
    }

    /// Best active examples regardless of intent, used when no
    /// intent-specific examples exist yet.
    pub async fn all_top_examples(&self, limit: usize) -> Result<Vec<LearningExample>> {
        self.store.top(limit).await
    }

    /// Soft-delete an example. Historical reviews are unaffected.
    pub async fn deactivate(&self, id: ExampleId) -> Result<()> {
        if self.store.deactivate(id).await? {
            info!(example_id = %id, "Deactivated learning example");
            Ok(())
        } else {
            Err(ReviewError::ExampleNotFound(id))
        }
    }

    /// Aggregate counts over the pool.
    pub async fn stats(&self) -> Result<ExamplePoolStats> {
        self.store.stats().await
    }
}
