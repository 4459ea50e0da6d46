//! Draft review lifecycle.
//!
//! A [`DraftReview`] is created whenever the decision engine holds or
//! escalates an AI-drafted response (auto-sent drafts need no review
//! record). Staff then approve, edit-and-approve, or reject it. Reviews are
//! terminal once decided; the pending-status precondition is enforced in the
//! store so duplicate submissions (a double-click, a second reviewer) fail
//! cleanly with [`ReviewError::AlreadyReviewed`] instead of corrupting
//! state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ReviewError, Result};
use crate::types::{Intent, QualityScore, ReviewId, ReviewStatus, StaffId, WorkItemId};

use super::curator::CuratorService;

// ============================================================================
// Domain Types
// ============================================================================

/// One AI-generated response awaiting or having received human judgment.
///
/// Invariants (enforced by [`ReviewService`] and the store transition):
/// `quality_score`, `reviewed_at` and `reviewed_by` are set iff the status
/// is terminal; `final_content` is set iff the status is approved or edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftReview {
    /// Unique identifier.
    pub id: ReviewId,
    /// The ticket or task this draft belongs to.
    pub subject_id: WorkItemId,
    /// The requester message that produced the draft.
    pub requester_message: String,
    /// The AI-drafted response text.
    pub draft_content: String,
    /// Classified intent of the requester message.
    pub intent: Intent,
    /// Generation confidence in [0, 1].
    pub confidence: f32,
    /// Lifecycle status.
    pub status: ReviewStatus,
    /// Staff rating, set once the review leaves pending. Rejection records
    /// the minimum score for aggregate statistics.
    pub quality_score: Option<QualityScore>,
    /// The text that was (or would have been) sent: the draft when approved
    /// unedited, the staff text when edited, absent when rejected.
    pub final_content: Option<String>,
    /// Optional free-text staff feedback.
    pub feedback_note: Option<String>,
    /// The staff member who decided the review.
    pub reviewed_by: Option<StaffId>,
    /// When the draft was stored for review.
    pub created_at: DateTime<Utc>,
    /// When the review was decided.
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Input for creating a draft review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDraftReviewInput {
    pub subject_id: WorkItemId,
    pub requester_message: String,
    pub draft_content: String,
    pub intent: Intent,
    pub confidence: f32,
}

/// A staff decision to apply to a pending review.
#[derive(Debug, Clone)]
pub enum ReviewTransition {
    /// Approve the draft as written.
    Approve {
        staff: StaffId,
        quality: QualityScore,
    },
    /// Approve a staff-edited version of the draft.
    EditAndApprove {
        staff: StaffId,
        content: String,
        quality: QualityScore,
        note: Option<String>,
    },
    /// Reject the draft outright.
    Reject { staff: StaffId, note: String },
}

// ============================================================================
// Store Trait
// ============================================================================

/// Trait for draft review storage backends.
#[async_trait::async_trait]
pub trait DraftReviewStore: Send + Sync {
    /// Persist a new pending review.
    async fn create(&self, input: CreateDraftReviewInput) -> Result<DraftReview>;

    /// Get a review by ID.
    async fn get(&self, id: ReviewId) -> Result<Option<DraftReview>>;

    /// Oldest-first queue of pending reviews for the review UI.
    async fn list_pending(&self, limit: usize) -> Result<Vec<DraftReview>>;

    /// Apply a staff decision iff the stored status is still pending.
    ///
    /// Returns `None` when the review does not exist or was already decided
    /// (the optimistic precondition); the mutation is all-or-nothing.
    async fn transition(
        &self,
        id: ReviewId,
        transition: ReviewTransition,
    ) -> Result<Option<DraftReview>>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

/// In-memory draft review store for testing.
#[derive(Debug, Default)]
pub struct InMemoryDraftReviewStore {
    reviews: Arc<RwLock<HashMap<Uuid, DraftReview>>>,
}

impl InMemoryDraftReviewStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self {
            reviews: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the review count.
    pub async fn count(&self) -> usize {
        self.reviews.read().await.len()
    }

    /// Clear all data.
    pub async fn clear(&self) {
        self.reviews.write().await.clear();
    }
}

fn apply_transition(review: &mut DraftReview, transition: ReviewTransition, now: DateTime<Utc>) {
    match transition {
        ReviewTransition::Approve { staff, quality } => {
            review.status = ReviewStatus::Approved;
            review.quality_score = Some(quality);
            review.final_content = Some(review.draft_content.clone());
            review.reviewed_by = Some(staff);
        }
        ReviewTransition::EditAndApprove {
            staff,
            content,
            quality,
            note,
        } => {
            review.status = ReviewStatus::Edited;
            review.quality_score = Some(quality);
            review.final_content = Some(content);
            review.feedback_note = note;
            review.reviewed_by = Some(staff);
        }
        ReviewTransition::Reject { staff, note } => {
            review.status = ReviewStatus::Rejected;
            review.quality_score = Some(QualityScore::MIN);
            review.final_content = None;
            review.feedback_note = Some(note);
            review.reviewed_by = Some(staff);
        }
    }
    review.reviewed_at = Some(now);
}

#[async_trait::async_trait]
impl DraftReviewStore for InMemoryDraftReviewStore {
    async fn create(&self, input: CreateDraftReviewInput) -> Result<DraftReview> {
        let review = DraftReview {
            id: ReviewId::new(),
            subject_id: input.subject_id,
            requester_message: input.requester_message,
            draft_content: input.draft_content,
            intent: input.intent,
            confidence: input.confidence,
            status: ReviewStatus::Pending,
            quality_score: None,
            final_content: None,
            feedback_note: None,
            reviewed_by: None,
            created_at: Utc::now(),
            reviewed_at: None,
        };

        let mut reviews = self.reviews.write().await;
        reviews.insert(review.id.into_inner(), review.clone());
        Ok(review)
    }

    async fn get(&self, id: ReviewId) -> Result<Option<DraftReview>> {
        Ok(self.reviews.read().await.get(&id.into_inner()).cloned())
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<DraftReview>> {
        let reviews = self.reviews.read().await;
        let mut pending: Vec<_> = reviews
            .values()
            .filter(|r| r.status.is_pending())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        pending.truncate(limit);
        Ok(pending)
    }

    async fn transition(
        &self,
        id: ReviewId,
        transition: ReviewTransition,
    ) -> Result<Option<DraftReview>> {
        let mut reviews = self.reviews.write().await;
        match reviews.get_mut(&id.into_inner()) {
            Some(review) if review.status.is_pending() => {
                apply_transition(review, transition, Utc::now());
                Ok(Some(review.clone()))
            }
            _ => Ok(None),
        }
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service for the draft review lifecycle.
///
/// Approvals with a promotable quality score feed the curator synchronously
/// after the review transition commits; promotion is idempotent on the
/// review ID, so a retried submission cannot double-promote.
pub struct ReviewService {
    store: Arc<dyn DraftReviewStore>,
    curator: Arc<CuratorService>,
}

impl ReviewService {
    /// Create a new review service.
    pub fn new(store: Arc<dyn DraftReviewStore>, curator: Arc<CuratorService>) -> Self {
        Self { store, curator }
    }

    /// Store an AI-drafted response for human review.
    ///
    /// Non-finite confidence values are normalized to 0.0 (a draft we know
    /// nothing about is maximally untrusted); finite values are clamped
    /// into [0, 1].
    pub async fn create_draft_review(
        &self,
        mut input: CreateDraftReviewInput,
    ) -> Result<DraftReview> {
        if input.draft_content.trim().is_empty() {
            return Err(ReviewError::Validation(
                "draft content must not be empty".to_string(),
            ));
        }

        input.confidence = if input.confidence.is_finite() {
            input.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let review = self.store.create(input).await?;
        info!(
            review_id = %review.id,
            subject_id = %review.subject_id,
            intent = %review.intent,
            confidence = review.confidence,
            "Stored draft for human review"
        );
        Ok(review)
    }

    /// Approve a pending draft as written.
    pub async fn approve(&self, id: ReviewId, staff: StaffId, quality: u8) -> Result<DraftReview> {
        let quality = QualityScore::new(quality)?;
        let review = self
            .commit(id, ReviewTransition::Approve { staff, quality })
            .await?;
        self.maybe_promote(&review).await;
        Ok(review)
    }

    /// Approve a staff-edited version of a pending draft.
    pub async fn edit_and_approve(
        &self,
        id: ReviewId,
        staff: StaffId,
        edited_content: String,
        quality: u8,
        note: Option<String>,
    ) -> Result<DraftReview> {
        if edited_content.trim().is_empty() {
            return Err(ReviewError::Validation(
                "edited content must not be empty".to_string(),
            ));
        }
        let quality = QualityScore::new(quality)?;
        let review = self
            .commit(
                id,
                ReviewTransition::EditAndApprove {
                    staff,
                    content: edited_content,
                    quality,
                    note,
                },
            )
            .await?;
        self.maybe_promote(&review).await;
        Ok(review)
    }

    /// Reject a pending draft.
    ///
    /// Rejection records the minimum quality score for aggregate
    /// statistics; it is not a real staff rating.
    pub async fn reject(&self, id: ReviewId, staff: StaffId, note: String) -> Result<DraftReview> {
        self.commit(id, ReviewTransition::Reject { staff, note })
            .await
    }

    /// Get a review by ID.
    pub async fn get_review(&self, id: ReviewId) -> Result<DraftReview> {
        self.store
            .get(id)
            .await?
            .ok_or(ReviewError::ReviewNotFound(id))
    }

    /// Oldest-first queue of pending reviews.
    pub async fn pending_reviews(&self, limit: usize) -> Result<Vec<DraftReview>> {
        self.store.list_pending(limit).await
    }

    /// Apply a transition, mapping a failed precondition to the right error.
    async fn commit(&self, id: ReviewId, transition: ReviewTransition) -> Result<DraftReview> {
        match self.store.transition(id, transition).await? {
            Some(review) => {
                info!(
                    review_id = %id,
                    status = %review.status,
                    "Recorded review decision"
                );
                Ok(review)
            }
            None => {
                let current = self
                    .store
                    .get(id)
                    .await?
                    .ok_or(ReviewError::ReviewNotFound(id))?;
                Err(ReviewError::AlreadyReviewed {
                    id,
                    status: current.status,
                })
            }
        }
    }

    /// Promote a qualifying review into the example pool.
    ///
    /// The review transition is already committed; a curation failure is
    /// logged but does not fail the staff action.
    async fn maybe_promote(&self, review: &DraftReview) {
        let promotable = review
            .quality_score
            .map(|q| q.is_promotable())
            .unwrap_or(false);
        if !promotable {
            return;
        }

        if let Err(e) = self.curator.promote(review).await {
            warn!(
                review_id = %review.id,
                error = %e,
                "Failed to promote reviewed draft into the example pool"
            );
        }
    }
}
