//! Error types for the review and escalation domain.

use thiserror::Error;

use crate::types::{EscalationRole, ExampleId, ReviewId, ReviewStatus, WorkItemId};

/// Errors returned by review, curation and escalation operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Malformed input to a creation or mutation call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Quality score outside the accepted 1..=5 range.
    #[error("quality score must be between 1 and 5, got {0}")]
    InvalidQualityScore(u8),

    /// The draft review was already handled by another reviewer.
    #[error("draft review {id} was already reviewed (status: {status})")]
    AlreadyReviewed { id: ReviewId, status: ReviewStatus },

    /// Draft review not found.
    #[error("draft review not found: {0}")]
    ReviewNotFound(ReviewId),

    /// Learning example not found.
    #[error("learning example not found: {0}")]
    ExampleNotFound(ExampleId),

    /// Work item not found.
    #[error("work item not found: {0}")]
    WorkItemNotFound(WorkItemId),

    /// No active staff member holds the escalation role for this level.
    #[error("no active staff member holds role {role} for work item {item}")]
    UnresolvableEscalationTarget {
        item: WorkItemId,
        role: EscalationRole,
    },

    /// Notification delivery failed. Best-effort: never rolls back an
    /// already-committed escalation transition.
    #[error("notification delivery failed: {0}")]
    NotificationDelivery(String),

    /// The draft source failed to produce a response. Callers treat the
    /// absent draft as maximally untrusted (confidence 0.0).
    #[error("draft generation failed: {0}")]
    Generation(String),

    /// Database error.
    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl ReviewError {
    /// Whether this error maps to a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ReviewNotFound(_)
                | Self::ExampleNotFound(_)
                | Self::WorkItemNotFound(_)
        )
    }

    /// Whether this error is a state conflict the caller can resolve by
    /// refreshing (e.g. the review was handled by someone else).
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyReviewed { .. })
    }

    /// Whether this error is a violated optimistic precondition.
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::AlreadyReviewed { .. })
    }

    /// Whether a sweep should record this error and continue rather than
    /// abort.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            Self::UnresolvableEscalationTarget { .. } | Self::NotificationDelivery(_)
        )
    }
}

/// Result type alias for review domain operations.
pub type Result<T, E = ReviewError> = std::result::Result<T, E>;
