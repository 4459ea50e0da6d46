//! Type definitions for the review and escalation domain.
//!
//! Includes newtype wrappers for IDs and closed enums for domain values.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ReviewError;

// ============================================================================
// ID Types (Newtype Pattern)
// ============================================================================

/// Unique identifier for a draft review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub Uuid);

impl ReviewId {
    /// Create a new random ReviewId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ReviewId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<ReviewId> for Uuid {
    fn from(id: ReviewId) -> Self {
        id.0
    }
}

/// Unique identifier for a learning example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExampleId(pub Uuid);

impl ExampleId {
    /// Create a new random ExampleId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ExampleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ExampleId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<ExampleId> for Uuid {
    fn from(id: ExampleId) -> Self {
        id.0
    }
}

/// Unique identifier for a work item (ticket or internal task) under
/// escalation tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(pub Uuid);

impl WorkItemId {
    /// Create a new random WorkItemId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for WorkItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for WorkItemId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<WorkItemId> for Uuid {
    fn from(id: WorkItemId) -> Self {
        id.0
    }
}

/// Unique identifier for a staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(pub Uuid);

impl StaffId {
    /// Create a new random StaffId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for StaffId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for StaffId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<StaffId> for Uuid {
    fn from(id: StaffId) -> Self {
        id.0
    }
}

// ============================================================================
// Domain Enums
// ============================================================================

/// Lifecycle status of a draft review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "review_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Awaiting a human decision.
    Pending,
    /// Approved as drafted.
    Approved,
    /// Approved with staff edits.
    Edited,
    /// Rejected by staff.
    Rejected,
}

impl ReviewStatus {
    /// Check if the review can still be actioned.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Check if the review has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Edited => write!(f, "edited"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// The decision engine's output for a drafted response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The draft may be released without human involvement.
    AutoSend,
    /// A human must act before the draft can be sent.
    HoldForReview,
    /// The draft must be routed to a senior reviewer.
    Escalate,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoSend => write!(f, "auto_send"),
            Self::HoldForReview => write!(f, "hold_for_review"),
            Self::Escalate => write!(f, "escalate"),
        }
    }
}

/// Detected sentiment of the requester's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Angry,
    Negative,
    Neutral,
    Positive,
}

/// Priority of the underlying ticket or task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
    Critical,
}

impl Priority {
    /// Whether this priority vetoes automatic sending on its own.
    pub fn is_escalation_worthy(&self) -> bool {
        matches!(self, Self::Urgent | Self::Critical)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
            Self::Urgent => write!(f, "urgent"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Intent label attached to a requester message by the classifier.
///
/// Intents are open-ended strings ("refund", "shipping", ...); the only
/// label with special meaning is `unknown`, which marks a message the
/// classifier could not place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Intent(String);

impl Intent {
    pub const UNKNOWN_LABEL: &'static str = "unknown";

    /// Create an intent from a classifier label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The sentinel intent for unclassified messages.
    pub fn unknown() -> Self {
        Self(Self::UNKNOWN_LABEL.to_string())
    }

    /// Whether the classifier failed to place this message.
    ///
    /// An empty label is treated the same as the explicit `unknown` label.
    pub fn is_unknown(&self) -> bool {
        self.0.is_empty() || self.0.eq_ignore_ascii_case(Self::UNKNOWN_LABEL)
    }

    /// Get the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Intent {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for Intent {
    fn from(label: String) -> Self {
        Self(label)
    }
}

/// Role in the escalation hierarchy.
///
/// Escalation level N is served by the Nth role of the configured
/// hierarchy; resolution to a concrete staff member happens at
/// escalation time through a [`StaffDirectory`](crate::services::escalation::StaffDirectory).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "escalation_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EscalationRole {
    TeamLead,
    Manager,
    Admin,
}

impl EscalationRole {
    /// Get the role as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TeamLead => "team_lead",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for EscalationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Quality Score
// ============================================================================

/// A staff quality rating for a reviewed draft, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct QualityScore(u8);

impl QualityScore {
    /// Lowest possible rating. Recorded on rejection for aggregate
    /// statistics, not as a real staff rating.
    pub const MIN: QualityScore = QualityScore(1);

    /// Highest possible rating.
    pub const MAX: QualityScore = QualityScore(5);

    /// Minimum rating at which a review qualifies for promotion into the
    /// learning example pool.
    pub const PROMOTION_THRESHOLD: u8 = 4;

    /// Create a score, validating the 1..=5 range.
    pub fn new(value: u8) -> Result<Self, ReviewError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ReviewError::InvalidQualityScore(value))
        }
    }

    /// Get the numeric rating.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Whether a review with this rating qualifies for the example pool.
    pub fn is_promotable(&self) -> bool {
        self.0 >= Self::PROMOTION_THRESHOLD
    }
}

impl TryFrom<u8> for QualityScore {
    type Error = ReviewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QualityScore> for u8 {
    fn from(score: QualityScore) -> Self {
        score.0
    }
}

impl fmt::Display for QualityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
