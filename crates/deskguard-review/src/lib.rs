//! Review and escalation domain logic for AI-drafted helpdesk replies.
//!
//! This crate decides what happens to each AI-drafted reply before it reaches
//! a customer, tracks the human review lifecycle, curates approved replies
//! into a learning example pool, and escalates overdue work items through a
//! staff hierarchy.
//!
//! # Features
//!
//! - Deterministic rule-table triage of draft replies (auto-send, hold,
//!   escalate) driven by confidence, intent, sentiment and priority signals
//! - Draft review lifecycle with an optimistic pending precondition so two
//!   reviewers cannot both resolve the same draft
//! - Idempotent promotion of high-quality reviewed replies into a
//!   per-intent learning example pool
//! - Deadline-driven hierarchical escalation with a grace window,
//!   re-escalation back-off and compare-and-swap level transitions
//!
//! # Services
//!
//! The [`services`] module provides the business logic:
//! - [`services::ReviewService`] - Create and resolve draft reviews
//! - [`services::CuratorService`] - Promote and rank learning examples
//! - [`services::EscalationService`] - Sweep overdue work items
//!
//! # Jobs
//!
//! The [`jobs`] module wraps the escalation sweep in a poll loop:
//! - [`jobs::EscalationJob`] - Periodic sweep with a single-flight guard
//!
//! Stores are trait objects ([`services::DraftReviewStore`],
//! [`services::LearningExampleStore`], [`services::WorkItemStore`]) with
//! in-memory implementations for testing; the Postgres implementations live
//! in the companion `deskguard-db` crate.

pub mod decision;
pub mod error;
pub mod jobs;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{ReviewError, Result};
pub use types::{
    EscalationRole,
    ExampleId,
    Intent,
    Priority,
    QualityScore,
    ReviewId,
    ReviewStatus,
    Sentiment,
    StaffId,
    Verdict,
    WorkItemId,
};

// Re-export the decision engine
pub use decision::{decide, decide_for_failed_generation, Decision, DraftSignals, ReviewPolicy};

// Re-export service types
pub use services::{
    CreateDraftReviewInput,
    CuratorService,
    DraftReview,
    DraftReviewStore,
    EscalationEvent,
    EscalationNotice,
    EscalationPolicy,
    EscalationService,
    ExamplePoolStats,
    InMemoryDraftReviewStore,
    InMemoryLearningExampleStore,
    InMemoryStaffDirectory,
    InMemoryWorkItemStore,
    LearningExample,
    LearningExampleStore,
    NotificationSink,
    RecordingNotificationSink,
    ReviewService,
    ReviewTransition,
    StaffDirectory,
    StaffMember,
    SweepSummary,
    WorkItem,
    WorkItemStore,
};

// Re-export the escalation job
pub use jobs::EscalationJob;
