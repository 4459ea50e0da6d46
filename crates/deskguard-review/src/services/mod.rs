//! Domain services for draft review, example curation and escalation.

pub mod curator;
pub mod escalation;
pub mod review;

pub use curator::{
    CuratorService, ExamplePoolStats, InMemoryLearningExampleStore, LearningExample,
    LearningExampleStore,
};
pub use escalation::{
    EscalationEvent, EscalationNotice, EscalationPolicy, EscalationService,
    InMemoryStaffDirectory, InMemoryWorkItemStore, NotificationSink, RecordingNotificationSink,
    StaffDirectory, StaffMember, SweepError, SweepSummary, WorkItem, WorkItemStore,
    DEFAULT_SWEEP_BATCH_SIZE,
};
pub use review::{
    CreateDraftReviewInput, DraftReview, DraftReviewStore, InMemoryDraftReviewStore,
    ReviewService, ReviewTransition,
};
