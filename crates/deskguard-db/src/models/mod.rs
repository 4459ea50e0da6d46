//! Row models and Postgres-backed store implementations.
//!
//! Each store implements the corresponding trait from `deskguard-review`;
//! the rest of the system never sees SQL.

pub mod draft_review;
pub mod learning_example;
pub mod staff_member;
pub mod work_item;

pub use draft_review::PgDraftReviewStore;
pub use learning_example::PgLearningExampleStore;
pub use staff_member::PgStaffDirectory;
pub use work_item::PgWorkItemStore;

use deskguard_review::{QualityScore, ReviewError};

/// Convert a `SMALLINT` quality score column into the validated domain type.
///
/// The column carries a CHECK constraint, so a failure here means the
/// schema and the domain disagree.
pub(crate) fn quality_score_from_db(value: i16) -> Result<QualityScore, ReviewError> {
    // Out-of-u8 values are clamped before validation; the error carries
    // the clamped value.
    let value = u8::try_from(value.clamp(0, i16::from(u8::MAX))).unwrap_or(u8::MAX);
    QualityScore::new(value)
}
