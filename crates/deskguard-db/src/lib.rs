//! `PostgreSQL` persistence for the deskguard review and escalation domain.
//!
//! Provides the connection pool, embedded migrations, and store
//! implementations for the traits defined in `deskguard-review`:
//!
//! - [`PgDraftReviewStore`] - draft review lifecycle with the pending-status
//!   precondition enforced in SQL
//! - [`PgLearningExampleStore`] - learning example pool with promotion
//!   idempotency via a unique source-review constraint
//! - [`PgWorkItemStore`] - work item escalation state with transactional
//!   compare-and-swap level transitions
//! - [`PgStaffDirectory`] - staff role resolution

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use models::{PgDraftReviewStore, PgLearningExampleStore, PgStaffDirectory, PgWorkItemStore};
pub use pool::DbPool;
