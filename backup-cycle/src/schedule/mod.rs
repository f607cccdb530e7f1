//! Weekly backup schedule: calendar arithmetic, cycle resolution and
//! retention planning. Everything here is pure apart from existence checks
//! delegated to a [`crate::repository::BackupSetRepository`].

pub mod calendar;
pub mod cycle;
pub mod retention;

pub use cycle::{anchor_full_date, resolve_today, BackupKind};
pub use retention::{plan_retention, PlannedDeletion, RetentionPlan, RetentionWindow};
