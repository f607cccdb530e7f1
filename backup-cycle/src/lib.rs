//! Backup Cycle Library
//!
//! Weekly full/incremental database backups with retention pruning: one
//! full backup on a configured weekday, incrementals against it on every
//! other day, and removal of whole weeks that fall out of the retention
//! window.

pub mod config;
pub mod executor;
pub mod limits;
pub mod notify;
pub mod orchestrator;
pub mod repository;
pub mod schedule;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use utils::errors::CycleError;
pub type Result<T> = std::result::Result<T, CycleError>;
