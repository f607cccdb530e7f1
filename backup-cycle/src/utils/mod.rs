//! Utility modules for the backup cycle.

pub mod errors;
pub mod logger;

pub use errors::{CycleError, Result};
