//! Process resource limits applied before the backup tool is started.
//!
//! innobackupex keeps one descriptor open per tablespace, so large servers
//! need a higher open-files limit than the usual default. The limit is
//! inherited by the child process.

use crate::utils::errors::{CycleError, Result};
use nix::sys::resource::{getrlimit, setrlimit, Resource};
use tracing::info;

/// Set the soft `RLIMIT_NOFILE` to `limit`.
///
/// The hard limit is only touched when `limit` exceeds it, which needs
/// privileges; it is never lowered.
pub fn set_open_files(limit: u64) -> Result<()> {
    let (soft, hard) = getrlimit(Resource::RLIMIT_NOFILE)
        .map_err(|e| CycleError::ResourceLimit(format!("cannot read open files limit: {}", e)))?;

    setrlimit(Resource::RLIMIT_NOFILE, limit, limits_for(limit, hard)).map_err(|e| {
        CycleError::ResourceLimit(format!(
            "cannot set open files limit to {} (current soft {}, hard {}): {}",
            limit, soft, hard, e
        ))
    })?;

    info!("Open files limit set to {} (was {}/{})", limit, soft, hard);
    Ok(())
}

/// Hard limit to request alongside a soft limit of `limit`.
fn limits_for(limit: u64, hard: u64) -> u64 {
    limit.max(hard)
}
