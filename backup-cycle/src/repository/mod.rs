//! Backup set identity, naming and storage.
//!
//! A backup set is the data directory produced by one backup run plus the
//! log file that captured the tool's output. Both are derived from the
//! set's date and kind by a fixed naming convention:
//!
//! - data: `<base>/<YYYYMMDD>_full` or `<base>/<YYYYMMDD>_incr`
//! - log:  `<base>/innobackupex_<YYYYMMDD>.log`

pub mod fs;
pub mod memory;

use crate::schedule::calendar::compact;
use crate::schedule::cycle::BackupKind;
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};

pub use fs::FsRepository;
pub use memory::MemoryRepository;

/// One backup set, identified by the day it was taken and its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackupIdentifier {
    pub date: NaiveDate,
    pub kind: BackupKind,
}

impl BackupIdentifier {
    pub fn full(date: NaiveDate) -> Self {
        Self {
            date,
            kind: BackupKind::Full,
        }
    }

    pub fn incremental(date: NaiveDate) -> Self {
        Self {
            date,
            kind: BackupKind::Incremental,
        }
    }

    /// Data directory name, e.g. `20240502_full`.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", compact(self.date), self.kind.suffix())
    }

    /// Log file name, e.g. `innobackupex_20240502.log`.
    pub fn log_name(&self) -> String {
        format!("innobackupex_{}.log", compact(self.date))
    }

    /// Storage location of this set under `base_dir`.
    pub fn location_in(&self, base_dir: &Path) -> BackupSetLocation {
        BackupSetLocation {
            data_path: base_dir.join(self.dir_name()),
            log_path: base_dir.join(self.log_name()),
        }
    }
}

impl fmt::Display for BackupIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} backup of {}", self.kind, self.date)
    }
}

/// Where a backup set lives on disk. The log file may not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSetLocation {
    pub data_path: PathBuf,
    pub log_path: PathBuf,
}

/// Result of removing one backup set. Data and log are removed independently.
#[derive(Debug)]
pub struct DeletionOutcome {
    pub data: std::io::Result<()>,
    /// `None` when there was no log file to remove.
    pub log: Option<std::io::Result<()>>,
}

impl DeletionOutcome {
    pub fn is_clean(&self) -> bool {
        self.data.is_ok() && !matches!(self.log, Some(Err(_)))
    }
}

/// Storage capability consumed by the cycle resolver, retention planner and
/// orchestrator.
pub trait BackupSetRepository {
    /// Storage location for `id`, whether or not it exists.
    fn location_of(&self, id: &BackupIdentifier) -> BackupSetLocation;

    /// Whether the data directory for `id` exists.
    fn exists(&self, id: &BackupIdentifier) -> bool;

    /// Remove the data directory and the log file of a set.
    fn delete(&self, location: &BackupSetLocation) -> DeletionOutcome;
}

impl<T: BackupSetRepository + ?Sized> BackupSetRepository for &T {
    fn location_of(&self, id: &BackupIdentifier) -> BackupSetLocation {
        (**self).location_of(id)
    }

    fn exists(&self, id: &BackupIdentifier) -> bool {
        (**self).exists(id)
    }

    fn delete(&self, location: &BackupSetLocation) -> DeletionOutcome {
        (**self).delete(location)
    }
}
