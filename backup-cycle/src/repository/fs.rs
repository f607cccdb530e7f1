//! Filesystem-backed backup set repository.

use super::{BackupIdentifier, BackupSetLocation, BackupSetRepository, DeletionOutcome};
use std::io;
use std::path::PathBuf;

/// Backup sets stored as directories under a single base directory.
#[derive(Debug, Clone)]
pub struct FsRepository {
    base_dir: PathBuf,
}

impl FsRepository {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl BackupSetRepository for FsRepository {
    fn location_of(&self, id: &BackupIdentifier) -> BackupSetLocation {
        id.location_in(&self.base_dir)
    }

    fn exists(&self, id: &BackupIdentifier) -> bool {
        self.location_of(id).data_path.is_dir()
    }

    fn delete(&self, location: &BackupSetLocation) -> DeletionOutcome {
        let data = std::fs::remove_dir_all(&location.data_path);

        let log = match std::fs::remove_file(&location.log_path) {
            Ok(()) => Some(Ok(())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => Some(Err(e)),
        };

        DeletionOutcome { data, log }
    }
}
