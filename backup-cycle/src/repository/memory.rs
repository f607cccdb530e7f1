//! In-memory backup set repository for exercising planning without a disk.

use super::{BackupIdentifier, BackupSetLocation, BackupSetRepository, DeletionOutcome};
use std::collections::{BTreeSet, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Repository holding a set of identifiers. Locations are derived under a
/// virtual base directory. Data directories registered with
/// [`MemoryRepository::fail_deletion_of`] and log files registered with
/// [`MemoryRepository::fail_log_deletion_of`] report a permission error when
/// deleted.
#[derive(Debug)]
pub struct MemoryRepository {
    base_dir: PathBuf,
    sets: Mutex<BTreeSet<BackupIdentifier>>,
    failing: HashSet<PathBuf>,
    failing_logs: HashSet<PathBuf>,
}

impl MemoryRepository {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            sets: Mutex::new(BTreeSet::new()),
            failing: HashSet::new(),
            failing_logs: HashSet::new(),
        }
    }

    pub fn with_sets(mut self, ids: impl IntoIterator<Item = BackupIdentifier>) -> Self {
        self.sets.get_mut().unwrap_or_else(|e| e.into_inner()).extend(ids);
        self
    }

    pub fn fail_deletion_of(mut self, id: &BackupIdentifier) -> Self {
        self.failing.insert(id.location_in(&self.base_dir).data_path);
        self
    }

    pub fn fail_log_deletion_of(mut self, id: &BackupIdentifier) -> Self {
        self.failing_logs.insert(id.location_in(&self.base_dir).log_path);
        self
    }

    pub fn insert(&self, id: BackupIdentifier) {
        self.lock().insert(id);
    }

    /// Identifiers currently present, in date order.
    pub fn snapshot(&self) -> Vec<BackupIdentifier> {
        self.lock().iter().copied().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<BackupIdentifier>> {
        self.sets.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl BackupSetRepository for MemoryRepository {
    fn location_of(&self, id: &BackupIdentifier) -> BackupSetLocation {
        id.location_in(self.base_dir())
    }

    fn exists(&self, id: &BackupIdentifier) -> bool {
        self.lock().contains(id)
    }

    fn delete(&self, location: &BackupSetLocation) -> DeletionOutcome {
        let log = if self.failing_logs.contains(&location.log_path) {
            Some(Err(permission_denied()))
        } else {
            Some(Ok(()))
        };

        if self.failing.contains(&location.data_path) {
            return DeletionOutcome {
                data: Err(permission_denied()),
                log,
            };
        }

        let mut sets = self.lock();
        let found = sets
            .iter()
            .find(|id| id.location_in(&self.base_dir).data_path == location.data_path)
            .copied();

        match found {
            Some(id) => {
                sets.remove(&id);
                DeletionOutcome { data: Ok(()), log }
            }
            None => DeletionOutcome {
                data: Err(io::Error::new(io::ErrorKind::NotFound, "no such backup set")),
                log: None,
            },
        }
    }
}

fn permission_denied() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "permission denied")
}
