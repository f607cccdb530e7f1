//! Error taxonomy for a backup cycle and its process exit codes.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const FAILURE: u8 = 1;
    pub const INVALID_OPTION: u8 = 2;
    pub const TOOL_NOT_FOUND: u8 = 3;
    pub const MISSING_ANCHOR: u8 = 4;
    pub const RESOURCE_LIMIT: u8 = 5;
    pub const BACKUP_EXISTS: u8 = 6;
}

#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Anchor full backup {} from {anchor} does not exist", .path.display())]
    MissingAnchorBackup { anchor: NaiveDate, path: PathBuf },

    #[error("Backup set {} already exists", .0.display())]
    BackupSetAlreadyExists(PathBuf),

    #[error("Retention chain for the full backup of {target} is incomplete, missing incrementals: {}", .missing.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    IncompleteRetentionChain {
        target: NaiveDate,
        missing: Vec<NaiveDate>,
    },

    #[error("Failed to remove {}: {source}", .path.display())]
    PurgeItemFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backup tool not found: {0}")]
    ToolNotFound(String),

    #[error("Backup tool could not connect to the database")]
    DatabaseUnreachable,

    #[error("Backup failed: {0}")]
    BackupFailed(String),

    #[error("Failed to set resource limit: {0}")]
    ResourceLimit(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CycleError {
    /// Exit status the binary reports for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CycleError::InvalidConfiguration(_) => exit_code::INVALID_OPTION,
            CycleError::MissingAnchorBackup { .. } => exit_code::MISSING_ANCHOR,
            CycleError::BackupSetAlreadyExists(_) => exit_code::BACKUP_EXISTS,
            CycleError::ToolNotFound(_) => exit_code::TOOL_NOT_FOUND,
            CycleError::ResourceLimit(_) => exit_code::RESOURCE_LIMIT,
            CycleError::IncompleteRetentionChain { .. }
            | CycleError::PurgeItemFailure { .. }
            | CycleError::DatabaseUnreachable
            | CycleError::BackupFailed(_)
            | CycleError::Io(_) => exit_code::FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, CycleError>;
