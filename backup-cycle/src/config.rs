//! Configuration management for the backup cycle.
//!
//! Loads configuration from an optional TOML file; command line flags
//! override individual values. The result is validated once and then passed
//! by reference to everything that needs it.

use crate::schedule::retention::RetentionWindow;
use crate::utils::errors::{CycleError, Result};
use nix::unistd::{access, AccessFlags};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory holding backup sets and their logs
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Day of the full backup, 1 = Monday .. 7 = Sunday
    #[serde(default = "default_full_weekday")]
    pub full_weekday: u32,

    /// Complete weekly cycles kept on disk (1-52)
    #[serde(default = "default_weeks_to_keep")]
    pub weeks_to_keep: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Backup tool binary, a path or a name looked up in $PATH
    #[serde(default = "default_tool")]
    pub path: String,

    /// Extra arguments, e.g. `--defaults-file=/etc/mysql/backup.cnf`
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Notification output
    #[serde(default)]
    pub output: LogOutput,

    /// syslog tag for notifications
    #[serde(default = "default_syslog_tag")]
    pub syslog_tag: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Syslog,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Open files limit for the backup process
    #[serde(default)]
    pub open_files: Option<u64>,
}

// Default values
fn default_base_dir() -> PathBuf {
    PathBuf::from("/var/backups/mysql")
}

fn default_full_weekday() -> u32 {
    7 // Sunday
}

fn default_weeks_to_keep() -> u32 {
    4
}

fn default_tool() -> String {
    "innobackupex".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_syslog_tag() -> String {
    "backup-cycle".to_string()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            full_weekday: default_full_weekday(),
            weeks_to_keep: default_weeks_to_keep(),
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            path: default_tool(),
            args: Vec::new(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            output: LogOutput::default(),
            syslog_tag: default_syslog_tag(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise. An unreadable or malformed
    /// file is an invalid configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        Self::from_file(path).map_err(|e| {
            CycleError::InvalidConfiguration(format!(
                "cannot load {}: {:#}",
                path.display(),
                e
            ))
        })
    }

    /// Retention window, checked against its bounds.
    pub fn retention(&self) -> Result<RetentionWindow> {
        RetentionWindow::new(self.backup.weeks_to_keep)
    }

    /// Reject configurations the scheduler must never run with.
    pub fn validate(&self) -> Result<()> {
        let backup = &self.backup;

        if !(1..=7).contains(&backup.full_weekday) {
            return Err(CycleError::InvalidConfiguration(format!(
                "full backup weekday must be between 1 (Monday) and 7 (Sunday), got {}",
                backup.full_weekday
            )));
        }

        self.retention()?;

        if !backup.base_dir.is_dir() {
            return Err(CycleError::InvalidConfiguration(format!(
                "backup directory {} does not exist",
                backup.base_dir.display()
            )));
        }

        if let Err(e) = access(&backup.base_dir, AccessFlags::W_OK | AccessFlags::X_OK) {
            return Err(CycleError::InvalidConfiguration(format!(
                "backup directory {} is not writable: {}",
                backup.base_dir.display(),
                e
            )));
        }

        if self.tool.path.trim().is_empty() {
            return Err(CycleError::InvalidConfiguration(
                "backup tool path is empty".to_string(),
            ));
        }

        if self.limits.open_files == Some(0) {
            return Err(CycleError::InvalidConfiguration(
                "open files limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
