//! Backup executor - runs the external backup tool for one backup set.
//!
//! The tool's stdout and stderr are captured into the set's log file. Its
//! exit status and the success marker at the end of the log are translated
//! into an [`ExecOutcome`]; callers never inspect raw exit codes.

pub mod marker;

use crate::repository::BackupSetLocation;
use crate::schedule::BackupKind;
use crate::utils::errors::{CycleError, Result};
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, warn};

/// Exit code innobackupex uses when it cannot connect to the server.
const EXIT_CONNECTION_FAILED: i32 = 9;

/// How much of the log is inspected for the success marker.
const LOG_TAIL_BYTES: u64 = 64 * 1024;

/// One backup to run.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    pub kind: BackupKind,
    pub target: BackupSetLocation,
    /// Data directory of the full backup an incremental is taken against.
    pub anchor: Option<PathBuf>,
}

/// Result of running the backup tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Exit status 0 and the log ends with the success marker.
    Completed,
    /// The tool could not connect to the database.
    DatabaseUnreachable,
    /// Exit status 0 but no success marker in the log.
    MarkerMissing,
    /// Non-zero exit status, or killed by a signal (`None`).
    Failed { code: Option<i32> },
    /// The tool binary could not be started.
    ToolNotFound,
}

impl ExecOutcome {
    /// Translate into the error reported for this run, if any.
    pub fn into_result(self, tool: &str, log_path: &Path) -> Result<()> {
        match self {
            ExecOutcome::Completed => Ok(()),
            ExecOutcome::DatabaseUnreachable => Err(CycleError::DatabaseUnreachable),
            ExecOutcome::MarkerMissing => Err(CycleError::BackupFailed(format!(
                "no completion marker in {}",
                log_path.display()
            ))),
            ExecOutcome::Failed { code: Some(code) } => Err(CycleError::BackupFailed(format!(
                "{} exited with status {}, see {}",
                tool,
                code,
                log_path.display()
            ))),
            ExecOutcome::Failed { code: None } => Err(CycleError::BackupFailed(format!(
                "{} was terminated by a signal, see {}",
                tool,
                log_path.display()
            ))),
            ExecOutcome::ToolNotFound => Err(CycleError::ToolNotFound(tool.to_string())),
        }
    }
}

/// Runs backups. Implemented by [`Innobackupex`] and by fakes in tests.
#[allow(async_fn_in_trait)]
pub trait BackupExecutor {
    /// Name of the tool, used in messages.
    fn tool(&self) -> &str;

    /// Check the tool can be run before any backup decision is acted on.
    fn preflight(&self) -> Result<()>;

    /// Run one backup to completion.
    async fn run(&self, request: &BackupRequest) -> io::Result<ExecOutcome>;
}

/// Percona `innobackupex` invoked as an external process.
#[derive(Debug, Clone)]
pub struct Innobackupex {
    tool: String,
    args: Vec<String>,
}

impl Innobackupex {
    /// `tool` is a path or a name looked up in `$PATH`; `args` are passed
    /// before the generated arguments (e.g. `--defaults-file=...`).
    pub fn new(tool: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }

    fn command_args(&self, request: &BackupRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        args.push("--no-timestamp".into());

        if request.kind == BackupKind::Incremental {
            args.push("--incremental".into());
        }
        args.push(request.target.data_path.clone().into_os_string());

        if let Some(anchor) = &request.anchor {
            let mut basedir = OsString::from("--incremental-basedir=");
            basedir.push(anchor);
            args.push(basedir);
        }

        args
    }
}

impl BackupExecutor for Innobackupex {
    fn tool(&self) -> &str {
        &self.tool
    }

    fn preflight(&self) -> Result<()> {
        match resolve_tool(&self.tool) {
            Some(path) => {
                debug!("Using backup tool {}", path.display());
                Ok(())
            }
            None => Err(CycleError::ToolNotFound(self.tool.clone())),
        }
    }

    async fn run(&self, request: &BackupRequest) -> io::Result<ExecOutcome> {
        let log_path = &request.target.log_path;
        let log = File::create(log_path)?;

        let args = self.command_args(request);
        info!(
            "Running {} backup into {} (log: {})",
            request.kind,
            request.target.data_path.display(),
            log_path.display()
        );
        debug!("{} {:?}", self.tool, args);

        let spawned = tokio::process::Command::new(&self.tool)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log))
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Backup tool {} not found: {}", self.tool, e);
                return Ok(ExecOutcome::ToolNotFound);
            }
            Err(e) => return Err(e),
        };

        let status = child.wait().await?;
        debug!("{} exited with {}", self.tool, status);

        let outcome = match status.code() {
            Some(0) => {
                let tail = read_tail(log_path).await?;
                if marker::completed_ok(&tail) {
                    ExecOutcome::Completed
                } else {
                    ExecOutcome::MarkerMissing
                }
            }
            Some(EXIT_CONNECTION_FAILED) => ExecOutcome::DatabaseUnreachable,
            code => ExecOutcome::Failed { code },
        };

        Ok(outcome)
    }
}

/// Last `LOG_TAIL_BYTES` of the log; the rest is never loaded.
async fn read_tail(path: &Path) -> io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let start = len.saturating_sub(LOG_TAIL_BYTES);
    file.seek(SeekFrom::Start(start)).await?;

    let mut bytes = Vec::with_capacity((len - start) as usize);
    file.read_to_end(&mut bytes).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Resolve `tool` to an executable file, searching `$PATH` for bare names.
fn resolve_tool(tool: &str) -> Option<PathBuf> {
    let candidate = Path::new(tool);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(tool))
        .find(|p| is_executable(p))
}

fn is_executable(path: &Path) -> bool {
    match std::fs::metadata(path) {
        #[cfg(unix)]
        Ok(meta) => {
            use std::os::unix::fs::PermissionsExt;
            meta.is_file() && meta.permissions().mode() & 0o111 != 0
        }
        #[cfg(not(unix))]
        Ok(meta) => meta.is_file(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::BackupIdentifier;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn request(dir: &Path, kind: BackupKind) -> BackupRequest {
        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let id = BackupIdentifier { date, kind };
        BackupRequest {
            kind,
            target: id.location_in(dir),
            anchor: (kind == BackupKind::Incremental)
                .then(|| BackupIdentifier::full(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()))
                .map(|anchor| anchor.location_in(dir).data_path),
        }
    }

    /// The shell stands in for the backup tool; the script is its first argument.
    fn scripted(dir: &Path, body: &str) -> io::Result<Innobackupex> {
        let script = dir.join("fake-innobackupex.sh");
        std::fs::write(&script, body)?;
        Ok(Innobackupex::new(
            "/bin/sh",
            vec![script.to_string_lossy().into_owned()],
        ))
    }

    #[test]
    fn test_full_backup_arguments() {
        let exec = Innobackupex::new("innobackupex", vec!["--defaults-file=/etc/my.cnf".into()]);
        let req = request(Path::new("/backups"), BackupKind::Full);
        let args = exec.command_args(&req);
        assert_eq!(
            args,
            vec![
                OsString::from("--defaults-file=/etc/my.cnf"),
                OsString::from("--no-timestamp"),
                OsString::from("/backups/20240506_full"),
            ]
        );
    }

    #[test]
    fn test_incremental_arguments_name_the_anchor() {
        let exec = Innobackupex::new("innobackupex", Vec::new());
        let req = request(Path::new("/backups"), BackupKind::Incremental);
        let args = exec.command_args(&req);
        assert_eq!(
            args,
            vec![
                OsString::from("--no-timestamp"),
                OsString::from("--incremental"),
                OsString::from("/backups/20240506_incr"),
                OsString::from("--incremental-basedir=/backups/20240502_full"),
            ]
        );
    }

    #[test]
    fn test_outcome_translation() {
        let log = Path::new("/backups/innobackupex_20240506.log");
        assert!(ExecOutcome::Completed.into_result("innobackupex", log).is_ok());
        assert!(matches!(
            ExecOutcome::DatabaseUnreachable.into_result("innobackupex", log),
            Err(CycleError::DatabaseUnreachable)
        ));
        assert!(matches!(
            ExecOutcome::ToolNotFound.into_result("innobackupex", log),
            Err(CycleError::ToolNotFound(_))
        ));
        let err = ExecOutcome::Failed { code: Some(2) }
            .into_result("innobackupex", log)
            .unwrap_err();
        assert!(err.to_string().contains("status 2"));
    }

    #[test]
    fn test_preflight_missing_tool() {
        let exec = Innobackupex::new("/nonexistent/bin/innobackupex", Vec::new());
        assert!(matches!(exec.preflight(), Err(CycleError::ToolNotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_preflight_finds_shell() {
        assert!(Innobackupex::new("/bin/sh", Vec::new()).preflight().is_ok());
        assert!(Innobackupex::new("sh", Vec::new()).preflight().is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_log_and_detects_marker() -> io::Result<()> {
        let dir = TempDir::new()?;
        let exec = scripted(
            dir.path(),
            "echo \"args: $*\"\necho '240506 03:00:11  innobackupex: completed OK!' 1>&2\n",
        )?;
        let req = request(dir.path(), BackupKind::Incremental);

        let outcome = exec.run(&req).await?;
        assert_eq!(outcome, ExecOutcome::Completed);

        let log = std::fs::read_to_string(&req.target.log_path)?;
        assert!(log.contains("--incremental "));
        assert!(log.contains("--incremental-basedir="));
        assert!(log.trim_end().ends_with("completed OK!"));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_without_marker() -> io::Result<()> {
        let dir = TempDir::new()?;
        let exec = scripted(dir.path(), "echo 'innobackupex: Starting' 1>&2\nexit 0\n")?;

        let outcome = exec.run(&request(dir.path(), BackupKind::Full)).await?;
        assert_eq!(outcome, ExecOutcome::MarkerMissing);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_connection_failure() -> io::Result<()> {
        let dir = TempDir::new()?;
        let exec = scripted(dir.path(), "echo 'Error: failed to connect' 1>&2\nexit 9\n")?;

        let outcome = exec.run(&request(dir.path(), BackupKind::Full)).await?;
        assert_eq!(outcome, ExecOutcome::DatabaseUnreachable);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_generic_failure() -> io::Result<()> {
        let dir = TempDir::new()?;
        let exec = scripted(dir.path(), "exit 1\n")?;

        let outcome = exec.run(&request(dir.path(), BackupKind::Full)).await?;
        assert_eq!(outcome, ExecOutcome::Failed { code: Some(1) });
        Ok(())
    }

    #[tokio::test]
    async fn test_run_missing_tool() -> io::Result<()> {
        let dir = TempDir::new()?;
        let exec = Innobackupex::new("/nonexistent/bin/innobackupex", Vec::new());

        let outcome = exec.run(&request(dir.path(), BackupKind::Full)).await?;
        assert_eq!(outcome, ExecOutcome::ToolNotFound);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_tail_of_large_log() -> io::Result<()> {
        let dir = TempDir::new()?;
        let log = dir.path().join("innobackupex_20240506.log");
        let mut content = "xtrabackup: Copying ./ibdata1\n".repeat(8 * 1024);
        content.push_str("240506 03:12:44 completed OK!\n");
        std::fs::write(&log, &content)?;
        assert!(content.len() as u64 > LOG_TAIL_BYTES);

        let tail = read_tail(&log).await?;
        assert_eq!(tail.len() as u64, LOG_TAIL_BYTES);
        assert!(content.ends_with(&tail));
        assert!(marker::completed_ok(&tail));
        Ok(())
    }

    #[tokio::test]
    async fn test_read_tail_of_short_log() -> io::Result<()> {
        let dir = TempDir::new()?;
        let log = dir.path().join("innobackupex_20240506.log");
        std::fs::write(&log, "240506 03:12:44 completed OK!\n")?;

        assert_eq!(read_tail(&log).await?, "240506 03:12:44 completed OK!\n");
        Ok(())
    }
}
