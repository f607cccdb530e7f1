//! One backup cycle: decide today's backup, run it, then purge the week that
//! has fallen out of the retention window.
//!
//! Anchor and target checks happen before the backup tool is started, so a
//! run that cannot succeed never touches the disk. Retention problems never
//! fail the run: a successful backup is reported as success even if the
//! purge was skipped or partially failed.

use crate::config::Config;
use crate::executor::{BackupExecutor, BackupRequest};
use crate::notify::Notifier;
use crate::repository::{BackupIdentifier, BackupSetRepository};
use crate::schedule::{anchor_full_date, plan_retention, resolve_today, BackupKind, RetentionPlan};
use crate::utils::errors::{CycleError, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{debug, info};

/// What today's run is going to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleDecision {
    pub today: NaiveDate,
    pub kind: BackupKind,
    pub target: BackupIdentifier,
    /// Full backup of the current cycle; equals `target` on full days.
    pub anchor: BackupIdentifier,
}

/// Summary of a purge.
#[derive(Debug, Default)]
pub struct PurgeReport {
    pub removed: Vec<BackupIdentifier>,
    /// Per-path failures; each one was reported as a warning.
    pub failures: Vec<CycleError>,
    /// The target week was found incomplete and left alone.
    pub skipped: bool,
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub decision: CycleDecision,
    pub purge: PurgeReport,
}

pub struct Orchestrator<'a, R, E> {
    config: &'a Config,
    repo: R,
    executor: E,
    notifier: Box<dyn Notifier + 'a>,
}

impl<'a, R, E> Orchestrator<'a, R, E>
where
    R: BackupSetRepository,
    E: BackupExecutor,
{
    pub fn new(config: &'a Config, repo: R, executor: E, notifier: Box<dyn Notifier + 'a>) -> Self {
        Self {
            config,
            repo,
            executor,
            notifier,
        }
    }

    /// Resolve today's backup and check its preconditions.
    pub fn decide(&self, today: NaiveDate) -> Result<CycleDecision> {
        let weekday = self.config.backup.full_weekday;
        let kind = resolve_today(today, weekday);
        let anchor = BackupIdentifier::full(anchor_full_date(today, weekday));
        let target = BackupIdentifier { date: today, kind };

        debug!("Today {} resolves to a {} backup anchored at {}", today, kind, anchor.date);

        if self.repo.exists(&target) {
            let err = CycleError::BackupSetAlreadyExists(self.repo.location_of(&target).data_path);
            self.notifier.err(&err.to_string());
            return Err(err);
        }

        if kind == BackupKind::Incremental && !self.repo.exists(&anchor) {
            let err = CycleError::MissingAnchorBackup {
                anchor: anchor.date,
                path: self.repo.location_of(&anchor).data_path,
            };
            self.notifier.err(&err.to_string());
            return Err(err);
        }

        Ok(CycleDecision {
            today,
            kind,
            target,
            anchor,
        })
    }

    /// Run today's backup and, if it succeeds, the retention purge.
    pub async fn run(&self, today: NaiveDate) -> Result<RunReport> {
        self.executor.preflight().inspect_err(|e| self.notifier.err(&e.to_string()))?;

        let decision = self.decide(today)?;
        let target = self.repo.location_of(&decision.target);
        let anchor: Option<PathBuf> = (decision.kind == BackupKind::Incremental)
            .then(|| self.repo.location_of(&decision.anchor).data_path);

        let request = BackupRequest {
            kind: decision.kind,
            target: target.clone(),
            anchor,
        };

        let outcome = self
            .executor
            .run(&request)
            .await
            .inspect_err(|e| {
                self.notifier
                    .err(&format!("Failed to start {}: {}", self.executor.tool(), e))
            })?;

        outcome
            .into_result(self.executor.tool(), &target.log_path)
            .inspect_err(|e| self.notifier.err(&format!("{} {}", decision.target, e)))?;

        self.notifier.info(&format!(
            "{} completed in {}",
            decision.target,
            target.data_path.display()
        ));

        let purge = self.purge(decision.anchor.date).unwrap_or_else(|e| {
            self.notifier.warn(&format!("Skipping purge: {}", e));
            PurgeReport {
                skipped: true,
                ..PurgeReport::default()
            }
        });

        Ok(RunReport { decision, purge })
    }

    /// Plan retention for the cycle anchored at `anchor` without deleting.
    pub fn plan(&self, anchor: NaiveDate) -> Result<RetentionPlan> {
        plan_retention(anchor, self.config.retention()?, &self.repo)
    }

    /// Delete the week unit that fell out of the retention window.
    ///
    /// Individual deletion failures are reported and collected; they do not
    /// stop the remaining deletions.
    pub fn purge(&self, anchor: NaiveDate) -> Result<PurgeReport> {
        let mut report = PurgeReport::default();

        let plan = match self.plan(anchor) {
            Ok(plan) => plan,
            Err(e @ CycleError::IncompleteRetentionChain { .. }) => {
                self.notifier.warn(&format!("Skipping purge: {}", e));
                report.skipped = true;
                return Ok(report);
            }
            Err(e) => return Err(e),
        };

        if let RetentionPlan::NothingToPurge { target } = plan {
            self.notifier.info(&format!(
                "Nothing to purge yet, no full backup from {}",
                target
            ));
            return Ok(report);
        }

        for deletion in plan.deletions() {
            let outcome = self.repo.delete(&deletion.location);

            if let Err(source) = outcome.data {
                let err = CycleError::PurgeItemFailure {
                    path: deletion.location.data_path.clone(),
                    source,
                };
                self.notifier.warn(&err.to_string());
                report.failures.push(err);
            } else {
                info!("Removed {}", deletion.location.data_path.display());
                report.removed.push(deletion.id);
            }

            if let Some(Err(source)) = outcome.log {
                let err = CycleError::PurgeItemFailure {
                    path: deletion.location.log_path.clone(),
                    source,
                };
                self.notifier.warn(&err.to_string());
                report.failures.push(err);
            }
        }

        self.notifier.info(&format!(
            "Purged {} of {} backup sets from the week of {}",
            report.removed.len(),
            plan.deletions().len(),
            plan.target()
        ));

        Ok(report)
    }
}
