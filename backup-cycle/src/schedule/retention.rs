//! Retention planning: which week of backup sets falls out of the window.
//!
//! Sets are purged one week unit at a time: a full backup and the six
//! incrementals that follow it. The planner looks `weeks_to_keep + 1` weeks
//! back from the current anchor so that at least `weeks_to_keep` complete
//! weeks remain after the purge. A week that is only partially on disk is
//! never purged.

use super::calendar::{days_from_date, weeks_ago_from_date};
use crate::repository::{BackupIdentifier, BackupSetLocation, BackupSetRepository};
use crate::utils::errors::{CycleError, Result};
use chrono::NaiveDate;

/// Incrementals taken after each full backup.
pub const INCREMENTALS_PER_WEEK: i64 = 6;

pub const MIN_WEEKS_TO_KEEP: u32 = 1;
pub const MAX_WEEKS_TO_KEEP: u32 = 52;

/// Number of complete weekly cycles kept on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionWindow {
    weeks_to_keep: u32,
}

impl RetentionWindow {
    pub fn new(weeks_to_keep: u32) -> Result<Self> {
        if !(MIN_WEEKS_TO_KEEP..=MAX_WEEKS_TO_KEEP).contains(&weeks_to_keep) {
            return Err(CycleError::InvalidConfiguration(format!(
                "weeks to keep must be between {} and {}, got {}",
                MIN_WEEKS_TO_KEEP, MAX_WEEKS_TO_KEEP, weeks_to_keep
            )));
        }
        Ok(Self { weeks_to_keep })
    }

    /// Weeks between the current anchor and the full backup to purge.
    pub fn lookback_weeks(&self) -> u32 {
        self.weeks_to_keep + 1
    }

    /// Date of the full backup whose week is due for purging.
    pub fn target_full_date(&self, anchor: NaiveDate) -> NaiveDate {
        weeks_ago_from_date(anchor, self.lookback_weeks())
    }
}

/// A backup set selected for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDeletion {
    pub id: BackupIdentifier,
    pub location: BackupSetLocation,
}

/// Outcome of retention planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetentionPlan {
    /// No full backup at the target date yet; nothing is old enough to purge.
    NothingToPurge { target: NaiveDate },
    /// A complete week unit, full first, then incrementals in date order.
    Purge {
        target: NaiveDate,
        sets: Vec<PlannedDeletion>,
    },
}

impl RetentionPlan {
    pub fn target(&self) -> NaiveDate {
        match self {
            RetentionPlan::NothingToPurge { target } | RetentionPlan::Purge { target, .. } => {
                *target
            }
        }
    }

    pub fn deletions(&self) -> &[PlannedDeletion] {
        match self {
            RetentionPlan::NothingToPurge { .. } => &[],
            RetentionPlan::Purge { sets, .. } => sets,
        }
    }
}

/// Plan the purge for the cycle anchored at `anchor`.
///
/// Returns [`CycleError::IncompleteRetentionChain`] when the target full
/// exists but any of its six incrementals is missing; in that case nothing
/// is selected for deletion.
pub fn plan_retention<R: BackupSetRepository>(
    anchor: NaiveDate,
    window: RetentionWindow,
    repo: &R,
) -> Result<RetentionPlan> {
    let target = window.target_full_date(anchor);
    let full = BackupIdentifier::full(target);

    if !repo.exists(&full) {
        return Ok(RetentionPlan::NothingToPurge { target });
    }

    let incrementals: Vec<BackupIdentifier> = (1..=INCREMENTALS_PER_WEEK)
        .map(|offset| BackupIdentifier::incremental(days_from_date(target, offset)))
        .collect();

    let missing: Vec<NaiveDate> = incrementals
        .iter()
        .filter(|id| !repo.exists(id))
        .map(|id| id.date)
        .collect();

    if !missing.is_empty() {
        return Err(CycleError::IncompleteRetentionChain { target, missing });
    }

    let sets = std::iter::once(full)
        .chain(incrementals)
        .map(|id| PlannedDeletion {
            location: repo.location_of(&id),
            id,
        })
        .collect();

    Ok(RetentionPlan::Purge { target, sets })
}
