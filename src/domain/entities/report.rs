use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::outcome::ExecutionOutcome;
use super::repository::RepositoryRecord;

/// Every selected repository succeeded or was skipped.
pub const EXIT_SUCCESS: i32 = 0;
/// At least one repository's command exited nonzero.
pub const EXIT_FAILED: i32 = 1;
/// At least one child could not be launched, none failed.
pub const EXIT_SPAWN_ERROR: i32 = 4;
/// The run was interrupted.
pub const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub repository: RepositoryRecord,
    #[serde(flatten)]
    pub outcome: ExecutionOutcome,
}

/// Outcomes of one run, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub entries: Vec<ReportEntry>,
    pub summary: Summary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
    pub spawn_errors: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

impl Summary {
    fn count(&mut self, outcome: &ExecutionOutcome) {
        match outcome {
            ExecutionOutcome::Succeeded { .. } => self.succeeded += 1,
            ExecutionOutcome::Failed { .. } => self.failed += 1,
            ExecutionOutcome::SpawnError { .. } => self.spawn_errors += 1,
            ExecutionOutcome::Skipped { .. } => self.skipped += 1,
            ExecutionOutcome::Cancelled => self.cancelled += 1,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} skipped, {} cancelled",
            self.succeeded,
            self.failed + self.spawn_errors,
            self.skipped,
            self.cancelled
        )
    }
}

impl Report {
    /// Build a report from outcomes that arrived in any order.
    ///
    /// `index` is the repository's position in the registry; sorting on it
    /// makes the result independent of completion order.
    pub fn from_unordered(mut outcomes: Vec<(usize, RepositoryRecord, ExecutionOutcome)>) -> Self {
        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut summary = Summary::default();
        let entries = outcomes
            .into_iter()
            .map(|(_, repository, outcome)| {
                summary.count(&outcome);
                ReportEntry {
                    repository,
                    outcome,
                }
            })
            .collect();

        Self { entries, summary }
    }

    /// Exit code for this set of outcomes. Same outcomes, same code.
    pub fn exit_code(&self) -> i32 {
        if self.summary.cancelled > 0 {
            EXIT_CANCELLED
        } else if self.summary.failed > 0 {
            EXIT_FAILED
        } else if self.summary.spawn_errors > 0 {
            EXIT_SPAWN_ERROR
        } else {
            EXIT_SUCCESS
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == EXIT_SUCCESS
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn outcome_of(&self, identity: &str) -> Option<&ExecutionOutcome> {
        self.entries
            .iter()
            .find(|e| e.repository.identity == identity)
            .map(|e| &e.outcome)
    }
}

/// Shared sink for outcomes produced by concurrent jobs.
///
/// Only whole outcomes are appended; the lock is held for a push and nothing else.
#[derive(Debug, Clone, Default)]
pub struct ReportCollector {
    outcomes: Arc<Mutex<Vec<(usize, RepositoryRecord, ExecutionOutcome)>>>,
}

impl ReportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, index: usize, repository: RepositoryRecord, outcome: ExecutionOutcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((index, repository, outcome));
    }

    pub fn len(&self) -> usize {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sort everything collected so far into a [`Report`].
    pub fn finish(self) -> Report {
        let outcomes = std::mem::take(
            &mut *self
                .outcomes
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        Report::from_unordered(outcomes)
    }
}
