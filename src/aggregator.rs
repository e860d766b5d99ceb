//! Collects changes across all tracking keys of a run and persists them.

use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{error, info};

use crate::detector::{History, Reconciliation};
use crate::model::{DatedLog, Record, RunResultSets, TrackingKey};
use crate::store::{Loaded, RecordStore};

/// Result of [`RunAggregator::persist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    /// The run produced no changes, so nothing was written.
    Skipped,
    Complete,
    /// At least one write failed; see the log for details.
    Incomplete,
}

#[derive(Debug, Default)]
pub struct RunAggregator {
    sets: RunResultSets,
    seen_added: HashSet<(TrackingKey, u64)>,
}

impl RunAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the changes found for `key` to the run.
    ///
    /// A record already reported as added under the same key in this run is
    /// not reported again. That only happens when the key's history could not
    /// be saved between two queries.
    pub fn record(&mut self, key: &TrackingKey, changes: Reconciliation) {
        for record in changes.added {
            if self.seen_added.insert((key.clone(), record.id)) {
                self.sets.added.push(record);
            }
        }
        self.sets.updated.extend(changes.updated);
    }

    pub fn sets(&self) -> &RunResultSets {
        &self.sets
    }

    pub fn into_sets(self) -> RunResultSets {
        self.sets
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Merges the run into the dated log of `date` and overwrites the run set files.
    ///
    /// Writes nothing when the run has no changes. A dated log that exists
    /// but cannot be read is left alone rather than overwritten.
    pub fn persist(&self, store: &RecordStore, date: NaiveDate) -> Persisted {
        if self.sets.is_empty() {
            return Persisted::Skipped;
        }

        let mut complete = true;
        let log_path = store.date_log_path(date);

        match store.load_date_log(date) {
            Ok(loaded) => {
                if let Loaded::Empty = loaded {
                    info!(path = %log_path.display(), "starting new dated log");
                }
                let log = merge_into_log(loaded.or_default(), &self.sets.added, &self.sets.updated);
                if let Err(e) = store.save_date_log(date, &log) {
                    error!(error = %e, "failed to write dated log");
                    complete = false;
                }
            }
            Err(e) => {
                error!(error = %e, "failed to read dated log, leaving it untouched");
                complete = false;
            }
        }

        if let Err(e) = store.save_run_sets(&self.sets) {
            error!(error = %e, "failed to write run result sets");
            complete = false;
        }

        if complete {
            Persisted::Complete
        } else {
            Persisted::Incomplete
        }
    }
}

/// Merges one run's changes into a day's log.
///
/// `added` is appended to `New` as is. Each record of `updated` is upserted
/// into `Update` by id, so `Update` never holds two entries for one record.
pub fn merge_into_log(log: DatedLog, added: &[Record], updated: &[Record]) -> DatedLog {
    let DatedLog { mut new, update } = log;
    new.extend_from_slice(added);

    let mut update = History::new(update);
    for record in updated {
        update.apply(record.clone());
    }

    DatedLog {
        new,
        update: update.into_records(),
    }
}
