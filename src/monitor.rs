//! One monitoring run: search, filter, reconcile, persist, notify.
//!
//! Every unit of work (one search query, one tracking key, one notification)
//! fails on its own. Failures are logged and the run moves on; nothing here
//! returns an error to the caller.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, error, info, warn};

use crate::aggregator::{Persisted, RunAggregator};
use crate::blacklist::Blacklist;
use crate::detector::History;
use crate::extractor::KeyExtractor;
use crate::model::{KeyError, Record, TrackingKey};
use crate::notify::{Notifier, NotifyReport};
use crate::search::SearchProvider;
use crate::store::RecordStore;

/// What to search for in a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub query: String,
    /// Search again for every CVE identifier found by `query`.
    pub related: bool,
    pub date: NaiveDate,
}

/// Counters and results of a finished run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub query: String,
    pub date: Option<NaiveDate>,
    pub queries: usize,
    pub failed_queries: usize,
    pub keys_processed: usize,
    pub keys_failed: usize,
    pub rejected_records: usize,
    pub added: Vec<Record>,
    pub updated: Vec<Record>,
    pub persisted: Option<PersistState>,
    pub notified: Option<NotifyReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistState {
    Skipped,
    Complete,
    Incomplete,
}

impl From<Persisted> for PersistState {
    fn from(p: Persisted) -> Self {
        match p {
            Persisted::Skipped => PersistState::Skipped,
            Persisted::Complete => PersistState::Complete,
            Persisted::Incomplete => PersistState::Incomplete,
        }
    }
}

pub struct Monitor<'a> {
    search: &'a dyn SearchProvider,
    notifier: Option<&'a dyn Notifier>,
    blacklist: &'a Blacklist,
    extractor: &'a KeyExtractor,
    store: &'a RecordStore,
}

impl<'a> Monitor<'a> {
    pub fn new(
        search: &'a dyn SearchProvider,
        blacklist: &'a Blacklist,
        extractor: &'a KeyExtractor,
        store: &'a RecordStore,
    ) -> Self {
        Self {
            search,
            notifier: None,
            blacklist,
            extractor,
            store,
        }
    }

    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn run(&self, options: &RunOptions) -> RunSummary {
        let mut summary = RunSummary {
            query: options.query.clone(),
            date: Some(options.date),
            ..RunSummary::default()
        };
        let mut aggregator = RunAggregator::new();

        let discovered = self
            .process_query(&options.query, false, &mut aggregator, &mut summary)
            .await;

        if options.related {
            let identifiers: BTreeSet<String> = discovered
                .iter()
                .map(|key| key.identifier().to_string())
                .collect();
            debug!(count = identifiers.len(), "running related queries");

            for identifier in identifiers {
                self.process_query(&identifier, true, &mut aggregator, &mut summary)
                    .await;
            }
        }

        let persisted = aggregator.persist(self.store, options.date);
        summary.persisted = Some(persisted.into());

        let sets = aggregator.into_sets();
        info!(
            added = sets.added.len(),
            updated = sets.updated.len(),
            "run finished"
        );

        if let Some(notifier) = self.notifier {
            if !sets.added.is_empty() {
                let report = notifier.notify(&sets.added).await;
                if report.failed > 0 {
                    warn!(
                        notifier = notifier.name(),
                        failed = report.failed,
                        "some notifications were not delivered"
                    );
                }
                summary.notified = Some(report);
            }
        }

        summary.added = sets.added;
        summary.updated = sets.updated;
        summary
    }

    /// Searches `query` and reconciles every tracking key found in the results.
    ///
    /// Returns the keys that were accepted, in first-seen order.
    async fn process_query(
        &self,
        query: &str,
        explicit: bool,
        aggregator: &mut RunAggregator,
        summary: &mut RunSummary,
    ) -> Vec<TrackingKey> {
        summary.queries += 1;

        let records = match self.search.search(query).await {
            Ok(records) => records,
            Err(e) => {
                warn!(query, provider = self.search.name(), error = %e, "search failed");
                summary.failed_queries += 1;
                return Vec::new();
            }
        };
        debug!(query, count = records.len(), "search returned");

        let records = self.blacklist.filter(records);
        let batches = self.group_by_key(query, explicit, records, summary);
        let keys: Vec<TrackingKey> = batches.iter().map(|(key, _)| key.clone()).collect();

        for (key, batch) in batches {
            self.process_key(&key, batch, aggregator, summary);
        }

        keys
    }

    fn group_by_key(
        &self,
        query: &str,
        explicit: bool,
        records: Vec<Record>,
        summary: &mut RunSummary,
    ) -> Vec<(TrackingKey, Vec<Record>)> {
        if records.is_empty() {
            return Vec::new();
        }

        if explicit {
            return match self.extractor.parse(query) {
                Ok(key) => vec![(key, records)],
                Err(e) => {
                    warn!(query, error = %e, "rejecting query key");
                    summary.rejected_records += records.len();
                    Vec::new()
                }
            };
        }

        let mut batches: Vec<(TrackingKey, Vec<Record>)> = Vec::new();
        let mut positions: HashMap<TrackingKey, usize> = HashMap::new();

        for record in records {
            let key = match self.extractor.extract(&record, query, false) {
                Ok(key) => key,
                Err(KeyError::NoIdentifier(_)) => {
                    debug!(repo = %record.name, "no CVE identifier in name");
                    continue;
                }
                Err(e) => {
                    warn!(repo = %record.name, error = %e, "rejecting record");
                    summary.rejected_records += 1;
                    continue;
                }
            };

            match positions.get(&key) {
                Some(&pos) => batches[pos].1.push(record),
                None => {
                    positions.insert(key.clone(), batches.len());
                    batches.push((key, vec![record]));
                }
            }
        }

        batches
    }

    /// Loads, reconciles and saves one key's history.
    ///
    /// The history is written before returning so that a later query in the
    /// same run sees these records as known.
    fn process_key(
        &self,
        key: &TrackingKey,
        batch: Vec<Record>,
        aggregator: &mut RunAggregator,
        summary: &mut RunSummary,
    ) {
        let stored = match self.store.load_history(key) {
            Ok(loaded) => loaded.or_default(),
            Err(e) => {
                error!(cve = %key, error = %e, "skipping key, history unreadable");
                summary.keys_failed += 1;
                return;
            }
        };

        let mut history = History::new(stored);
        let changes = history.reconcile(batch);
        summary.keys_processed += 1;

        if changes.is_empty() {
            return;
        }

        for record in &changes.added {
            info!(cve = %key, id = record.id, repo = %record.html_url, "new repository");
        }
        for record in &changes.updated {
            info!(cve = %key, id = record.id, repo = %record.html_url, "updated repository");
        }

        if let Err(e) = self.store.save_history(key, history.records()) {
            error!(cve = %key, error = %e, "failed to save history");
            summary.keys_failed += 1;
        }

        aggregator.record(key, changes);
    }
}
