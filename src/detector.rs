//! Change detection between a fresh search batch and stored history.

use std::collections::HashMap;

use crate::model::Record;

/// How a single fresh record relates to the history it was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Added,
    Updated,
    Unchanged,
}

/// Records classified as added or updated by one [`History::reconcile`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub added: Vec<Record>,
    pub updated: Vec<Record>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }
}

/// Ordered record list with an id index.
///
/// Order is insertion order; replacing a record keeps its position.
#[derive(Debug, Clone, Default)]
pub struct History {
    records: Vec<Record>,
    index: HashMap<u64, usize>,
}

impl History {
    pub fn new(records: Vec<Record>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (pos, record) in records.iter().enumerate() {
            // First occurrence wins if a stored file carries duplicate ids.
            index.entry(record.id).or_insert(pos);
        }
        Self { records, index }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Record> {
        self.index.get(&id).map(|&pos| &self.records[pos])
    }

    /// Inserts `record` or replaces the entry with the same id when it differs.
    pub fn apply(&mut self, record: Record) -> Change {
        match self.index.get(&record.id) {
            Some(&pos) if self.records[pos] == record => Change::Unchanged,
            Some(&pos) => {
                self.records[pos] = record;
                Change::Updated
            }
            None => {
                self.index.insert(record.id, self.records.len());
                self.records.push(record);
                Change::Added
            }
        }
    }

    /// Applies a fresh batch in order and returns what changed.
    pub fn reconcile(&mut self, batch: Vec<Record>) -> Reconciliation {
        let mut result = Reconciliation::default();

        for record in batch {
            match self.apply(record.clone()) {
                Change::Added => result.added.push(record),
                Change::Updated => result.updated.push(record),
                Change::Unchanged => {}
            }
        }

        result
    }
}

/// Reconciles `batch` against `history`, returning the merged history and the changes.
///
/// ```
/// use cvewatch::detector::reconcile;
/// use cvewatch::model::{Owner, Record};
///
/// let owner = Owner { id: 1, login: "alice".to_string() };
/// let old = Record::new(3, "C", owner.clone()).with_description("old");
/// let new = Record::new(3, "C", owner).with_description("new");
///
/// let (merged, changes) = reconcile(vec![new.clone()], vec![old]);
/// assert!(changes.added.is_empty());
/// assert_eq!(changes.updated, vec![new]);
/// assert_eq!(merged[0].description.as_deref(), Some("new"));
/// ```
pub fn reconcile(batch: Vec<Record>, history: Vec<Record>) -> (Vec<Record>, Reconciliation) {
    let mut history = History::new(history);
    let changes = history.reconcile(batch);
    (history.into_records(), changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Owner;

    fn record(id: u64, name: &str) -> Record {
        Record::new(
            id,
            name,
            Owner {
                id: 10,
                login: "alice".to_string(),
            },
        )
    }

    #[test]
    fn test_unchanged_record() {
        let history = vec![record(1, "A")];
        let (merged, changes) = reconcile(vec![record(1, "A")], history.clone());

        assert!(changes.is_empty());
        assert_eq!(merged, history);
    }

    #[test]
    fn test_new_record_into_empty_history() {
        let (merged, changes) = reconcile(vec![record(2, "B")], Vec::new());

        assert_eq!(changes.added, vec![record(2, "B")]);
        assert!(changes.updated.is_empty());
        assert_eq!(merged, vec![record(2, "B")]);
    }

    #[test]
    fn test_changed_description_is_updated_in_place() {
        let history = vec![
            record(3, "C").with_description("old"),
            record(4, "D"),
        ];
        let fresh = record(3, "C").with_description("new");
        let (merged, changes) = reconcile(vec![fresh.clone()], history);

        assert!(changes.added.is_empty());
        assert_eq!(changes.updated, vec![fresh]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].description.as_deref(), Some("new"));
        assert_eq!(merged[1].id, 4);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let history = vec![record(1, "A"), record(2, "B").with_description("x")];
        let batch = vec![
            record(2, "B").with_description("y"),
            record(5, "E"),
            record(1, "A"),
        ];

        let (merged, first) = reconcile(batch.clone(), history);
        assert_eq!(first.added.len(), 1);
        assert_eq!(first.updated.len(), 1);

        let (merged_again, second) = reconcile(batch, merged.clone());
        assert!(second.is_empty());
        assert_eq!(merged_again, merged);
    }

    #[test]
    fn test_classification_is_exclusive() {
        let history = vec![record(1, "A"), record(2, "B")];
        let batch = vec![record(1, "A2"), record(3, "C"), record(2, "B")];
        let (_, changes) = reconcile(batch, history);

        for added in &changes.added {
            assert!(changes.updated.iter().all(|u| u.id != added.id));
        }
        assert_eq!(changes.added, vec![record(3, "C")]);
        assert_eq!(changes.updated, vec![record(1, "A2")]);
    }

    #[test]
    fn test_duplicate_in_batch_sees_earlier_insert() {
        let (merged, changes) = reconcile(vec![record(7, "G"), record(7, "G")], Vec::new());

        assert_eq!(changes.added, vec![record(7, "G")]);
        assert!(changes.updated.is_empty());
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_order_is_preserved_on_insert() {
        let (merged, _) = reconcile(
            vec![record(9, "I"), record(8, "H")],
            vec![record(1, "A")],
        );
        let ids: Vec<u64> = merged.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 9, 8]);
    }

    #[test]
    fn test_apply_reports_change() {
        let mut history = History::default();
        assert_eq!(history.apply(record(1, "A")), Change::Added);
        assert_eq!(history.apply(record(1, "A")), Change::Unchanged);
        assert_eq!(history.apply(record(1, "A'")), Change::Updated);
        assert_eq!(history.get(1).map(|r| r.name.as_str()), Some("A'"));
        assert_eq!(history.len(), 1);
    }
}
