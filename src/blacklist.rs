//! Owner blacklist.
//!
//! The blacklist is a YAML mapping from GitHub owner id to a free-form label:
//!
//! ```yaml
//! 123456: spam-bot
//! 789012: fake-poc-uploader
//! ```
//!
//! It is loaded once per run and never modified afterwards.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::model::Record;

#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    owners: HashMap<i64, String>,
}

impl Blacklist {
    pub fn new(owners: HashMap<i64, String>) -> Self {
        Self { owners }
    }

    /// Loads the blacklist from a YAML file.
    ///
    /// A missing file yields an empty blacklist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no blacklist file, using empty blacklist");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: HashMap<i64, Option<String>> = serde_yaml::from_str(content)?;
        let owners = raw
            .into_iter()
            .map(|(id, label)| (id, label.unwrap_or_default()))
            .collect();
        Ok(Self { owners })
    }

    pub fn is_blacklisted(&self, owner_id: i64) -> bool {
        self.owners.contains_key(&owner_id)
    }

    pub fn label(&self, owner_id: i64) -> Option<&str> {
        self.owners.get(&owner_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Drops every record owned by a blacklisted account.
    pub fn filter(&self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .filter(|record| {
                let blocked = self.is_blacklisted(record.owner.id);
                if blocked {
                    debug!(
                        owner = %record.owner.login,
                        owner_id = record.owner.id,
                        repo = %record.name,
                        "skipping blacklisted owner"
                    );
                }
                !blocked
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Owner;

    fn record(id: u64, owner_id: i64) -> Record {
        Record::new(
            id,
            format!("CVE-2024-{:04}", id),
            Owner {
                id: owner_id,
                login: format!("user{}", owner_id),
            },
        )
    }

    #[test]
    fn test_from_yaml() {
        let blacklist = Blacklist::from_yaml("123: spam\n456: fake-poc\n").unwrap();
        assert_eq!(blacklist.len(), 2);
        assert!(blacklist.is_blacklisted(123));
        assert_eq!(blacklist.label(456), Some("fake-poc"));
        assert!(!blacklist.is_blacklisted(789));
    }

    #[test]
    fn test_entry_without_label_still_blocks() {
        let blacklist = Blacklist::from_yaml("123:\n").unwrap();
        assert!(blacklist.is_blacklisted(123));
        assert_eq!(blacklist.label(123), Some(""));
    }

    #[test]
    fn test_empty_yaml() {
        assert!(Blacklist::from_yaml("").unwrap().is_empty());
        assert!(Blacklist::from_yaml("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let blacklist = Blacklist::load(&dir.path().join("blacklist.yaml")).unwrap();
        assert!(blacklist.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blacklist.yaml");
        fs::write(&path, "42: bot\n").unwrap();

        let blacklist = Blacklist::load(&path).unwrap();
        assert!(blacklist.is_blacklisted(42));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blacklist.yaml");
        fs::write(&path, "- not\n- a mapping\n").unwrap();

        assert!(Blacklist::load(&path).is_err());
    }

    #[test]
    fn test_filter_drops_blacklisted_owners() {
        let blacklist = Blacklist::new(HashMap::from([(2, "spam".to_string())]));
        let kept = blacklist.filter(vec![record(1, 1), record(2, 2), record(3, 1)]);

        let ids: Vec<u64> = kept.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
