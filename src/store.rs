//! JSON file storage for history, dated logs and run result sets.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   2024/
//!     CVE-2024-1234.json      history of one tracking key
//!   dateLog/
//!     2024-05-01.json         {"New": [...], "Update": [...]}
//!   new.json                  records added by the latest run
//!   update.json               records updated by the latest run
//! ```

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

use crate::model::{DatedLog, Record, RunResultSets, TrackingKey};

const DATE_LOG_DIR: &str = "dateLog";
const NEW_FILE: &str = "new.json";
const UPDATE_FILE: &str = "update.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Outcome of reading a slot that may not have been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded<T> {
    /// The slot does not exist or holds no data.
    Empty,
    Found(T),
}

impl<T: Default> Loaded<T> {
    pub fn or_default(self) -> T {
        match self {
            Loaded::Empty => T::default(),
            Loaded::Found(value) => value,
        }
    }
}

impl<T> Loaded<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Loaded::Empty)
    }
}

/// Summary of one stored history file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedEntry {
    pub year: String,
    pub identifier: String,
    pub records: usize,
}

pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn history_path(&self, key: &TrackingKey) -> PathBuf {
        self.root
            .join(key.year().to_string())
            .join(format!("{}.json", key.identifier()))
    }

    pub fn date_log_path(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(DATE_LOG_DIR)
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    pub fn new_path(&self) -> PathBuf {
        self.root.join(NEW_FILE)
    }

    pub fn update_path(&self) -> PathBuf {
        self.root.join(UPDATE_FILE)
    }

    /// Reads the stored history of `key`.
    pub fn load_history(&self, key: &TrackingKey) -> Result<Loaded<Vec<Record>>, StoreError> {
        read_json(&self.history_path(key))
    }

    /// Overwrites the stored history of `key`, creating the year directory if needed.
    pub fn save_history(&self, key: &TrackingKey, records: &[Record]) -> Result<(), StoreError> {
        write_json(&self.history_path(key), &records)
    }

    pub fn load_date_log(&self, date: NaiveDate) -> Result<Loaded<DatedLog>, StoreError> {
        read_json(&self.date_log_path(date))
    }

    pub fn save_date_log(&self, date: NaiveDate, log: &DatedLog) -> Result<(), StoreError> {
        write_json(&self.date_log_path(date), log)
    }

    /// Overwrites `new.json` and `update.json` with the sets of the latest run.
    ///
    /// A set that is empty leaves its file untouched.
    pub fn save_run_sets(&self, sets: &RunResultSets) -> Result<(), StoreError> {
        if !sets.updated.is_empty() {
            write_json(&self.update_path(), &sets.updated)?;
        }
        if !sets.added.is_empty() {
            write_json(&self.new_path(), &sets.added)?;
        }
        Ok(())
    }

    /// Lists every stored history file, ordered by year then identifier.
    ///
    /// Unreadable history files are logged and left out of the listing.
    pub fn tracked(&self) -> Result<Vec<TrackedEntry>, StoreError> {
        let mut entries = Vec::new();

        if !self.root.exists() {
            return Ok(entries);
        }

        for entry in WalkDir::new(&self.root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .flatten()
        {
            let path = entry.path();
            let Some(year) = year_dir_name(path) else {
                continue;
            };
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            let Some(identifier) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let records: Vec<Record> = match read_json(path) {
                Ok(loaded) => loaded.or_default(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable history");
                    continue;
                }
            };
            entries.push(TrackedEntry {
                year,
                identifier: identifier.to_string(),
                records: records.len(),
            });
        }

        Ok(entries)
    }
}

fn year_dir_name(path: &Path) -> Option<String> {
    let name = path.parent()?.file_name()?.to_str()?;
    if name.len() == 4 && name.chars().all(|c| c.is_ascii_digit()) {
        Some(name.to_string())
    } else {
        None
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Loaded<T>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Loaded::Empty),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if content.trim().is_empty() {
        return Ok(Loaded::Empty);
    }

    serde_json::from_str(&content)
        .map(Loaded::Found)
        .map_err(|source| StoreError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let content = serde_json::to_string(value).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, content).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}
