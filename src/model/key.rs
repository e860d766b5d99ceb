use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Normalized `CVE-YYYY-NNNN` identifier plus its year.
///
/// Keys are only built by [`KeyExtractor`](crate::extractor::KeyExtractor),
/// which guarantees the identifier is uppercase and the year is not in the
/// future.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackingKey {
    identifier: String,
    year: i32,
}

impl TrackingKey {
    pub(crate) fn new(identifier: String, year: i32) -> Self {
        Self { identifier, year }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Numeric part after the `CVE-` prefix, e.g. `2024-1234`.
    pub fn number(&self) -> &str {
        self.identifier
            .split_once('-')
            .map(|(_, rest)| rest)
            .unwrap_or(&self.identifier)
    }
}

impl std::fmt::Display for TrackingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier)
    }
}

/// Reasons a string cannot become a [`TrackingKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("no CVE identifier in {0:?}")]
    NoIdentifier(String),

    #[error("invalid year {year:?} in {identifier}")]
    InvalidYear { identifier: String, year: String },

    #[error("year {year} of {identifier} is after {current_year}")]
    FutureYear {
        identifier: String,
        year: i32,
        current_year: i32,
    },
}
