//! Tracking key extraction.
//!
//! A record is filed under the first `CVE-YYYY-NNNN` identifier found either
//! in the explicit query that produced it or in its own repository name.

use chrono::{Datelike, Local};
use regex::Regex;

use crate::model::{KeyError, Record, TrackingKey};

const CVE_PATTERN: &str = r"(?i)CVE-(\d+)-\d+";

pub struct KeyExtractor {
    pattern: Regex,
    current_year: i32,
}

impl KeyExtractor {
    /// Creates an extractor that rejects identifiers dated after `current_year`.
    pub fn new(current_year: i32) -> Self {
        Self {
            pattern: Regex::new(CVE_PATTERN).expect("CVE pattern is valid"),
            current_year,
        }
    }

    /// Creates an extractor for the local calendar year.
    pub fn for_today() -> Self {
        Self::new(Local::now().year())
    }

    /// Derives the tracking key for `record`.
    ///
    /// When `explicit` is set the batch is scoped to a single identifier and
    /// the key comes from `query`; otherwise it comes from the record name.
    pub fn extract(
        &self,
        record: &Record,
        query: &str,
        explicit: bool,
    ) -> Result<TrackingKey, KeyError> {
        if explicit {
            self.parse(query)
        } else {
            self.parse(&record.name)
        }
    }

    /// Parses the first CVE identifier in `text`.
    ///
    /// ```
    /// use cvewatch::extractor::KeyExtractor;
    ///
    /// let extractor = KeyExtractor::new(2024);
    /// let key = extractor.parse("poc-for-cve-2023-4567").unwrap();
    /// assert_eq!(key.identifier(), "CVE-2023-4567");
    /// assert_eq!(key.year(), 2023);
    /// ```
    pub fn parse(&self, text: &str) -> Result<TrackingKey, KeyError> {
        let caps = self
            .pattern
            .captures(text)
            .ok_or_else(|| KeyError::NoIdentifier(text.to_string()))?;

        let identifier = caps[0].to_uppercase();
        let year_text = &caps[1];

        let year = if year_text.len() == 4 {
            year_text.parse::<i32>().ok()
        } else {
            None
        };
        let year = year.ok_or_else(|| KeyError::InvalidYear {
            identifier: identifier.clone(),
            year: year_text.to_string(),
        })?;

        if year > self.current_year {
            return Err(KeyError::FutureYear {
                identifier,
                year,
                current_year: self.current_year,
            });
        }

        Ok(TrackingKey::new(identifier, year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Owner;

    fn record(name: &str) -> Record {
        Record::new(
            1,
            name,
            Owner {
                id: 1,
                login: "alice".to_string(),
            },
        )
    }

    #[test]
    fn test_parse_normalizes_case() {
        let extractor = KeyExtractor::new(2024);
        let key = extractor.parse("Cve-2022-22965-spring4shell").unwrap();
        assert_eq!(key.identifier(), "CVE-2022-22965");
        assert_eq!(key.year(), 2022);
    }

    #[test]
    fn test_parse_takes_first_identifier() {
        let extractor = KeyExtractor::new(2024);
        let key = extractor.parse("CVE-2021-44228_CVE-2021-45046").unwrap();
        assert_eq!(key.identifier(), "CVE-2021-44228");
    }

    #[test]
    fn test_parse_without_identifier() {
        let extractor = KeyExtractor::new(2024);
        assert_eq!(
            extractor.parse("awesome-exploits"),
            Err(KeyError::NoIdentifier("awesome-exploits".to_string()))
        );
    }

    #[test]
    fn test_current_year_is_accepted() {
        let extractor = KeyExtractor::new(2024);
        assert!(extractor.parse("CVE-2024-0001").is_ok());
    }

    #[test]
    fn test_next_year_is_rejected() {
        let extractor = KeyExtractor::new(2024);
        assert!(matches!(
            extractor.parse("CVE-2025-0001"),
            Err(KeyError::FutureYear { year: 2025, .. })
        ));
    }

    #[test]
    fn test_far_future_year_is_rejected() {
        let extractor = KeyExtractor::new(2024);
        assert!(matches!(
            extractor.parse("CVE-2031-1234"),
            Err(KeyError::FutureYear {
                year: 2031,
                current_year: 2024,
                ..
            })
        ));
    }

    #[test]
    fn test_year_must_have_four_digits() {
        let extractor = KeyExtractor::new(2024);
        assert!(matches!(
            extractor.parse("CVE-999-1"),
            Err(KeyError::InvalidYear { .. })
        ));
        assert!(matches!(
            extractor.parse("CVE-99999999999-1"),
            Err(KeyError::InvalidYear { .. })
        ));
    }

    #[test]
    fn test_extract_explicit_uses_query() {
        let extractor = KeyExtractor::new(2024);
        let key = extractor
            .extract(&record("unrelated-name"), "cve-2023-1111", true)
            .unwrap();
        assert_eq!(key.identifier(), "CVE-2023-1111");
    }

    #[test]
    fn test_extract_implicit_uses_name() {
        let extractor = KeyExtractor::new(2024);
        let key = extractor
            .extract(&record("CVE-2020-0796-SMBGhost"), "CVE-20", false)
            .unwrap();
        assert_eq!(key.identifier(), "CVE-2020-0796");
        assert!(extractor
            .extract(&record("unrelated-name"), "CVE-20", false)
            .is_err());
    }
}
