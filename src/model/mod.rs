//! Core data types for tracked repositories.
//!
//! - [`Record`] - A repository returned by a search
//! - [`TrackingKey`] - The CVE identifier a record is filed under
//! - [`DatedLog`] - Cumulative additions and updates for one day
//! - [`RunResultSets`] - Additions and updates of a single run
//!
//! # Example
//!
//! ```
//! use cvewatch::model::{Owner, Record};
//!
//! let owner = Owner { id: 1, login: "alice".to_string() };
//! let record = Record::new(100, "CVE-2024-1234-poc", owner).with_description("PoC");
//!
//! assert_eq!(record.summary(), "PoC");
//! ```

mod key;
mod log;
mod record;

pub use key::*;
pub use log::*;
pub use record::*;
