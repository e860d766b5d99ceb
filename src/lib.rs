pub mod aggregator;
pub mod blacklist;
pub mod cache;
pub mod config;
pub mod detector;
pub mod enrich;
pub mod extractor;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod output;
pub mod platform;
pub mod search;
pub mod store;

pub use cache::Cache;
pub use config::Config;
pub use model::{DatedLog, Owner, Record, RunResultSets, TrackingKey};
pub use monitor::{Monitor, RunOptions, RunSummary};
pub use store::{Loaded, RecordStore};
