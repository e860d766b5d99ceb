//! Repository search.
//!
//! [`SearchProvider`] is the seam between the change-detection engine and
//! the code-hosting platform. [`GitHubSearch`] is the production backend.

mod github;

pub use github::{parse_items, GitHubSearch};

use crate::model::Record;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the repositories matching `query`.
    ///
    /// An empty result is not an error. Items that cannot be decoded are
    /// skipped by the implementation.
    async fn search(&self, query: &str) -> Result<Vec<Record>>;
}
