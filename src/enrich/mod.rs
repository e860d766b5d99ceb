//! Vulnerability descriptions for notifications.

mod avd;

pub use avd::{parse_avd_page, AvdDescriber};

use crate::model::TrackingKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Description shown when no lookup succeeded.
pub const PLACEHOLDER_DESCRIPTION: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityInfo {
    /// Advisory title, if the lookup found one.
    pub title: Option<String>,
    pub description: String,
}

impl VulnerabilityInfo {
    pub fn placeholder() -> Self {
        Self {
            title: None,
            description: PLACEHOLDER_DESCRIPTION.to_string(),
        }
    }
}

impl Default for VulnerabilityInfo {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// Looks up a human-readable description of a CVE.
///
/// Implementations never fail: any problem yields
/// [`VulnerabilityInfo::placeholder`].
#[async_trait]
pub trait VulnerabilityDescriber: Send + Sync {
    fn name(&self) -> &'static str;
    async fn describe(&self, key: &TrackingKey) -> VulnerabilityInfo;
}
