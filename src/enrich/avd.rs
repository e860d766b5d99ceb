use crate::cache::Cache;
use crate::model::TrackingKey;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::VulnerabilityInfo;

const AVD_DETAIL_URL: &str = "https://avd.aliyun.com/detail";

/// Scrapes the Aliyun vulnerability database detail page.
pub struct AvdDescriber {
    client: reqwest::Client,
    cache: Cache,
}

impl AvdDescriber {
    pub fn with_cache(cache: Cache) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache,
        }
    }

    fn cache_key(key: &TrackingKey) -> String {
        format!("avd_{}", key.identifier())
    }

    async fn fetch(&self, key: &TrackingKey) -> Result<String> {
        let id = format!("AVD-{}", key.number());
        let response = self
            .client
            .get(AVD_DETAIL_URL)
            .query(&[("id", id.as_str())])
            .send()
            .await
            .with_context(|| format!("requesting {} for {}", AVD_DETAIL_URL, id))?
            .error_for_status()?;

        Ok(response.text().await?)
    }
}

#[async_trait]
impl super::VulnerabilityDescriber for AvdDescriber {
    fn name(&self) -> &'static str {
        "AVD"
    }

    async fn describe(&self, key: &TrackingKey) -> VulnerabilityInfo {
        let cache_key = Self::cache_key(key);
        if let Some(info) = self.cache.get::<VulnerabilityInfo>(&cache_key) {
            debug!(cve = %key, "using cached description");
            return info;
        }

        let page = match self.fetch(key).await {
            Ok(page) => page,
            Err(e) => {
                warn!(cve = %key, error = %e, "description lookup failed");
                return VulnerabilityInfo::placeholder();
            }
        };

        match parse_avd_page(&page) {
            Some(info) => {
                if let Err(e) = self.cache.set(&cache_key, &info) {
                    debug!(cve = %key, error = %e, "failed to cache description");
                }
                info
            }
            None => {
                debug!(cve = %key, "no description on AVD page");
                VulnerabilityInfo::placeholder()
            }
        }
    }
}

fn description_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"<div class="text-detail pt-2 pb-4">\s*<div>(.+?)</div>"#)
            .expect("description pattern is valid")
    })
}

fn title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"<span class="header__title__text" style="vertical-align: middle;">(.+?)</span>"#,
        )
        .expect("title pattern is valid")
    })
}

/// Extracts the title and description from an AVD detail page.
///
/// Returns `None` unless both are present.
pub fn parse_avd_page(html: &str) -> Option<VulnerabilityInfo> {
    let description = description_pattern().captures(html)?[1].trim().to_string();
    let title = title_pattern().captures(html)?[1].trim().to_string();

    Some(VulnerabilityInfo {
        title: Some(title),
        description,
    })
}
