use crate::config::NotifyConfig;
use crate::enrich::{VulnerabilityDescriber, VulnerabilityInfo};
use crate::extractor::KeyExtractor;
use crate::model::Record;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, warn};

use super::NotifyReport;

type HmacSha256 = Hmac<Sha256>;

/// Rendered markdown message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub title: String,
    pub text: String,
}

pub struct DingTalkNotifier {
    client: reqwest::Client,
    webhook_url: String,
    token: Option<String>,
    secret: Option<String>,
    message_limit: usize,
    describer: Box<dyn VulnerabilityDescriber>,
    extractor: KeyExtractor,
}

impl DingTalkNotifier {
    /// Reads the robot token and secret from the environment variables named in `config`.
    pub fn new(
        config: &NotifyConfig,
        message_limit: usize,
        describer: Box<dyn VulnerabilityDescriber>,
    ) -> Self {
        let read_env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        Self {
            client: reqwest::Client::new(),
            webhook_url: config.webhook_url.clone(),
            token: read_env(&config.token_env),
            secret: read_env(&config.secret_env),
            message_limit,
            describer,
            extractor: KeyExtractor::for_today(),
        }
    }

    async fn describe(&self, record: &Record) -> VulnerabilityInfo {
        match self.extractor.parse(&record.name) {
            Ok(key) => self.describer.describe(&key).await,
            Err(_) => VulnerabilityInfo::placeholder(),
        }
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(token) = &self.token {
            query.push(("access_token", token.clone()));
        }
        if let Some(secret) = &self.secret {
            let timestamp = chrono::Utc::now().timestamp_millis();
            query.push(("timestamp", timestamp.to_string()));
            query.push(("sign", sign(timestamp, secret)?));
        }

        let payload = Payload {
            msgtype: "markdown",
            markdown: Markdown {
                title: &message.title,
                text: &message.text,
            },
        };

        let response: DingTalkResponse = self
            .client
            .post(&self.webhook_url)
            .query(&query)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("posting to {}", self.webhook_url))?
            .error_for_status()?
            .json()
            .await
            .context("decoding webhook response")?;

        if response.errcode != 0 {
            bail!(
                "webhook rejected message: {} ({})",
                response.errmsg,
                response.errcode
            );
        }
        Ok(())
    }
}

#[async_trait]
impl super::Notifier for DingTalkNotifier {
    fn name(&self) -> &'static str {
        "DingTalk"
    }

    async fn notify(&self, records: &[Record]) -> NotifyReport {
        if self.token.is_none() || self.secret.is_none() {
            warn!("DingTalk token or secret is not set, sending anyway");
        }

        let mut report = NotifyReport::default();
        for record in records {
            let info = self.describe(record).await;
            let message = render_message(record, &info, self.message_limit);

            match self.send(&message).await {
                Ok(()) => {
                    info!(repo = %record.name, url = %record.html_url, "notified");
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(repo = %record.name, error = %e, "notification failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    msgtype: &'static str,
    markdown: Markdown<'a>,
}

#[derive(Serialize)]
struct Markdown<'a> {
    title: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct DingTalkResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// Computes the robot signature for `timestamp` (milliseconds since the epoch).
pub fn sign(timestamp: i64, secret: &str) -> Result<String> {
    let string_to_sign = format!("{}\n{}", timestamp, secret);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid signing key: {}", e))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Renders the notification for one new repository.
///
/// The advisory title is used when known, the repository name otherwise.
/// The repository description is cut to `limit` characters.
pub fn render_message(record: &Record, info: &VulnerabilityInfo, limit: usize) -> Message {
    let title = info
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| record.name.clone());

    let text = format!(
        "# {}\n<br>\n\n## Vulnerability\n{}\n\n<br>\n\n## Repository\n{}\n\n<br>\n\n## Summary\n{}\n",
        title,
        info.description,
        record.html_url,
        truncate(record.summary(), limit)
    );

    Message { title, text }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
