use crate::config::SearchConfig;
use crate::model::Record;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header;
use serde_json::Value;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("cvewatch/", env!("CARGO_PKG_VERSION"));

pub struct GitHubSearch {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
    per_page: u32,
}

impl GitHubSearch {
    pub fn new(config: &SearchConfig) -> Self {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.is_empty());
        if token.is_none() {
            debug!(env = %config.token_env, "no GitHub token, searching anonymously");
        }

        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            token,
            per_page: config.per_page,
        }
    }
}

impl Default for GitHubSearch {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

#[async_trait]
impl super::SearchProvider for GitHubSearch {
    fn name(&self) -> &'static str {
        "GitHub"
    }

    async fn search(&self, query: &str) -> Result<Vec<Record>> {
        let per_page = self.per_page.to_string();
        let mut request = self
            .client
            .get(&self.api_url)
            .query(&[("q", query), ("sort", "updated"), ("per_page", per_page.as_str())])
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/vnd.github+json");

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("requesting {} for {:?}", self.api_url, query))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{} returned {} for {:?}", self.api_url, status, query);
        }

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("decoding search response for {:?}", query))?;

        parse_items(&body).with_context(|| format!("search for {:?}", query))
    }
}

/// Decodes the `items` array of a search response one item at a time.
///
/// A response without an `items` array is an error. Items that do not
/// decode as a [`Record`] are logged and skipped.
pub fn parse_items(body: &Value) -> Result<Vec<Record>> {
    let Some(items) = body.get("items").and_then(Value::as_array) else {
        match body.get("message").and_then(Value::as_str) {
            Some(message) => bail!("response has no items: {}", message),
            None => bail!("response has no items"),
        }
    };

    Ok(items
        .iter()
        .filter_map(|item| match serde_json::from_value::<Record>(item.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                let id = item.get("id").cloned().unwrap_or(Value::Null);
                warn!(error = %e, item_id = %id, "skipping malformed search item");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchProvider;
    use serde_json::json;

    #[test]
    fn test_parse_items() {
        let body = json!({
            "total_count": 2,
            "items": [
                {
                    "id": 1,
                    "name": "CVE-2024-0001",
                    "description": "PoC",
                    "html_url": "https://github.com/a/CVE-2024-0001",
                    "owner": {"id": 10, "login": "a"}
                },
                {
                    "id": 2,
                    "name": "CVE-2024-0002",
                    "description": null,
                    "html_url": "https://github.com/b/CVE-2024-0002",
                    "owner": {"id": 11, "login": "b"}
                }
            ]
        });

        let records = parse_items(&body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].summary(), "PoC");
        assert_eq!(records[1].owner.id, 11);
    }

    #[test]
    fn test_parse_items_skips_malformed() {
        let body = json!({
            "items": [
                {"id": "not-a-number", "name": "x"},
                {
                    "id": 3,
                    "name": "CVE-2024-0003",
                    "html_url": "https://github.com/c/CVE-2024-0003",
                    "owner": {"id": 12, "login": "c"}
                }
            ]
        });

        let records = parse_items(&body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 3);
    }

    #[test]
    fn test_parse_items_without_items_is_error() {
        let err = parse_items(&json!({"message": "Validation Failed"})).unwrap_err();
        assert!(err.to_string().contains("Validation Failed"));

        assert!(parse_items(&Value::Null).is_err());
        assert!(parse_items(&json!({"items": "not-an-array"})).is_err());
    }

    #[test]
    fn test_parse_items_empty_array_is_ok() {
        let records = parse_items(&json!({"total_count": 0, "items": []})).unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_search_without_items_fails() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            let body = r#"{"message":"Validation Failed"}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let config = SearchConfig {
            api_url: format!("http://{}/search/repositories", addr),
            token_env: "CVEWATCH_TEST_UNSET_TOKEN".to_string(),
            per_page: 30,
        };
        let result = GitHubSearch::new(&config).search("CVE-20").await;
        server.await.unwrap();

        assert!(result.is_err());
    }

    #[test]
    fn test_github_search_default() {
        let search = GitHubSearch::default();
        assert_eq!(search.name(), "GitHub");
        assert_eq!(search.per_page, 30);
    }
}
