//! Page-fetch collaborators. The pipeline treats "fetch a page" as an opaque
//! capability behind a narrow trait: rendered HTML in, string out, bounded
//! by a hard timeout. Fetch failures are terminal for the lead being
//! processed; there is no retry tier here.

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use thiserror::Error;
use tracing::debug;

use crate::extract::engine;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

const SEARCH_ENDPOINT: &str = "https://www.google.com/search?q=";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(HttpFetcher { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(resp.text().await?)
    }
}

/// Web-search fallback tier for contact discovery: one query per lead when
/// the listing and profile pages yielded nothing. Returns the visible text
/// of the result page for the resolver to scan.
pub async fn contact_lookup(
    fetcher: &dyn PageFetcher,
    host_name: &str,
    region: &str,
) -> Result<String, FetchError> {
    let query = format!(
        "\"{}\" contato email telefone instagram {}",
        host_name,
        region.to_lowercase()
    );
    let url = format!("{}{}", SEARCH_ENDPOINT, encode_query(&query));
    let html = fetcher.fetch(&url).await?;
    Ok(visible_text(&html))
}

fn encode_query(q: &str) -> String {
    q.replace('"', "%22").replace(' ', "+")
}

/// Flatten an HTML document to its visible text.
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    engine::element_text(doc.root_element())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedFetcher(String);

    #[async_trait]
    impl PageFetcher for CannedFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn query_encoding() {
        assert_eq!(
            encode_query("\"Maria Clara\" contato"),
            "%22Maria+Clara%22+contato"
        );
    }

    #[test]
    fn visible_text_strips_markup() {
        let text = visible_text("<html><body><p>a</p><div>b <b>c</b></div></body></html>");
        assert_eq!(text, "a b c");
    }

    #[tokio::test]
    async fn contact_lookup_returns_flattened_result_page() {
        let fetcher = CannedFetcher(
            "<html><body><div>Maria Clara — contato@mariacimoveis.com.br</div></body></html>"
                .to_string(),
        );
        let text = contact_lookup(&fetcher, "Maria Clara", "Rio de Janeiro")
            .await
            .unwrap();
        assert!(text.contains("contato@mariacimoveis.com.br"));
    }
}
