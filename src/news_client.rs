use anyhow::{Context, Result};
use html2text::from_read;
use serde::Deserialize;
use thiserror::Error;

use crate::config::NewsConfig;
use crate::data_models::NewsArticle;

pub const NEWS_PAGE_SIZE: u32 = 10;

/// Why a news lookup could not be served from upstream.
///
/// Never surfaced to API clients: the responder turns it into a demo payload.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("news API key is not configured")]
    NotConfigured,

    #[error("request to news API failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("news API responded with status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed news API payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResponse {
    total_results: u64,
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawArticle {
    source: Option<RawSource>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewsPage {
    pub articles: Vec<NewsArticle>,
    pub total: u64,
}

/// Thin client for a NewsAPI-compatible `/v2/everything` endpoint.
pub struct NewsApiClient {
    http: reqwest::Client,
    config: NewsConfig,
}

impl NewsApiClient {
    pub fn new(config: NewsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build news API HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &NewsConfig {
        &self.config
    }

    /// Single attempt, no retry. Any failure is returned to the caller as-is.
    pub async fn everything(&self, query: &str, page: u32) -> Result<NewsPage, UpstreamError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(UpstreamError::NotConfigured)?;

        let url = format!("{}/v2/everything", self.config.base_url.trim_end_matches('/'));
        let page_str = page.to_string();
        let page_size = NEWS_PAGE_SIZE.to_string();
        let res = self
            .http
            .get(url)
            .query(&[
                ("q", query),
                ("page", page_str.as_str()),
                ("pageSize", page_size.as_str()),
                ("language", self.config.language.as_str()),
                ("sortBy", "publishedAt"),
                ("apiKey", api_key),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let body = res.text().await?;
        let parsed: EverythingResponse = serde_json::from_str(&body)?;

        let stamp = chrono::Utc::now().timestamp_millis();
        let articles = parsed
            .articles
            .into_iter()
            .enumerate()
            .map(|(index, raw)| to_article(index, stamp, raw))
            .collect();

        Ok(NewsPage {
            articles,
            total: parsed.total_results,
        })
    }
}

fn to_article(index: usize, stamp: i64, raw: RawArticle) -> NewsArticle {
    NewsArticle {
        id: format!("news-{index}-{stamp}"),
        title: raw.title.unwrap_or_else(|| "No title".to_string()),
        description: raw
            .description
            .map(|d| flatten_html(&d))
            .unwrap_or_else(|| "No description".to_string()),
        content: raw
            .content
            .map(|c| flatten_html(&c))
            .unwrap_or_else(|| "No content".to_string()),
        url: raw.url.unwrap_or_else(|| "#".to_string()),
        image: raw
            .url_to_image
            .unwrap_or_else(|| format!("https://picsum.photos/400/200?random={index}")),
        source: raw
            .source
            .and_then(|s| s.name)
            .unwrap_or_else(|| "Unknown source".to_string()),
        published_at: raw
            .published_at
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        author: raw.author.unwrap_or_else(|| "Unknown author".to_string()),
    }
}

/// Upstream descriptions sometimes carry markup; reduce them to a single line of text.
pub fn flatten_html(text: &str) -> String {
    if !text.contains('<') {
        return text.to_string();
    }
    match from_read(text.as_bytes(), 200) {
        Ok(plain) => plain.split_whitespace().collect::<Vec<_>>().join(" "),
        Err(e) => {
            log::debug!("could not flatten article html: {:#}", e);
            text.to_string()
        }
    }
}

#[test]
fn test_flatten_html_passthrough_and_strip() {
    assert_eq!(flatten_html("plain words"), "plain words");

    let flat = flatten_html("<p>Breaking <b>news</b></p>\n<p>second line</p>");
    assert!(!flat.contains('<'));
    assert!(flat.contains("Breaking"));
    assert!(flat.contains("second line"));
    assert!(!flat.contains('\n'));
}
