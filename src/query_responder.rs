use chrono::{Duration, Utc};
use reqwest::Url;
use serde::Serialize;

use crate::data_models::{ImageResult, NewsArticle, ResultItem};
use crate::news_client::{NEWS_PAGE_SIZE, NewsApiClient};

pub const BRAND: &str = "Braver Explorer";
pub const DEMO_IMAGE_COUNT: u32 = 12;
pub const DEMO_NEWS_COUNT: usize = 8;
pub const NEWS_UNAVAILABLE: &str = "NewsAPI is temporarily unavailable";

#[derive(Serialize, Debug, Clone)]
pub struct WebResults {
    pub query: String,
    pub results: Vec<ResultItem>,
    pub total: usize,
    pub source: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct ImageResults {
    pub query: String,
    pub images: Vec<ImageResult>,
    pub total: usize,
    pub source: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewsResults {
    pub query: String,
    pub news: Vec<NewsArticle>,
    pub total: u64,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NewsResults {
    pub fn is_demo(&self) -> bool {
        self.error.is_some()
    }
}

/// Resolves queries into result sets. Web and image results are always demo
/// data; news goes upstream once and falls back to demo data on any failure.
pub struct QueryResponder {
    news: NewsApiClient,
    public_base_url: String,
    ai_enabled: bool,
}

impl QueryResponder {
    pub fn new(news: NewsApiClient, public_base_url: String, ai_enabled: bool) -> Self {
        Self {
            news,
            public_base_url,
            ai_enabled,
        }
    }

    pub fn search_web(&self, query: &str, page: u32) -> WebResults {
        log::info!("web search: {query:?}, page: {page}");
        let ai_note = if self.ai_enabled { " Aries AI is active!" } else { "" };
        let results = vec![
            ResultItem {
                url: with_query(&format!("{}/search", self.public_base_url), query),
                title: format!("{query} - Explore on {BRAND}"),
                content: format!("Comprehensive information about {query}.{ai_note}"),
                description: format!("Search results for {query}"),
            },
            ResultItem {
                url: with_query("https://www.google.com/search", query),
                title: format!("{query} - Search on Google"),
                content: "Click to run this search on Google.".to_string(),
                description: format!("Search Google for {query}"),
            },
        ];
        let source = if self.ai_enabled {
            format!("{BRAND} + Aries AI")
        } else {
            BRAND.to_string()
        };
        WebResults {
            query: query.to_string(),
            total: results.len(),
            results,
            source,
        }
    }

    pub fn search_images(&self, query: &str) -> ImageResults {
        let images: Vec<ImageResult> = (0..DEMO_IMAGE_COUNT)
            .map(|i| ImageResult {
                id: i + 1,
                url: format!("https://picsum.photos/800/600?random={i}"),
                thumbnail: format!("https://picsum.photos/200/150?random={i}"),
                title: format!("{query} image {}", i + 1),
                source: BRAND.to_string(),
                link: "#".to_string(),
            })
            .collect();
        ImageResults {
            query: query.to_string(),
            total: images.len(),
            images,
            source: BRAND.to_string(),
        }
    }

    pub async fn search_news(&self, query: &str, page: u32) -> NewsResults {
        log::info!("news search: {query:?}, page: {page}");
        match self.news.everything(query, page).await {
            Ok(upstream) => {
                log::info!("news API returned {} articles", upstream.articles.len());
                NewsResults {
                    query: query.to_string(),
                    news: upstream.articles,
                    total: upstream.total,
                    source: "NewsAPI".to_string(),
                    page: Some(page),
                    total_pages: Some(upstream.total.div_ceil(NEWS_PAGE_SIZE as u64)),
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("news API unavailable, serving demo news: {:#}", e);
                let news = demo_news(query);
                NewsResults {
                    query: query.to_string(),
                    total: news.len() as u64,
                    news,
                    source: format!("{BRAND} (Demo)"),
                    page: None,
                    total_pages: None,
                    error: Some(NEWS_UNAVAILABLE.to_string()),
                }
            }
        }
    }
}

fn with_query(base: &str, query: &str) -> String {
    Url::parse_with_params(base, &[("q", query)])
        .map(|u| u.to_string())
        .unwrap_or_else(|_| base.to_string())
}

fn demo_news_url(query: &str, n: usize) -> String {
    let mut url = match Url::parse("https://braverexplorer.com") {
        Ok(url) => url,
        Err(_) => return "#".to_string(),
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push("news").push(&format!("{query}-{n}"));
    }
    url.to_string()
}

/// Placeholder news shaped like an upstream page. Content depends only on
/// the query and the article index, apart from the publication times.
pub fn demo_news(query: &str) -> Vec<NewsArticle> {
    let now = Utc::now();
    (0..DEMO_NEWS_COUNT)
        .map(|i| NewsArticle {
            id: format!("demo-news-{}", i + 1),
            title: format!("Major development about {query} #{}", i + 1),
            description: format!(
                "Latest updates on \"{query}\". {BRAND} brings you real news through NewsAPI."
            ),
            content: format!(
                "This story is normally provided by NewsAPI. Follow the latest on \"{query}\" with {BRAND}."
            ),
            url: demo_news_url(query, i + 1),
            image: format!("https://picsum.photos/400/200?random={}", i + 100),
            source: format!("{BRAND} News"),
            published_at: (now - Duration::hours(i as i64)).to_rfc3339(),
            author: format!("{BRAND} News Team"),
        })
        .collect()
}

pub const MAX_SUGGESTIONS: usize = 8;

/// Templated completions offered when history has nothing better.
pub fn local_suggestions(query: &str) -> Vec<String> {
    vec![
        format!("what is {query}?"),
        format!("how to {query}"),
        format!("{query} news"),
        format!("{query} images"),
        format!("about {query}"),
    ]
}

/// History matches first, then templates, without duplicates.
pub fn merge_suggestions(from_history: Vec<String>, query: &str) -> Vec<String> {
    let mut out = from_history;
    for candidate in local_suggestions(query) {
        if out.len() >= MAX_SUGGESTIONS {
            break;
        }
        if !out.iter().any(|s| s.eq_ignore_ascii_case(&candidate)) {
            out.push(candidate);
        }
    }
    out.truncate(MAX_SUGGESTIONS);
    out
}

#[test]
fn test_merge_suggestions_prefers_history() {
    let merged = merge_suggestions(vec!["rust news".into(), "rustacean".into()], "rust");
    assert_eq!(merged[0], "rust news");
    assert_eq!(merged[1], "rustacean");
    assert_eq!(merged.iter().filter(|s| s.as_str() == "rust news").count(), 1);
    assert_eq!(merged.len(), 6);
}

#[test]
fn test_demo_news_url_encodes_query() {
    let url = demo_news_url("hello world/x", 3);
    assert!(url.starts_with("https://braverexplorer.com/news/"));
    assert!(url.ends_with("hello%20world%2Fx-3"));
}
