use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};

/// Tag stored on every search event served by this backend.
pub const EVENT_SOURCE: &str = "braver";

/// One observed search-like request. Never mutated after creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchEvent {
    pub id: String,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub result_count: u64,
    pub response_time_ms: u64,
    pub source: String,
    pub source_path: String,
}

impl SearchEvent {
    pub fn new(
        query: String,
        result_count: u64,
        response_time_ms: u64,
        source_path: String,
    ) -> SearchEvent {
        SearchEvent::at(Utc::now(), query, result_count, response_time_ms, source_path)
    }

    pub fn at(
        timestamp: DateTime<Utc>,
        query: String,
        result_count: u64,
        response_time_ms: u64,
        source_path: String,
    ) -> SearchEvent {
        SearchEvent {
            id: nanoid!(),
            query,
            timestamp,
            result_count,
            response_time_ms,
            source: EVENT_SOURCE.to_string(),
            source_path,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResultItem {
    pub url: String,
    pub title: String,
    pub content: String,
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ImageResult {
    pub id: u32,
    pub url: String,
    pub thumbnail: String,
    pub title: String,
    pub source: String,
    pub link: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub image: String,
    pub source: String,
    pub published_at: String,
    pub author: String,
}

/// MongoDB projection of a [`SearchEvent`], written by the history mirror.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchHistoryDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub event_id: String,
    pub query: String,
    pub result_count: i64,
    pub response_time: i64,
    pub source: String,
    pub path: String,
    pub timestamp: bson::DateTime,
}

impl From<&SearchEvent> for SearchHistoryDoc {
    fn from(event: &SearchEvent) -> Self {
        SearchHistoryDoc {
            id: ObjectId::new(),
            event_id: event.id.clone(),
            query: event.query.clone(),
            result_count: event.result_count as i64,
            response_time: event.response_time_ms as i64,
            source: event.source.clone(),
            path: event.source_path.clone(),
            timestamp: bson::DateTime::from_millis(event.timestamp.timestamp_millis()),
        }
    }
}

#[test]
fn test_search_event_serializes_camel_case() {
    let event = SearchEvent::new("rust".into(), 2, 14, "/api/search".into());
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(value["query"], "rust");
    assert_eq!(value["resultCount"], 2);
    assert_eq!(value["responseTimeMs"], 14);
    assert_eq!(value["sourcePath"], "/api/search");
    assert_eq!(value["source"], EVENT_SOURCE);
    assert!(value["id"].as_str().is_some_and(|id| !id.is_empty()));
}
