use anyhow::Result;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;

use braver::api::{AppState, create_router};
use braver::config::NewsConfig;
use braver::coordinate_engine::CoordinateEngine;
use braver::db::{Database, SearchHistoryRepo};
use braver::news_client::NewsApiClient;
use braver::noise::ConstantNoise;
use braver::query_responder::{DEMO_NEWS_COUNT, QueryResponder};

mod test_helpers {
    use super::*;

    /// State with no news key (so news is always demo data) and no MongoDB.
    pub fn test_state(engine_enabled: bool) -> Result<Arc<AppState>> {
        Ok(Arc::new(state_with_repo(engine_enabled, None)?))
    }

    pub fn state_with_repo(
        engine_enabled: bool,
        history_repo: Option<SearchHistoryRepo>,
    ) -> Result<AppState> {
        let news = NewsApiClient::new(NewsConfig::default())?;
        let responder =
            QueryResponder::new(news, "http://localhost:3000".to_string(), engine_enabled);
        let engine = engine_enabled
            .then(|| CoordinateEngine::with_noise(Box::new(ConstantNoise(0.5))));
        Ok(AppState::new(responder, engine, history_repo))
    }

    pub fn app(state: Arc<AppState>) -> Router {
        create_router(state, "static")
    }

    pub async fn get(app: &Router, uri: &str) -> Result<(StatusCode, Value)> {
        let res = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty())?)
            .await?;
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    pub async fn post(app: &Router, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))?,
            )
            .await?;
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_history_limit_after_five_searches() -> Result<()> {
    let app = app(test_state(true)?);
    for q in ["one", "two", "three", "four", "five"] {
        let (status, _) = get(&app, &format!("/api/search?q={q}")).await?;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = get(&app, "/api/history?limit=3").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "memory");
    assert_eq!(body["total"], 3);
    let queries: Vec<&str> = body["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["query"].as_str().unwrap())
        .collect();
    assert_eq!(queries, vec!["five", "four", "three"]);
    assert_eq!(body["history"][0]["sourcePath"], "/api/search");
    assert_eq!(body["history"][0]["resultCount"], 2);
    Ok(())
}

#[tokio::test]
async fn test_search_response_shape() -> Result<()> {
    let app = app(test_state(true)?);
    let (status, body) = get(&app, "/api/search?q=ankara&page=2").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "ankara");
    assert_eq!(body["total"], 2);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["source"], "Braver Explorer + Aries AI");
    Ok(())
}

#[tokio::test]
async fn test_missing_query_is_bad_request() -> Result<()> {
    let state = test_state(true)?;
    let app = app(state.clone());
    for uri in ["/api/search", "/api/news?q=", "/api/images?q=%20%20"] {
        let (status, body) = get(&app, uri).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string());
    }
    assert!(state.history.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_malformed_limit_is_bad_request() -> Result<()> {
    let app = app(test_state(true)?);
    let (status, body) = get(&app, "/api/history?limit=lots").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_news_falls_back_to_demo() -> Result<()> {
    let state = test_state(true)?;
    let app = app(state.clone());
    let (status, body) = get(&app, "/api/news?q=izmir").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "Braver Explorer (Demo)");
    assert!(body["error"].is_string());
    assert_eq!(body["news"].as_array().unwrap().len(), DEMO_NEWS_COUNT);

    let recorded = state.history.recent(1);
    assert_eq!(recorded[0].query, "izmir");
    assert_eq!(recorded[0].result_count, DEMO_NEWS_COUNT as u64);
    assert_eq!(recorded[0].source_path, "/api/news");
    Ok(())
}

#[tokio::test]
async fn test_images_are_recorded() -> Result<()> {
    let state = test_state(false)?;
    let app = app(state.clone());
    let (status, body) = get(&app, "/api/images?q=kedi").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 12);
    assert_eq!(state.history.recent(1)[0].source_path, "/api/images");
    Ok(())
}

#[tokio::test]
async fn test_popular_and_stats() -> Result<()> {
    let app = app(test_state(true)?);
    for q in ["rust", "go", "rust", "rust", "go", "zig"] {
        get(&app, &format!("/api/search?q={q}")).await?;
    }

    let (_, popular) = get(&app, "/api/popular-searches?limit=2").await?;
    assert_eq!(popular["total"], 2);
    assert_eq!(
        popular["popularSearches"][0],
        json!({ "query": "rust", "count": 3 })
    );
    assert_eq!(
        popular["popularSearches"][1],
        json!({ "query": "go", "count": 2 })
    );

    let (status, stats) = get(&app, "/api/stats").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["stats"]["totalSearches"], 6);
    assert_eq!(stats["stats"]["todaySearches"], 6);
    assert_eq!(stats["stats"]["popularToday"]["rust"], 3);
    assert_eq!(stats["stats"]["databaseStatus"], "Memory (Demo)");
    assert_eq!(stats["stats"]["aiStatus"], "Aries AI Active");
    Ok(())
}

#[tokio::test]
async fn test_suggestions_use_history() -> Result<()> {
    let app = app(test_state(true)?);
    get(&app, "/api/search?q=rust%20book").await?;

    let (status, body) = get(&app, "/api/suggest?q=ru").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"][0], "rust book");
    assert!(body["suggestions"].as_array().unwrap().len() <= 8);

    let (_, empty) = get(&app, "/api/suggest").await?;
    assert_eq!(empty["suggestions"], json!([]));
    Ok(())
}

#[tokio::test]
async fn test_transform_endpoint() -> Result<()> {
    let app = app(test_state(true)?);
    let (status, body) = post(
        &app,
        "/api/aries-ai/transform-coordinates",
        json!({
            "coordinates": { "lat": 40.0, "lng": 30.0 },
            "fromSystem": "wgs84",
            "toSystem": "itrf96"
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let lat = body["transformed"]["coords"]["lat"].as_f64().unwrap();
    let lng = body["transformed"]["coords"]["lng"].as_f64().unwrap();
    assert!((lat - (40.0 * 0.999999 + 0.000003)).abs() < 1e-12);
    assert!((lng - (30.0 * 0.999999 - 0.000003)).abs() < 1e-12);
    assert_eq!(body["transformed"]["system"], "itrf96");
    Ok(())
}

#[tokio::test]
async fn test_missing_body_fields_are_bad_request() -> Result<()> {
    let app = app(test_state(true)?);

    let (status, body) = post(
        &app,
        "/api/aries-ai/transform-coordinates",
        json!({ "coordinates": { "lat": 1.0, "lng": 2.0 }, "fromSystem": "wgs84" }),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "coordinates, fromSystem and toSystem are required");

    let (status, body) = post(&app, "/api/aries-ai/predict-coordinates", json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "partialData is required");

    let (status, _) = post(&app, "/api/aries-ai/chat", json!({ "context": "general" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_engine_routes_when_enabled() -> Result<()> {
    let app = app(test_state(true)?);

    let (status, body) = post(
        &app,
        "/api/aries-ai/predict-coordinates",
        json!({ "partialData": { "lat": 41.0 } }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert!((body["predicted"]["lat"].as_f64().unwrap() - 41.0).abs() <= 0.001);
    assert!(body["marginOfError"].is_string());

    let (status, body) = post(&app, "/api/aries-ai/estimate-parameters", json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["estimated_parameters"]["geoid_undulation"].is_number());

    let (status, body) = post(&app, "/api/aries-ai/analyze-topography", json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["watersheds"]["sub_basins"], 12);

    let (status, body) = get(&app, "/api/ai-status").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    Ok(())
}

#[tokio::test]
async fn test_engine_disabled_returns_503() -> Result<()> {
    let app = app(test_state(false)?);
    let routes = [
        ("/api/aries-ai/predict-coordinates", json!({ "partialData": {} })),
        ("/api/aries-ai/estimate-parameters", json!({})),
        (
            "/api/aries-ai/transform-coordinates",
            json!({ "coordinates": { "lat": 1.0, "lng": 1.0 }, "fromSystem": "a", "toSystem": "b" }),
        ),
        ("/api/aries-ai/analyze-topography", json!({})),
    ];
    for (uri, body) in routes {
        let (status, res) = post(&app, uri, body).await?;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
        assert!(res["error"].is_string());
        assert!(res["suggestion"].is_string());
    }

    let (status, _) = get(&app, "/api/aries-ai/status").await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (_, status_body) = get(&app, "/api/ai-status").await?;
    assert_eq!(status_body["status"], "disabled");
    Ok(())
}

#[tokio::test]
async fn test_chat_works_without_engine() -> Result<()> {
    let app = app(test_state(false)?);
    let (status, body) = post(
        &app,
        "/api/aries-ai/chat",
        json!({ "message": "hello", "context": "cadastral" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["context"], "cadastral");
    assert_eq!(body["ai_engine"], "Basic Chat");
    assert!(body["response"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_results_page_escapes_query() -> Result<()> {
    let app = app(test_state(true)?);
    let res = app
        .oneshot(
            Request::builder()
                .uri("/search?q=%3Cscript%3E")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = to_bytes(res.into_body(), usize::MAX).await?;
    let html = String::from_utf8(bytes.to_vec())?;
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));
    Ok(())
}

#[tokio::test]
async fn test_record_search_keeps_memory_copy_with_unreachable_mongo() -> Result<()> {
    // Nothing listens on port 1; the mirror's inserts fail in the background.
    let db = Database::connect_lazy("mongodb://127.0.0.1:1", "braver_offline").await?;
    let state = state_with_repo(false, Some(SearchHistoryRepo::spawn(&db)))?;
    assert_eq!(state.database_status(), "MongoDB Active");

    let started = Instant::now();
    state.record_search("ankara", 8, started, "/api/news");
    state.record_search("izmir", 3, started, "/api/search");
    assert!(started.elapsed() < Duration::from_millis(500));

    assert_eq!(state.history.len(), 2);
    let recent = state.history.recent(10);
    assert_eq!(recent[0].query, "izmir");
    assert_eq!(recent[1].query, "ankara");
    assert_eq!(recent[1].result_count, 8);
    Ok(())
}
