use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::Html,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::chat::{ChatReply, DEFAULT_CONTEXT};
use crate::coordinate_engine::{
    CAPABILITIES, ENGINE_NAME, ENGINE_VERSION, EngineStatus, ParameterEstimate, Prediction,
    Transformation,
};
use crate::error::ApiError;
use crate::query_responder::{
    BRAND, ImageResults, MAX_SUGGESTIONS, NewsResults, WebResults, merge_suggestions,
};

use super::AppState;
use super::models::{
    AiStatusResponse, ChatRequest, EstimateRequest, HistoryResponse, LimitParams,
    PopularResponse, PredictRequest, SearchParams, Stats, StatsResponse, SuggestResponse,
    TopographyRequest, TransformRequest,
};

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const DEFAULT_POPULAR_LIMIT: i64 = 10;
const TRANSFORM_FIELDS_REQUIRED: &str = "coordinates, fromSystem and toSystem are required";

type ApiResult<T> = Result<Json<T>, ApiError>;

fn required_query(q: Option<String>) -> Result<String, ApiError> {
    match q.map(|q| q.trim().to_string()) {
        Some(q) if !q.is_empty() => Ok(q),
        _ => Err(ApiError::Validation("Query cannot be empty".to_string())),
    }
}

fn required_text(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::Validation(message.to_string()))
}

pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<WebResults> {
    let start = Instant::now();
    let Query(params) = params?;
    let query = required_query(params.q)?;

    let results = state
        .responder
        .search_web(&query, params.page.unwrap_or(1).max(1));

    state.record_search(&query, results.total as u64, start, "/api/search");
    Ok(Json(results))
}

pub async fn news_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<NewsResults> {
    let start = Instant::now();
    let Query(params) = params?;
    let query = required_query(params.q)?;

    let results = state
        .responder
        .search_news(&query, params.page.unwrap_or(1).max(1))
        .await;

    state.record_search(&query, results.total, start, "/api/news");
    Ok(Json(results))
}

pub async fn images_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<ImageResults> {
    let start = Instant::now();
    let Query(params) = params?;
    let query = required_query(params.q)?;

    let results = state.responder.search_images(&query);

    state.record_search(&query, results.total as u64, start, "/api/images");
    Ok(Json(results))
}

pub async fn suggest_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<SuggestResponse> {
    let Query(params) = params?;
    let query = params.q.unwrap_or_default().trim().to_string();
    if query.is_empty() {
        return Ok(Json(SuggestResponse {
            query,
            suggestions: Vec::new(),
        }));
    }

    let from_history = state.history.suggest(&query, MAX_SUGGESTIONS);
    Ok(Json(SuggestResponse {
        suggestions: merge_suggestions(from_history, &query),
        query,
    }))
}

pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> ApiResult<HistoryResponse> {
    let Query(params) = params?;
    let history = state
        .history
        .recent(params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT));

    Ok(Json(HistoryResponse {
        success: true,
        total: history.len(),
        history,
        source: "memory",
    }))
}

pub async fn popular_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> ApiResult<PopularResponse> {
    let Query(params) = params?;
    let popular_searches = state
        .history
        .popular(params.limit.unwrap_or(DEFAULT_POPULAR_LIMIT));

    Ok(Json(PopularResponse {
        success: true,
        total: popular_searches.len(),
        popular_searches,
    }))
}

pub async fn stats_handler(State(state): State<Arc<AppState>>) -> ApiResult<StatsResponse> {
    let totals = state.history.totals_for_today();

    Ok(Json(StatsResponse {
        success: true,
        stats: Stats {
            total_searches: totals.total,
            today_searches: totals.day.count,
            database_status: state.database_status(),
            ai_status: if state.engine.is_some() {
                "Aries AI Active"
            } else {
                "AI Disabled"
            },
            popular_today: totals.day.per_query,
        },
    }))
}

pub async fn ai_status_handler(State(state): State<Arc<AppState>>) -> Json<AiStatusResponse> {
    let active = state.engine.is_some();
    let capabilities = if active {
        CAPABILITIES.iter().map(|c| c.to_string()).collect()
    } else {
        vec!["AI engine not available".to_string()]
    };

    Json(AiStatusResponse {
        ai_engine: ENGINE_NAME,
        status: if active { "active" } else { "disabled" },
        version: ENGINE_VERSION,
        capabilities,
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub async fn engine_status_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<EngineStatus> {
    Ok(Json(state.engine()?.status()))
}

pub async fn predict_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<Prediction> {
    let engine = state.engine()?;
    let Json(request) = body?;
    let partial = request
        .partial_data
        .ok_or_else(|| ApiError::Validation("partialData is required".to_string()))?;

    Ok(Json(engine.predict(partial)))
}

pub async fn estimate_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<EstimateRequest>>,
) -> ApiResult<ParameterEstimate> {
    let engine = state.engine()?;
    let survey = body
        .and_then(|Json(r)| r.survey_data)
        .unwrap_or_else(|| Value::Object(Default::default()));

    Ok(Json(engine.estimate_parameters(&survey)))
}

pub async fn transform_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TransformRequest>, JsonRejection>,
) -> ApiResult<Transformation> {
    let engine = state.engine()?;
    let Json(request) = body?;
    let coordinates = request
        .coordinates
        .ok_or_else(|| ApiError::Validation(TRANSFORM_FIELDS_REQUIRED.to_string()))?;
    let from = required_text(request.from_system, TRANSFORM_FIELDS_REQUIRED)?;
    let to = required_text(request.to_system, TRANSFORM_FIELDS_REQUIRED)?;

    Ok(Json(engine.transform(coordinates, &from, &to)))
}

pub async fn topography_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<TopographyRequest>>,
) -> ApiResult<Value> {
    let engine = state.engine()?;
    let area = body
        .and_then(|Json(r)| r.area_data)
        .unwrap_or_else(|| Value::Object(Default::default()));

    Ok(Json(engine.analyze_terrain(&area)))
}

/// Answers with or without the engine; only the `ai_engine` label changes.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatReply> {
    let Json(request) = body?;
    let message = required_text(request.message, "message is required")?;
    let context = request
        .context
        .unwrap_or_else(|| DEFAULT_CONTEXT.to_string());

    Ok(Json(state.chat.reply(
        &message,
        &context,
        state.engine.is_some(),
    )))
}

/// Minimal HTML landing page for the first web result's link.
pub async fn results_page_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Html<String> {
    let query = params.q.unwrap_or_default();
    let q = html_escape::encode_text(&query);
    let active = state.engine.is_some();
    let badge = if active {
        r#"<span class="ai-badge">Aries AI</span>"#
    } else {
        ""
    };
    let note = if active {
        "Aries AI is active and running!"
    } else {
        "The AI engine could not be loaded."
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{q} - {BRAND}</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; background: #1a1a2e; color: white; }}
        .container {{ max-width: 800px; margin: 0 auto; }}
        .logo {{ font-size: 2rem; color: #ff6b35; margin-bottom: 20px; }}
        .back-btn {{ background: #ff6b35; color: white; padding: 10px 20px; border: none; border-radius: 5px; cursor: pointer; }}
        .ai-badge {{ background: #daa520; color: black; padding: 5px 10px; border-radius: 15px; font-size: 0.8rem; margin-left: 10px; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="logo">{BRAND} {badge}</div>
        <h1>"{q}" search results</h1>
        <p>This page is a demo. {note}</p>
        <button class="back-btn" onclick="window.history.back()">&larr; Back</button>
    </div>
</body>
</html>
"#
    ))
}
