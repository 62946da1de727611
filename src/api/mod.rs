use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::chat::ChatResponder;
use crate::config::Config;
use crate::coordinate_engine::CoordinateEngine;
use crate::data_models::SearchEvent;
use crate::db::{Database, SearchHistoryRepo};
use crate::error::ApiError;
use crate::history::HistoryStore;
use crate::news_client::NewsApiClient;
use crate::query_responder::QueryResponder;

pub mod handlers;
pub mod models;

/// Everything a request handler can reach. Built once at startup.
pub struct AppState {
    pub history: HistoryStore,
    pub responder: QueryResponder,
    pub engine: Option<CoordinateEngine>,
    pub chat: ChatResponder,
    pub history_repo: Option<SearchHistoryRepo>,
}

impl AppState {
    pub fn new(
        responder: QueryResponder,
        engine: Option<CoordinateEngine>,
        history_repo: Option<SearchHistoryRepo>,
    ) -> Self {
        Self {
            history: HistoryStore::new(),
            responder,
            engine,
            chat: ChatResponder::default(),
            history_repo,
        }
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        let db =
            Database::connect_optional(config.mongo_uri.as_deref(), &config.mongo_db_name).await;
        let history_repo = db.as_ref().map(SearchHistoryRepo::spawn);

        let engine = if config.aries_ai_enabled {
            Some(CoordinateEngine::new())
        } else {
            log::warn!("Aries AI disabled by configuration");
            None
        };

        let news = NewsApiClient::new(config.news.clone())?;
        if news.config().api_key.is_none() {
            log::warn!("NEWS_API_KEY not set, news results will be demo data");
        }
        let responder = QueryResponder::new(
            news,
            format!("http://localhost:{}", config.port),
            engine.is_some(),
        );

        Ok(Self::new(responder, engine, history_repo))
    }

    pub fn engine(&self) -> Result<&CoordinateEngine, ApiError> {
        self.engine.as_ref().ok_or(ApiError::EngineDisabled)
    }

    pub fn database_status(&self) -> &'static str {
        if self.history_repo.is_some() {
            "MongoDB Active"
        } else {
            "Memory (Demo)"
        }
    }

    /// Records the search in memory and, when configured, mirrors it to MongoDB.
    pub fn record_search(&self, query: &str, result_count: u64, started: Instant, path: &str) {
        let response_time_ms = started.elapsed().as_millis() as u64;
        let event = SearchEvent::new(
            query.to_string(),
            result_count,
            response_time_ms,
            path.to_string(),
        );
        tracing::info!(
            query = %query,
            result_count,
            response_time_ms,
            path,
            "search recorded"
        );
        if let Some(repo) = &self.history_repo {
            repo.mirror(event.clone());
        }
        self.history.record(event);
    }
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/search", get(handlers::search_handler))
        .route("/news", get(handlers::news_handler))
        .route("/images", get(handlers::images_handler))
        .route("/suggest", get(handlers::suggest_handler))
        .route("/history", get(handlers::history_handler))
        .route("/popular-searches", get(handlers::popular_handler))
        .route("/stats", get(handlers::stats_handler))
        .route("/ai-status", get(handlers::ai_status_handler))
        .route("/aries-ai/status", get(handlers::engine_status_handler))
        .route(
            "/aries-ai/predict-coordinates",
            post(handlers::predict_handler),
        )
        .route(
            "/aries-ai/estimate-parameters",
            post(handlers::estimate_handler),
        )
        .route(
            "/aries-ai/transform-coordinates",
            post(handlers::transform_handler),
        )
        .route(
            "/aries-ai/analyze-topography",
            post(handlers::topography_handler),
        )
        .route("/aries-ai/chat", post(handlers::chat_handler))
}

pub fn create_router(state: Arc<AppState>, static_dir: impl AsRef<Path>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_dir = static_dir.as_ref();
    // Unknown paths get the front end's index page
    let front_end =
        ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .nest("/api", api_routes())
        .route("/search", get(handlers::results_page_handler))
        .with_state(state)
        .fallback_service(front_end)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
