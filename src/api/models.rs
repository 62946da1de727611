use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::coordinate_engine::{LatLng, PartialCoordinates};
use crate::data_models::SearchEvent;
use crate::history::PopularQuery;

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub query: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<SearchEvent>,
    pub total: usize,
    pub source: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularResponse {
    pub success: bool,
    pub popular_searches: Vec<PopularQuery>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: Stats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_searches: usize,
    pub today_searches: u64,
    pub database_status: &'static str,
    pub ai_status: &'static str,
    pub popular_today: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
pub struct AiStatusResponse {
    pub ai_engine: &'static str,
    pub status: &'static str,
    pub version: &'static str,
    pub capabilities: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    pub partial_data: Option<PartialCoordinates>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    pub survey_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub coordinates: Option<LatLng>,
    pub from_system: Option<String>,
    pub to_system: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TopographyRequest {
    pub area_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub context: Option<String>,
}
