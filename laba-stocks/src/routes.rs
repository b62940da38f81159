//! HTTP API routes.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::StockError;
use crate::orchestrator::{JsonPayload, QueryOrchestrator};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<QueryOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<QueryOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

type ApiResult = Result<JsonPayload, StockError>;

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Extractor-backed
        .route("/info/:symbol", get(stock_data))
        .route("/get-profile/:symbol", get(stock_profile))
        .route("/get-top-stocks", get(top_stocks))
        .route("/analysis/:symbol", get(analysis))
        .route("/get-historical-data/:symbol", get(historical_data))
        .route("/get-eps/:symbol", get(eps))
        .route("/get-pe-ratio/:symbol", get(pe_ratio))
        .route("/get-aaa-corp-bond-yield", get(aaa_corporate_bond_yield))
        .route("/search/:query", get(search))
        .route("/get-dcf-value/:symbol", get(dcf_value))
        .route("/get-ddm-value/:symbol", get(ddm_value))
        .route("/get-benjamin-graham-value/:symbol", get(graham_value))
        // Forecast API
        .route("/get-forecast/:symbol", get(forecast))
        // Screening
        .route("/get-benjamin-graham-list", get(graham_list))
        .route("/get-intrinsic-value-list", get(intrinsic_value_list));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/stocks", api)
        .with_state(state)
}

// ============ Health Check ============

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "laba-stocks",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============ Query Parameters ============

#[derive(Debug, Default, Deserialize)]
struct CategoryParams {
    category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RangeParams {
    range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrahamListParams {
    sort_by: Option<String>,
    filter_by: Option<String>,
    page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrinsicListParams {
    sort_by: Option<String>,
    page: Option<String>,
}

// ============ Extractor-backed ============

async fn stock_data(State(state): State<AppState>, Path(symbol): Path<String>) -> ApiResult {
    state.orchestrator.stock_data(&symbol).await
}

async fn stock_profile(State(state): State<AppState>, Path(symbol): Path<String>) -> ApiResult {
    state.orchestrator.stock_profile(&symbol).await
}

async fn top_stocks(
    State(state): State<AppState>,
    Query(params): Query<CategoryParams>,
) -> ApiResult {
    state.orchestrator.top_stocks(params.category.as_deref()).await
}

async fn analysis(State(state): State<AppState>, Path(symbol): Path<String>) -> ApiResult {
    state.orchestrator.analysis(&symbol).await
}

async fn historical_data(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(params): Query<RangeParams>,
) -> ApiResult {
    state
        .orchestrator
        .historical_data(&symbol, params.range.as_deref())
        .await
}

async fn eps(State(state): State<AppState>, Path(symbol): Path<String>) -> ApiResult {
    state.orchestrator.eps(&symbol).await
}

async fn pe_ratio(State(state): State<AppState>, Path(symbol): Path<String>) -> ApiResult {
    state.orchestrator.pe_ratio(&symbol).await
}

async fn aaa_corporate_bond_yield(State(state): State<AppState>) -> ApiResult {
    state.orchestrator.aaa_corporate_bond_yield().await
}

async fn search(State(state): State<AppState>, Path(query): Path<String>) -> ApiResult {
    state.orchestrator.search(&query).await
}

async fn dcf_value(State(state): State<AppState>, Path(symbol): Path<String>) -> ApiResult {
    state.orchestrator.dcf_value(&symbol).await
}

async fn ddm_value(State(state): State<AppState>, Path(symbol): Path<String>) -> ApiResult {
    state.orchestrator.ddm_value(&symbol).await
}

async fn graham_value(State(state): State<AppState>, Path(symbol): Path<String>) -> ApiResult {
    state.orchestrator.graham_value(&symbol).await
}

// ============ Forecast ============

async fn forecast(State(state): State<AppState>, Path(symbol): Path<String>) -> ApiResult {
    state.orchestrator.forecast(&symbol).await
}

// ============ Screening ============

async fn graham_list(
    State(state): State<AppState>,
    Query(params): Query<GrahamListParams>,
) -> ApiResult {
    state
        .orchestrator
        .graham_list(
            params.sort_by.as_deref(),
            params.filter_by.as_deref(),
            params.page.as_deref(),
        )
        .await
}

async fn intrinsic_value_list(
    State(state): State<AppState>,
    Query(params): Query<IntrinsicListParams>,
) -> ApiResult {
    state
        .orchestrator
        .intrinsic_value_list(params.sort_by.as_deref(), params.page.as_deref())
        .await
}
