use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::Value;
use std::sync::Arc;

use crate::error::StoreError;
use crate::services::SnapshotStore;

pub struct AppState {
    pub store: SnapshotStore,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

fn store_error(e: StoreError) -> (StatusCode, String) {
    let status = match &e {
        StoreError::InvalidDate(_) => StatusCode::BAD_REQUEST,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => {
            tracing::error!("Snapshot store error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

fn found(date: &str, doc: Option<Value>) -> ApiResult<Value> {
    doc.map(Json)
        .ok_or_else(|| store_error(StoreError::NotFound(date.to_string())))
}

/// GET /summary/latest
async fn latest_summary(State(state): State<Arc<AppState>>) -> ApiResult<Value> {
    let date = state.store.latest_date()
        .map_err(store_error)?
        .ok_or_else(|| store_error(StoreError::NotFound("latest".to_string())))?;
    let doc = state.store.load_document(&date).map_err(store_error)?;
    found(&date, doc)
}

/// GET /summary/:date
async fn summary_for(State(state): State<Arc<AppState>>, Path(date): Path<String>) -> ApiResult<Value> {
    let doc = state.store.load_document(&date).map_err(store_error)?;
    found(&date, doc)
}

/// GET /dates - newest first
async fn dates(State(state): State<Arc<AppState>>) -> ApiResult<Vec<String>> {
    state.store.list_dates().map(Json).map_err(store_error)
}

/// GET /health
async fn health() -> &'static str {
    "OK"
}

pub fn create_rest_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/summary/latest", get(latest_summary))
        .route("/summary/:date", get(summary_for))
        .route("/dates", get(dates))
        .with_state(state)
}
