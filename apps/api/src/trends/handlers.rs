use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::identity::Identity;
use crate::models::trend::TrendRow;
use crate::state::AppState;
use crate::trends::scanner::ScanReport;

const DEFAULT_LIMIT: i64 = 20;

#[derive(Deserialize)]
pub struct TrendQuery {
    pub category: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/v1/trends
pub async fn handle_list_trends(
    State(state): State<AppState>,
    _identity: Identity,
    Query(query): Query<TrendQuery>,
) -> Result<Json<Vec<TrendRow>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 100);
    let rows = state
        .trends
        .recent(query.category.as_deref(), limit)
        .await?;
    Ok(Json(rows))
}

/// POST /api/v1/trends/scan
pub async fn handle_scan_trends(
    State(state): State<AppState>,
    _identity: Identity,
) -> Result<Json<ScanReport>, AppError> {
    Ok(Json(state.scanner.scan().await))
}
