use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::drafts::models::{ApprovedSection, Draft};
use crate::drafts::store::{fetch_owned, DraftFilter};
use crate::errors::AppError;
use crate::identity::Identity;
use crate::pipelines::PipelineInput;
use crate::state::AppState;

/// Trend headlines folded into a weekly plan submitted without any.
const PLAN_TREND_COUNT: i64 = 10;

#[derive(Deserialize)]
pub struct ScopeQuery {
    pub scope: Option<String>,
}

#[derive(Serialize)]
pub struct ResetAllResponse {
    pub reset: usize,
}

/// POST /api/v1/drafts
///
/// Answers 202 with the placeholder draft; generation continues in the background.
pub async fn handle_submit(
    State(state): State<AppState>,
    identity: Identity,
    Json(mut input): Json<PipelineInput>,
) -> Result<(StatusCode, Json<Draft>), AppError> {
    if let PipelineInput::WeeklyPlan { trends, .. } = &mut input {
        if trends.is_empty() {
            *trends = state
                .trends
                .recent(None, PLAN_TREND_COUNT)
                .await?
                .into_iter()
                .map(|t| t.headline)
                .collect();
        }
    }
    let submission = state.orchestrator.submit(&identity, input).await?;
    Ok((StatusCode::ACCEPTED, Json(submission.draft)))
}

/// GET /api/v1/drafts
pub async fn handle_list(
    State(state): State<AppState>,
    identity: Identity,
    Query(filter): Query<DraftFilter>,
) -> Result<Json<Vec<Draft>>, AppError> {
    Ok(Json(state.drafts.list(&identity.owner_id, &filter).await?))
}

/// GET /api/v1/drafts/stale
pub async fn handle_list_stale(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<Draft>>, AppError> {
    let threshold = chrono::Duration::minutes(state.config.stale_pending_minutes);
    let stale = state
        .orchestrator
        .list_stale_pending(threshold)
        .await?
        .into_iter()
        .filter(|d| d.owner_id == identity.owner_id)
        .collect();
    Ok(Json(stale))
}

/// GET /api/v1/drafts/:id
pub async fn handle_get(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Draft>, AppError> {
    Ok(Json(fetch_owned(state.drafts.as_ref(), &identity, id).await?))
}

/// DELETE /api/v1/drafts/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    fetch_owned(state.drafts.as_ref(), &identity, id).await?;
    if !state.drafts.delete(id).await? {
        return Err(AppError::NotFound(format!("Draft {id} not found")));
    }
    info!(draft_id = %id, "Draft deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/drafts/:id/regenerate
pub async fn handle_regenerate(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Draft>), AppError> {
    let submission = state.orchestrator.regenerate(&identity, id).await?;
    Ok((StatusCode::ACCEPTED, Json(submission.draft)))
}

// ── approval gate ───────────────────────────────────────────────────────────

/// POST /api/v1/drafts/:id/sections/:section/approve
pub async fn handle_approve_section(
    State(state): State<AppState>,
    identity: Identity,
    Path((id, section)): Path<(Uuid, String)>,
) -> Result<Json<Draft>, AppError> {
    Ok(Json(state.gate.approve_section(&identity, id, &section).await?))
}

/// POST /api/v1/drafts/:id/sections/:section/reject
pub async fn handle_reject_section(
    State(state): State<AppState>,
    identity: Identity,
    Path((id, section)): Path<(Uuid, String)>,
) -> Result<Json<Draft>, AppError> {
    Ok(Json(state.gate.reject_section(&identity, id, &section).await?))
}

/// POST /api/v1/drafts/:id/approve-all
pub async fn handle_approve_all(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Draft>, AppError> {
    Ok(Json(state.gate.approve_all(&identity, id).await?))
}

/// POST /api/v1/drafts/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Draft>, AppError> {
    Ok(Json(state.gate.reset_approvals(&identity, id).await?))
}

/// POST /api/v1/drafts/:id/reject
pub async fn handle_reject(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Draft>, AppError> {
    Ok(Json(state.gate.reject_draft(&identity, id).await?))
}

/// POST /api/v1/drafts/reset-approvals
pub async fn handle_reset_all(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<ResetAllResponse>, AppError> {
    let reset = state.gate.reset_all_approvals(&identity).await?;
    Ok(Json(ResetAllResponse { reset }))
}

/// POST /api/v1/drafts/:id/posted
pub async fn handle_mark_posted(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Draft>, AppError> {
    Ok(Json(state.gate.mark_posted(&identity, id).await?))
}

/// GET /api/v1/approved-sections
pub async fn handle_approved_sections(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Vec<ApprovedSection>>, AppError> {
    Ok(Json(
        state
            .gate
            .list_approved_sections(&identity, query.scope)
            .await?,
    ))
}
