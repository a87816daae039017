use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::identity::Identity;
use crate::models::publication::PublicationRow;
use crate::publish::oauth::{AuthorizationRequest, ConnectionStatus};
use crate::publish::{Destination, PublishReceipt};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PublishRequest {
    pub destination: Destination,
}

/// POST /api/v1/drafts/:id/sections/:section/publish
pub async fn handle_publish(
    State(state): State<AppState>,
    identity: Identity,
    Path((id, section)): Path<(Uuid, String)>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<PublishReceipt>, AppError> {
    let approved = state.gate.approved_section(&identity, id, &section).await?;
    let publisher = state.publishers.get(req.destination)?;
    let receipt = publisher.publish(&identity, &approved).await?;
    info!(draft_id = %id, section = %section, destination = ?req.destination, "Section published");
    // the remote object already exists, so a failed record must not fail the publish
    if let Err(e) = state.publications.record(&identity, &approved, &receipt).await {
        warn!(draft_id = %id, section = %section, error = %e, "Failed to record publication");
    }
    Ok(Json(receipt))
}

#[derive(Deserialize)]
pub struct PublicationQuery {
    pub draft_id: Option<Uuid>,
}

/// GET /api/v1/publications
pub async fn handle_list_publications(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<PublicationQuery>,
) -> Result<Json<Vec<PublicationRow>>, AppError> {
    Ok(Json(state.publications.list(&identity, query.draft_id).await?))
}

/// GET /api/v1/canva/auth-url
pub async fn handle_canva_auth_url(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<AuthorizationRequest>, AppError> {
    Ok(Json(state.canva.authorization_url(&identity)?))
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /api/v1/canva/callback
///
/// Browser redirect target; always answers with a redirect back to the planner.
pub async fn handle_canva_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackQuery>,
) -> Redirect {
    let planner = format!("{}/planner", state.config.dashboard_url.trim_end_matches('/'));
    let encode = |v: &str| url::form_urlencoded::byte_serialize(v.as_bytes()).collect::<String>();

    if let Some(error) = params.error {
        warn!(error = %error, "Canva OAuth error");
        return Redirect::to(&format!("{planner}?error={}", encode(&error)));
    }
    let (Some(code), Some(oauth_state)) = (params.code, params.state) else {
        return Redirect::to(&format!("{planner}?error=missing_params"));
    };

    match state.canva.exchange(&code, &oauth_state).await {
        Ok(_) => Redirect::to(&format!("{planner}?canva=connected")),
        Err(e) => {
            warn!(error = %e, "Canva token exchange failed");
            Redirect::to(&format!("{planner}?error={}", encode(&e.to_string())))
        }
    }
}

/// GET /api/v1/canva/status
pub async fn handle_canva_status(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<ConnectionStatus>, AppError> {
    Ok(Json(state.canva.status(&identity).await?))
}
