use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Liveness plus which optional integrations are configured.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "studio-api",
        "integrations": {
            "gemini": config.gemini_api_key.is_some(),
            "canva": config.canva_client_id.is_some() && config.canva_client_secret.is_some(),
        }
    }))
}
