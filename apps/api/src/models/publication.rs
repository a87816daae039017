use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One successful publish of an approved section.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PublicationRow {
    pub id: Uuid,
    pub owner_id: String,
    pub draft_id: Uuid,
    pub section: String,
    pub destination: String,
    pub reference: String,
    pub view_url: Option<String>,
    pub remote_id: String,
    pub asset_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
