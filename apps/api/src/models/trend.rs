use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrendRow {
    pub id: Uuid,
    pub headline: String,
    pub url: String,
    pub category: String,
    pub platform: String,
    pub trending: bool,
    pub fetched_at: DateTime<Utc>,
}
