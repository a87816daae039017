use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::connection::CanvaConnectionRow;

impl CanvaConnectionRow {
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }

    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired_at(Utc::now().timestamp_millis())
    }
}

/// One Canva connection per owner, upserted on every token exchange.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn get(&self, owner_id: &str) -> Result<Option<CanvaConnectionRow>, AppError>;

    async fn upsert(&self, connection: &CanvaConnectionRow) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgConnectionStore {
    db: PgPool,
}

impl PgConnectionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConnectionStore for PgConnectionStore {
    async fn get(&self, owner_id: &str) -> Result<Option<CanvaConnectionRow>, AppError> {
        let row = sqlx::query_as::<_, CanvaConnectionRow>(
            "SELECT * FROM canva_connections WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn upsert(&self, connection: &CanvaConnectionRow) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO canva_connections
                (owner_id, access_token, refresh_token, expires_at, scope, updated_at)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (owner_id) DO UPDATE SET
                access_token  = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at    = EXCLUDED.expires_at,
                scope         = EXCLUDED.scope,
                updated_at    = now()
            "#,
        )
        .bind(&connection.owner_id)
        .bind(&connection.access_token)
        .bind(&connection.refresh_token)
        .bind(connection.expires_at)
        .bind(&connection.scope)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryConnectionStore {
    connections: RwLock<HashMap<String, CanvaConnectionRow>>,
}

impl MemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
    async fn get(&self, owner_id: &str) -> Result<Option<CanvaConnectionRow>, AppError> {
        Ok(self.connections.read().await.get(owner_id).cloned())
    }

    async fn upsert(&self, connection: &CanvaConnectionRow) -> Result<(), AppError> {
        let mut stored = connection.clone();
        stored.updated_at = Utc::now();
        self.connections
            .write()
            .await
            .insert(connection.owner_id.clone(), stored);
        Ok(())
    }
}
