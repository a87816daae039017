use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::drafts::models::Draft;
use crate::drafts::store::{DraftFilter, DraftMutation, DraftStore};
use crate::errors::AppError;
use crate::models::draft::DraftRow;

/// Postgres-backed draft store. `update` holds a row lock (`SELECT ... FOR UPDATE`) for
/// the whole read-modify-write.
#[derive(Clone)]
pub struct PgDraftStore {
    db: PgPool,
}

impl PgDraftStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

impl TryFrom<DraftRow> for Draft {
    type Error = AppError;

    fn try_from(row: DraftRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |field: &str, e: serde_json::Error| {
            AppError::Internal(anyhow::anyhow!("draft {id} has corrupt {field}: {e}"))
        };
        Ok(Draft {
            id: row.id,
            pipeline: row.pipeline.parse()?,
            status: row.status.parse()?,
            sections: serde_json::from_value(row.sections)
                .map_err(|e| corrupt("sections", e))?,
            approvals: serde_json::from_value(row.approvals)
                .map_err(|e| corrupt("approvals", e))?,
            owner_id: row.owner_id,
            source_topic: row.source_topic,
            scope: row.scope,
            input: row.input,
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}

#[async_trait]
impl DraftStore for PgDraftStore {
    async fn insert(&self, draft: &Draft) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO drafts
                (id, owner_id, pipeline, source_topic, scope, input, sections,
                 approvals, status, error, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(draft.id)
        .bind(&draft.owner_id)
        .bind(draft.pipeline.as_str())
        .bind(&draft.source_topic)
        .bind(&draft.scope)
        .bind(&draft.input)
        .bind(to_json(&draft.sections)?)
        .bind(to_json(&draft.approvals)?)
        .bind(draft.status.as_str())
        .bind(&draft.error)
        .bind(draft.created_at)
        .bind(draft.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Draft>, AppError> {
        let row: Option<DraftRow> = sqlx::query_as("SELECT * FROM drafts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(Draft::try_from).transpose()
    }

    async fn list(&self, owner_id: &str, filter: &DraftFilter) -> Result<Vec<Draft>, AppError> {
        let rows: Vec<DraftRow> = sqlx::query_as(
            r#"
            SELECT * FROM drafts
            WHERE owner_id = $1
              AND ($2::text IS NULL OR pipeline = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::text IS NULL OR scope = $4)
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .bind(filter.pipeline.map(|p| p.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(&filter.scope)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(Draft::try_from).collect()
    }

    async fn update(&self, id: Uuid, mutation: DraftMutation) -> Result<Draft, AppError> {
        let mut tx = self.db.begin().await?;

        let row: Option<DraftRow> =
            sqlx::query_as("SELECT * FROM drafts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let mut draft = Draft::try_from(
            row.ok_or_else(|| AppError::NotFound(format!("Draft {id} not found")))?,
        )?;

        // dropping `tx` on error rolls back and releases the lock
        mutation(&mut draft)?;
        draft.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE drafts
            SET sections = $2, approvals = $3, status = $4, error = $5,
                scope = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(to_json(&draft.sections)?)
        .bind(to_json(&draft.approvals)?)
        .bind(draft.status.as_str())
        .bind(&draft.error)
        .bind(&draft.scope)
        .bind(draft.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(draft)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM drafts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Draft>, AppError> {
        let rows: Vec<DraftRow> = sqlx::query_as(
            "SELECT * FROM drafts WHERE status = 'pending' AND updated_at < $1 ORDER BY updated_at ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(Draft::try_from).collect()
    }
}
