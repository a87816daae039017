use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::trend::TrendRow;
use crate::trends::NewTrend;

#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Inserts unseen `(url, headline)` pairs and returns how many were new.
    async fn insert_many(&self, trends: &[NewTrend]) -> Result<usize, AppError>;

    /// Newest first.
    async fn recent(&self, category: Option<&str>, limit: i64) -> Result<Vec<TrendRow>, AppError>;
}

#[derive(Clone)]
pub struct PgTrendStore {
    db: PgPool,
}

impl PgTrendStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TrendStore for PgTrendStore {
    async fn insert_many(&self, trends: &[NewTrend]) -> Result<usize, AppError> {
        let mut tx = self.db.begin().await?;
        let mut inserted = 0;
        for trend in trends {
            let result = sqlx::query(
                r#"
                INSERT INTO trends (id, headline, url, category, platform, trending, fetched_at)
                VALUES ($1, $2, $3, $4, $5, $6, now())
                ON CONFLICT (url, headline) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&trend.headline)
            .bind(&trend.url)
            .bind(&trend.category)
            .bind(&trend.platform)
            .bind(trend.trending)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn recent(&self, category: Option<&str>, limit: i64) -> Result<Vec<TrendRow>, AppError> {
        let rows = sqlx::query_as::<_, TrendRow>(
            r#"
            SELECT * FROM trends
            WHERE ($1::text IS NULL OR category = $1)
            ORDER BY fetched_at DESC
            LIMIT $2
            "#,
        )
        .bind(category)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

#[derive(Default)]
pub struct MemoryTrendStore {
    rows: RwLock<Vec<TrendRow>>,
}

impl MemoryTrendStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrendStore for MemoryTrendStore {
    async fn insert_many(&self, trends: &[NewTrend]) -> Result<usize, AppError> {
        let mut rows = self.rows.write().await;
        let mut inserted = 0;
        for trend in trends {
            if rows
                .iter()
                .any(|r| r.url == trend.url && r.headline == trend.headline)
            {
                continue;
            }
            rows.push(TrendRow {
                id: Uuid::new_v4(),
                headline: trend.headline.clone(),
                url: trend.url.clone(),
                category: trend.category.clone(),
                platform: trend.platform.clone(),
                trending: trend.trending,
                fetched_at: Utc::now(),
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn recent(&self, category: Option<&str>, limit: i64) -> Result<Vec<TrendRow>, AppError> {
        let rows = self.rows.read().await;
        // insertion order is fetch order
        Ok(rows
            .iter()
            .rev()
            .filter(|r| category.map_or(true, |c| r.category == c))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
