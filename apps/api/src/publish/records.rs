//! Publication history, one row per successful publish.
//!
//! Rows are never deduplicated. Callers check `list` to avoid publishing a section twice.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::drafts::models::ApprovedSection;
use crate::errors::AppError;
use crate::identity::Identity;
use crate::models::publication::PublicationRow;
use crate::publish::PublishReceipt;

#[async_trait]
pub trait PublicationStore: Send + Sync {
    async fn record(
        &self,
        identity: &Identity,
        section: &ApprovedSection,
        receipt: &PublishReceipt,
    ) -> Result<PublicationRow, AppError>;

    /// Newest first, optionally narrowed to one draft.
    async fn list(
        &self,
        identity: &Identity,
        draft_id: Option<Uuid>,
    ) -> Result<Vec<PublicationRow>, AppError>;
}

fn new_row(identity: &Identity, section: &ApprovedSection, receipt: &PublishReceipt) -> PublicationRow {
    PublicationRow {
        id: Uuid::new_v4(),
        owner_id: identity.owner_id.clone(),
        draft_id: section.draft_id,
        section: section.section.clone(),
        destination: receipt.destination.as_str().to_string(),
        reference: receipt.reference.clone(),
        view_url: receipt.view_url.clone(),
        remote_id: receipt.remote_id.clone(),
        asset_id: receipt.asset_id.clone(),
        created_at: Utc::now(),
    }
}

#[derive(Clone)]
pub struct PgPublicationStore {
    db: PgPool,
}

impl PgPublicationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PublicationStore for PgPublicationStore {
    async fn record(
        &self,
        identity: &Identity,
        section: &ApprovedSection,
        receipt: &PublishReceipt,
    ) -> Result<PublicationRow, AppError> {
        let row = new_row(identity, section, receipt);
        let stored = sqlx::query_as::<_, PublicationRow>(
            r#"
            INSERT INTO publications
                (id, owner_id, draft_id, section, destination, reference, view_url, remote_id, asset_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(row.id)
        .bind(&row.owner_id)
        .bind(row.draft_id)
        .bind(&row.section)
        .bind(&row.destination)
        .bind(&row.reference)
        .bind(&row.view_url)
        .bind(&row.remote_id)
        .bind(&row.asset_id)
        .bind(row.created_at)
        .fetch_one(&self.db)
        .await?;
        Ok(stored)
    }

    async fn list(
        &self,
        identity: &Identity,
        draft_id: Option<Uuid>,
    ) -> Result<Vec<PublicationRow>, AppError> {
        let rows = sqlx::query_as::<_, PublicationRow>(
            r#"
            SELECT * FROM publications
            WHERE owner_id = $1 AND ($2::uuid IS NULL OR draft_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(&identity.owner_id)
        .bind(draft_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

#[derive(Default)]
pub struct MemoryPublicationStore {
    rows: RwLock<Vec<PublicationRow>>,
}

impl MemoryPublicationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PublicationStore for MemoryPublicationStore {
    async fn record(
        &self,
        identity: &Identity,
        section: &ApprovedSection,
        receipt: &PublishReceipt,
    ) -> Result<PublicationRow, AppError> {
        let row = new_row(identity, section, receipt);
        self.rows.write().await.push(row.clone());
        Ok(row)
    }

    async fn list(
        &self,
        identity: &Identity,
        draft_id: Option<Uuid>,
    ) -> Result<Vec<PublicationRow>, AppError> {
        let rows = self.rows.read().await;
        // pushed in order, so reversing gives newest first
        Ok(rows
            .iter()
            .rev()
            .filter(|r| r.owner_id == identity.owner_id)
            .filter(|r| draft_id.map_or(true, |id| r.draft_id == id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafts::content::SectionContent;
    use crate::pipelines::PipelineKind;
    use crate::publish::Destination;

    fn section(draft_id: Uuid, name: &str) -> ApprovedSection {
        ApprovedSection {
            draft_id,
            pipeline: PipelineKind::Strategy,
            source_topic: "Back to school".into(),
            scope: None,
            section: name.into(),
            content: SectionContent::text("Packing lunches together"),
        }
    }

    fn receipt(remote_id: &str) -> PublishReceipt {
        PublishReceipt {
            destination: Destination::Canva,
            reference: format!("https://www.canva.com/design/{remote_id}/edit"),
            view_url: Some(format!("https://www.canva.com/design/{remote_id}/view")),
            remote_id: remote_id.into(),
            asset_id: Some("asset-1".into()),
        }
    }

    #[tokio::test]
    async fn test_list_is_owner_scoped_and_newest_first() {
        let store = MemoryPublicationStore::new();
        let owner = Identity::new("u1");
        let other = Identity::new("u2");
        let draft = Uuid::new_v4();

        store.record(&owner, &section(draft, "blog"), &receipt("D1")).await.unwrap();
        store.record(&owner, &section(draft, "blog"), &receipt("D2")).await.unwrap();
        store
            .record(&owner, &section(Uuid::new_v4(), "instagram"), &receipt("D3"))
            .await
            .unwrap();
        store.record(&other, &section(draft, "blog"), &receipt("D4")).await.unwrap();

        let all = store.list(&owner, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].remote_id, "D3");

        let for_draft = store.list(&owner, Some(draft)).await.unwrap();
        let ids: Vec<_> = for_draft.iter().map(|r| r.remote_id.as_str()).collect();
        assert_eq!(ids, vec!["D2", "D1"]);
        assert_eq!(for_draft[0].destination, "canva");
        assert_eq!(for_draft[0].section, "blog");
    }
}
