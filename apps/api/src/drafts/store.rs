use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::drafts::models::{Draft, DraftStatus};
use crate::errors::AppError;
use crate::identity::Identity;
use crate::pipelines::PipelineKind;

/// Read-modify-write step applied atomically to one draft. An `Err` leaves the stored
/// draft untouched.
pub type DraftMutation = Box<dyn FnOnce(&mut Draft) -> Result<(), AppError> + Send>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftFilter {
    pub pipeline: Option<PipelineKind>,
    pub status: Option<DraftStatus>,
    pub scope: Option<String>,
}

impl DraftFilter {
    pub fn matches(&self, draft: &Draft) -> bool {
        self.pipeline.map_or(true, |p| draft.pipeline == p)
            && self.status.map_or(true, |s| draft.status == s)
            && self
                .scope
                .as_deref()
                .map_or(true, |s| draft.scope.as_deref() == Some(s))
    }
}

/// Persistent record of drafts. Every mutation goes through `update`, which is atomic
/// per draft id.
///
/// Carried in `AppState` as `Arc<dyn DraftStore>`.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn insert(&self, draft: &Draft) -> Result<(), AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Draft>, AppError>;

    /// Owner drafts, newest first.
    async fn list(&self, owner_id: &str, filter: &DraftFilter) -> Result<Vec<Draft>, AppError>;

    /// Applies `mutation` under the draft's lock and stamps `updated_at`.
    /// `NotFound` if the id is unknown.
    async fn update(&self, id: Uuid, mutation: DraftMutation) -> Result<Draft, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Drafts of any owner still `pending` with `updated_at` before `cutoff`, oldest first.
    async fn list_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Draft>, AppError>;
}

/// Loads a draft for its owner. Someone else's draft is reported as missing.
pub async fn fetch_owned(
    store: &dyn DraftStore,
    identity: &Identity,
    id: Uuid,
) -> Result<Draft, AppError> {
    let draft = store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Draft {id} not found")))?;
    draft.ensure_owner(&identity.owner_id)?;
    Ok(draft)
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store (tests, local demos)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryDraftStore {
    drafts: RwLock<HashMap<Uuid, Draft>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn insert(&self, draft: &Draft) -> Result<(), AppError> {
        let mut drafts = self.drafts.write().await;
        if drafts.contains_key(&draft.id) {
            return Err(AppError::Validation(format!("Draft {} already exists", draft.id)));
        }
        drafts.insert(draft.id, draft.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Draft>, AppError> {
        Ok(self.drafts.read().await.get(&id).cloned())
    }

    async fn list(&self, owner_id: &str, filter: &DraftFilter) -> Result<Vec<Draft>, AppError> {
        let mut out: Vec<Draft> = self
            .drafts
            .read()
            .await
            .values()
            .filter(|d| d.owner_id == owner_id && filter.matches(d))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn update(&self, id: Uuid, mutation: DraftMutation) -> Result<Draft, AppError> {
        let mut drafts = self.drafts.write().await;
        let current = drafts
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Draft {id} not found")))?;

        let mut next = current.clone();
        mutation(&mut next)?;
        next.updated_at = Utc::now();
        drafts.insert(id, next.clone());
        Ok(next)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.drafts.write().await.remove(&id).is_some())
    }

    async fn list_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Draft>, AppError> {
        let mut out: Vec<Draft> = self
            .drafts
            .read()
            .await
            .values()
            .filter(|d| d.status == DraftStatus::Pending && d.updated_at < cutoff)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafts::models::fixtures::{generated, strategy_draft};
    use chrono::Duration;

    #[tokio::test]
    async fn test_update_failure_leaves_draft_untouched() {
        let store = MemoryDraftStore::new();
        let draft = strategy_draft("u1");
        store.insert(&draft).await.unwrap();

        let err = store
            .update(draft.id, Box::new(|d| d.approve_section("blog")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Precondition(_)));

        let stored = store.get(draft.id).await.unwrap().unwrap();
        assert_eq!(stored, draft);
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let store = MemoryDraftStore::new();
        let err = store
            .update(Uuid::new_v4(), Box::new(|_| Ok(())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters_by_owner_and_status() {
        let store = MemoryDraftStore::new();
        store.insert(&strategy_draft("u1")).await.unwrap();
        store.insert(&generated(strategy_draft("u1"))).await.unwrap();
        store.insert(&strategy_draft("u2")).await.unwrap();

        let all = store.list("u1", &DraftFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let pending = store
            .list(
                "u1",
                &DraftFilter {
                    status: Some(DraftStatus::Pending),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_pending_uses_updated_at() {
        let store = MemoryDraftStore::new();
        let mut old = strategy_draft("u1");
        old.updated_at = Utc::now() - Duration::minutes(30);
        let fresh = strategy_draft("u1");
        let mut settled = generated(strategy_draft("u1"));
        settled.updated_at = Utc::now() - Duration::minutes(30);
        for d in [&old, &fresh, &settled] {
            store.insert(d).await.unwrap();
        }

        let stale = store
            .list_stale_pending(Utc::now() - Duration::minutes(15))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, old.id);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryDraftStore::new();
        let d = strategy_draft("u1");
        store.insert(&d).await.unwrap();
        assert!(store.delete(d.id).await.unwrap());
        assert!(!store.delete(d.id).await.unwrap());
        assert!(store.get(d.id).await.unwrap().is_none());
    }
}
