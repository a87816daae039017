use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::drafts::models::{ApprovedSection, Draft, DraftStatus};
use crate::drafts::store::{fetch_owned, DraftFilter, DraftStore};
use crate::errors::AppError;
use crate::identity::Identity;

/// Human review over stored drafts. Every mutation is an owner-checked atomic update;
/// the draft's own rules decide what is allowed in which status.
#[derive(Clone)]
pub struct ApprovalGate {
    store: Arc<dyn DraftStore>,
}

impl ApprovalGate {
    pub fn new(store: Arc<dyn DraftStore>) -> Self {
        Self { store }
    }

    async fn mutate<F>(&self, identity: &Identity, id: Uuid, op: F) -> Result<Draft, AppError>
    where
        F: FnOnce(&mut Draft) -> Result<(), AppError> + Send + 'static,
    {
        let owner = identity.owner_id.clone();
        self.store
            .update(
                id,
                Box::new(move |draft| {
                    draft.ensure_owner(&owner)?;
                    op(draft)
                }),
            )
            .await
    }

    pub async fn approve_section(
        &self,
        identity: &Identity,
        id: Uuid,
        section: &str,
    ) -> Result<Draft, AppError> {
        let name = section.to_string();
        let draft = self
            .mutate(identity, id, move |d| d.approve_section(&name))
            .await?;
        info!(draft_id = %id, section, status = %draft.status, "Section approved");
        Ok(draft)
    }

    pub async fn reject_section(
        &self,
        identity: &Identity,
        id: Uuid,
        section: &str,
    ) -> Result<Draft, AppError> {
        let name = section.to_string();
        let draft = self
            .mutate(identity, id, move |d| d.reject_section(&name))
            .await?;
        info!(draft_id = %id, section, status = %draft.status, "Section rejected");
        Ok(draft)
    }

    pub async fn approve_all(&self, identity: &Identity, id: Uuid) -> Result<Draft, AppError> {
        self.mutate(identity, id, |d| d.approve_all()).await
    }

    pub async fn reset_approvals(&self, identity: &Identity, id: Uuid) -> Result<Draft, AppError> {
        self.mutate(identity, id, |d| d.reset_approvals()).await
    }

    /// Clears approvals on every non-posted draft of the owner. Returns how many changed.
    pub async fn reset_all_approvals(&self, identity: &Identity) -> Result<usize, AppError> {
        let drafts = self
            .store
            .list(&identity.owner_id, &DraftFilter::default())
            .await?;

        let mut reset = 0;
        for draft in drafts
            .iter()
            .filter(|d| d.has_approval() && d.status != DraftStatus::Posted)
        {
            match self.reset_approvals(identity, draft.id).await {
                Ok(_) => reset += 1,
                // deleted or posted since the listing
                Err(AppError::NotFound(_)) | Err(AppError::Precondition(_)) => {
                    debug!(draft_id = %draft.id, "Draft changed during reset, skipped");
                }
                Err(e) => return Err(e),
            }
        }
        info!(owner_id = %identity.owner_id, reset, "Approvals reset");
        Ok(reset)
    }

    /// Marks the whole draft rejected and clears its flags.
    pub async fn reject_draft(&self, identity: &Identity, id: Uuid) -> Result<Draft, AppError> {
        let draft = self.mutate(identity, id, |d| d.reject()).await?;
        info!(draft_id = %id, "Draft rejected");
        Ok(draft)
    }

    pub async fn mark_posted(&self, identity: &Identity, id: Uuid) -> Result<Draft, AppError> {
        let draft = self.mutate(identity, id, |d| d.mark_posted()).await?;
        info!(draft_id = %id, "Draft posted");
        Ok(draft)
    }

    /// Approved sections of the owner's drafts, optionally limited to one scope.
    /// Read from the store at call time.
    pub async fn list_approved_sections(
        &self,
        identity: &Identity,
        scope: Option<String>,
    ) -> Result<Vec<ApprovedSection>, AppError> {
        let filter = DraftFilter {
            scope,
            ..Default::default()
        };
        let drafts = self.store.list(&identity.owner_id, &filter).await?;
        Ok(drafts.iter().flat_map(Draft::approved_sections).collect())
    }

    /// One approved section, ready to publish.
    pub async fn approved_section(
        &self,
        identity: &Identity,
        id: Uuid,
        section: &str,
    ) -> Result<ApprovedSection, AppError> {
        fetch_owned(self.store.as_ref(), identity, id)
            .await?
            .approved_section(section)
    }
}
