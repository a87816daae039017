//! Workflow orchestrator: placeholder first, generation in the background, one terminal
//! write.
//!
//! `submit` validates the input, stores a `pending` draft holding every section's
//! placeholder and returns immediately with a handle to the generation task. The task
//! walks the pipeline's model chain, parses the output and writes the outcome once.
//! Generator and parser failures never leave the task: they become an `error` draft
//! with fallback content in every section.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::drafts::models::{Draft, DraftStatus, GenerationOutcome};
use crate::drafts::store::{fetch_owned, DraftStore};
use crate::errors::AppError;
use crate::identity::Identity;
use crate::llm_client::GeneratorClient;
use crate::pipelines::{FailureNotice, Pipeline, PipelineInput, PipelineRegistry};

/// A draft as first stored plus the task that will settle it.
pub struct Submission {
    pub draft: Draft,
    pub task: JoinHandle<DraftStatus>,
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn DraftStore>,
    generator: GeneratorClient,
    pipelines: PipelineRegistry,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn DraftStore>,
        generator: GeneratorClient,
        pipelines: PipelineRegistry,
    ) -> Self {
        Self {
            store,
            generator,
            pipelines,
        }
    }

    pub async fn submit(
        &self,
        identity: &Identity,
        input: PipelineInput,
    ) -> Result<Submission, AppError> {
        input.validate()?;
        let pipeline = self.pipelines.get(input.kind())?;
        let stored_input = serde_json::to_value(&input).map_err(anyhow::Error::from)?;

        let draft = Draft::placeholder(
            identity.owner_id.clone(),
            pipeline.kind(),
            input.source_topic(),
            input.scope(),
            stored_input,
            pipeline.placeholders(),
        );
        self.store.insert(&draft).await?;
        info!(draft_id = %draft.id, pipeline = %draft.pipeline, "Draft submitted");

        let task = self.spawn(draft.id, pipeline, input);
        Ok(Submission { draft, task })
    }

    /// Re-runs the stored input. Content and approval flags stay in place until the new
    /// outcome lands.
    pub async fn regenerate(&self, identity: &Identity, id: Uuid) -> Result<Submission, AppError> {
        let current = fetch_owned(self.store.as_ref(), identity, id).await?;
        let input: PipelineInput = serde_json::from_value(current.input).map_err(|e| {
            AppError::Validation(format!("Draft {id} has no usable stored input: {e}"))
        })?;
        let pipeline = self.pipelines.get(input.kind())?;

        let owner = identity.owner_id.clone();
        let draft = self
            .store
            .update(
                id,
                Box::new(move |draft| {
                    draft.ensure_owner(&owner)?;
                    draft.begin_regeneration()
                }),
            )
            .await?;
        info!(draft_id = %id, pipeline = %draft.pipeline, "Draft regeneration started");

        let task = self.spawn(id, pipeline, input);
        Ok(Submission { draft, task })
    }

    fn spawn(
        &self,
        id: Uuid,
        pipeline: Arc<dyn Pipeline>,
        input: PipelineInput,
    ) -> JoinHandle<DraftStatus> {
        let this = self.clone();
        tokio::spawn(async move { this.run(id, pipeline, input).await })
    }

    async fn run(&self, id: Uuid, pipeline: Arc<dyn Pipeline>, input: PipelineInput) -> DraftStatus {
        let outcome = self.generate(pipeline.as_ref(), &input).await;
        let model = outcome.model.clone();

        let result = self
            .store
            .update(
                id,
                Box::new(move |draft| {
                    if !draft.apply_generation(outcome) {
                        warn!(draft_id = %draft.id, "Draft was posted while generating; outcome dropped");
                    }
                    Ok(())
                }),
            )
            .await;

        match result {
            Ok(draft) => {
                info!(
                    draft_id = %id,
                    pipeline = %draft.pipeline,
                    status = %draft.status,
                    model = model.as_deref().unwrap_or("-"),
                    "Draft settled"
                );
                draft.status
            }
            Err(e) => {
                error!(draft_id = %id, error = %e, "Failed to store generation outcome");
                DraftStatus::Error
            }
        }
    }

    /// Generates and parses; on any failure builds the pipeline's fallback content.
    pub async fn generate(&self, pipeline: &dyn Pipeline, input: &PipelineInput) -> GenerationOutcome {
        let request = pipeline.request(input);

        let (failure, model) = match self.generator.generate(pipeline.models(), &request).await {
            Ok(generated) => match pipeline.parse(input, generated.output) {
                Ok(sections) => {
                    return GenerationOutcome {
                        sections,
                        error: None,
                        model: Some(generated.model),
                    }
                }
                Err(e) => {
                    warn!(pipeline = %pipeline.kind(), model = %generated.model, error = %e, "Response rejected by parser");
                    (
                        FailureNotice {
                            message: e.to_string(),
                            quota: false,
                        },
                        Some(generated.model),
                    )
                }
            },
            Err(e) => {
                warn!(pipeline = %pipeline.kind(), error = %e, "Generation failed");
                (
                    FailureNotice {
                        message: e.to_string(),
                        quota: e.is_quota(),
                    },
                    None,
                )
            }
        };

        let sections = pipeline.fallback(input, &failure);
        // Template fallbacks carry no failure text, so the quota notice lives on the draft.
        let error = if failure.quota {
            failure.section_text()
        } else {
            failure.message
        };
        GenerationOutcome {
            sections,
            error: Some(error),
            model,
        }
    }

    /// Drafts of any owner stuck in `pending` for longer than `threshold`.
    pub async fn list_stale_pending(&self, threshold: chrono::Duration) -> Result<Vec<Draft>, AppError> {
        self.store.list_stale_pending(Utc::now() - threshold).await
    }
}

/// Logs stuck drafts every `every` until the runtime shuts down.
pub fn spawn_stale_monitor(
    orchestrator: Orchestrator,
    threshold: chrono::Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match orchestrator.list_stale_pending(threshold).await {
                Ok(stale) => {
                    for draft in &stale {
                        warn!(
                            draft_id = %draft.id,
                            pipeline = %draft.pipeline,
                            pending_since = %draft.updated_at,
                            "Draft stuck in pending"
                        );
                    }
                }
                Err(e) => error!(error = %e, "Stale draft scan failed"),
            }
        }
    })
}
