use std::sync::Arc;

use tracing::{info, warn};

use super::{GenerationError, GenerationOutput, GenerationRequest, GenerativeBackend, RetryPolicy};

/// Successful generation, tagged with the model that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub model: String,
    pub output: GenerationOutput,
}

/// Walks a model fallback chain over one backend, retrying transient failures per model.
#[derive(Clone)]
pub struct GeneratorClient {
    backend: Arc<dyn GenerativeBackend>,
    retry: RetryPolicy,
}

impl GeneratorClient {
    pub fn new(backend: Arc<dyn GenerativeBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Tries `models` in order.
    ///
    /// - `Model` errors move on to the next model.
    /// - `QuotaExceeded`, `NotConfigured` and `RetriesExhausted` end the call.
    /// - Running out of models yields `GenerationExhausted` with the last message.
    pub async fn generate(
        &self,
        models: &[String],
        request: &GenerationRequest,
    ) -> Result<Generated, GenerationError> {
        let mut last_error: Option<String> = None;

        for model in models {
            let outcome = self
                .retry
                .run(|| self.backend.generate(model, request))
                .await;

            match outcome {
                Ok(output) => {
                    info!(model = %model, "Generation succeeded");
                    return Ok(Generated {
                        model: model.clone(),
                        output,
                    });
                }
                Err(GenerationError::Model(message)) => {
                    warn!(model = %model, error = %message, "Model failed, trying next in chain");
                    last_error = Some(message);
                }
                Err(terminal) => {
                    warn!(model = %model, error = %terminal, "Generation aborted");
                    return Err(terminal);
                }
            }
        }

        Err(GenerationError::GenerationExhausted {
            last_error: last_error.unwrap_or_else(|| "no models configured".to_string()),
        })
    }
}
