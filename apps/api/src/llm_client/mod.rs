/// Generator client: the single point of entry for all generative API calls.
///
/// No other module talks to the Gemini or Imagen endpoints directly. Pipelines build a
/// `GenerationRequest`, `GeneratorClient` walks the model fallback chain, and each
/// attempt goes through the `RetryPolicy`.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod fallback;
pub mod prompts;
pub mod retry;

pub use fallback::{Generated, GeneratorClient};
pub use retry::RetryPolicy;

/// Request-level HTTP timeout. Per-attempt timeouts are enforced by `RetryPolicy`.
const HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    /// HTTP 429 or a quota / rate-limit message. Stops the fallback chain.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// 5xx, timeout or connection failure. Retried by `RetryPolicy`.
    #[error("Transient error: {0}")]
    Transient(String),

    /// Any other rejection: bad request, unknown model, empty candidate.
    #[error("Model error: {0}")]
    Model(String),

    #[error("Generator not configured: {0}")]
    NotConfigured(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<GenerationError>,
    },

    #[error("All attempted models failed. Last error: {last_error}")]
    GenerationExhausted { last_error: String },
}

impl GenerationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transient(_))
    }

    pub fn is_quota(&self) -> bool {
        match self {
            GenerationError::QuotaExceeded(_) => true,
            GenerationError::RetriesExhausted { last, .. } => last.is_quota(),
            _ => false,
        }
    }
}

/// Classifies an API error body. Quota wording wins over the status code because the
/// upstream sometimes reports exhausted quota as 400 or 503.
pub fn classify_failure(status: StatusCode, message: String) -> GenerationError {
    let lowered = message.to_lowercase();
    let mentions_quota = lowered.contains("quota")
        || lowered.contains("rate limit")
        || lowered.contains("resource_exhausted")
        || lowered.contains("429");

    if status == StatusCode::TOO_MANY_REQUESTS || mentions_quota {
        GenerationError::QuotaExceeded(message)
    } else if status.is_server_error() {
        GenerationError::Transient(format!("HTTP {}: {message}", status.as_u16()))
    } else {
        GenerationError::Model(format!("HTTP {}: {message}", status.as_u16()))
    }
}

fn classify_transport(error: reqwest::Error) -> GenerationError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        GenerationError::Transient(error.to_string())
    } else {
        GenerationError::Model(error.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request / output types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Text,
    Json,
    Image,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub mode: OutputMode,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Imagen only, e.g. "1:1" or "16:9".
    pub aspect_ratio: Option<String>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            mode: OutputMode::Text,
            temperature: 0.7,
            max_output_tokens: 2048,
            aspect_ratio: None,
        }
    }

    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            mode: OutputMode::Json,
            ..Self::text(prompt)
        }
    }

    pub fn image(prompt: impl Into<String>, aspect_ratio: impl Into<String>) -> Self {
        Self {
            mode: OutputMode::Image,
            aspect_ratio: Some(aspect_ratio.into()),
            ..Self::text(prompt)
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutput {
    Text(String),
    Image { bytes: Bytes, mime_type: String },
}

/// One call to one model. Implemented by `GeminiClient` and by scripted test backends.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<WireContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent<'a>>,
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize)]
struct WireContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<WirePart<'a>>,
}

#[derive(Debug, Serialize)]
struct WirePart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
    parameters: PredictParameters<'a>,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters<'a> {
    sample_count: u32,
    aspect_ratio: &'a str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// GeminiClient
// ────────────────────────────────────────────────────────────────────────────

/// Google Generative Language API backend. Text and JSON go to `:generateContent`,
/// images go to the Imagen `:predict` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn api_key(&self) -> Result<&str, GenerationError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| GenerationError::NotConfigured("GEMINI_API_KEY not configured".into()))
    }

    async fn post<B: Serialize>(
        &self,
        model: &str,
        action: &str,
        body: &B,
    ) -> Result<reqwest::Response, GenerationError> {
        let key = self.api_key()?;
        let url = format!("{}/models/{model}:{action}", self.base_url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", key)])
            .json(body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        warn!(model, status = status.as_u16(), "Generative API returned an error");
        Err(classify_failure(status, message))
    }

    async fn generate_text(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![WireContent {
                role: Some("user"),
                parts: vec![WirePart {
                    text: &request.prompt,
                }],
            }],
            system_instruction: request.system.as_deref().map(|text| WireContent {
                role: None,
                parts: vec![WirePart { text }],
            }),
            generation_config: WireGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                response_mime_type: (request.mode == OutputMode::Json)
                    .then_some("application/json"),
            },
        };

        let response: GenerateContentResponse = self
            .post(model, "generateContent", &body)
            .await?
            .json()
            .await
            .map_err(|e| GenerationError::Model(format!("malformed response: {e}")))?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::Model("empty candidate".into()));
        }

        debug!(model, chars = text.len(), "Text generation succeeded");
        Ok(GenerationOutput::Text(text))
    }

    async fn generate_image(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: &request.prompt,
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: request.aspect_ratio.as_deref().unwrap_or("1:1"),
            },
        };

        let response: PredictResponse = self
            .post(model, "predict", &body)
            .await?
            .json()
            .await
            .map_err(|e| GenerationError::Model(format!("malformed response: {e}")))?;

        let prediction = response
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::Model("no image in response".into()))?;
        let encoded = prediction
            .bytes_base64_encoded
            .ok_or_else(|| GenerationError::Model("no image in response".into()))?;
        let bytes = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| GenerationError::Model(format!("invalid image payload: {e}")))?;

        debug!(model, bytes = bytes.len(), "Image generation succeeded");
        Ok(GenerationOutput::Image {
            bytes: Bytes::from(bytes),
            mime_type: prediction.mime_type.unwrap_or_else(|| "image/png".into()),
        })
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        match request.mode {
            OutputMode::Text | OutputMode::Json => self.generate_text(model, request).await,
            OutputMode::Image => self.generate_image(model, request).await,
        }
    }
}
