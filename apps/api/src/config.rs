use std::str::FromStr;

use anyhow::{Context, Result};

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TEXT_MODELS: &str = "gemini-2.0-flash,gemini-1.5-flash,gemini-flash-latest";
const DEFAULT_IMAGEN_MODEL: &str = "imagen-3.0-generate-002";
const DEFAULT_CANVA_API_BASE: &str = "https://api.canva.com/rest/v1";
const DEFAULT_CANVA_AUTHORIZE_URL: &str = "https://www.canva.com/api/oauth/authorize";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Absent key is not a startup failure: drafts land in `error` with fallback content.
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    /// Ordered fallback chain for text and JSON pipelines.
    pub text_models: Vec<String>,
    pub imagen_model: String,
    pub canva_client_id: Option<String>,
    pub canva_client_secret: Option<String>,
    pub canva_redirect_uri: String,
    pub canva_api_base: String,
    pub canva_authorize_url: String,
    pub dashboard_url: String,
    pub generation_max_attempts: u32,
    pub generation_base_delay_secs: u64,
    pub generation_attempt_timeout_secs: u64,
    pub stale_pending_minutes: i64,
    pub trend_scan_hour_utc: u32,
    pub dev_user_id: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port: u16 = parse_env("PORT", 8080).context("PORT must be a valid port number")?;
        let trend_scan_hour_utc: u32 = parse_env("TREND_SCAN_HOUR_UTC", 12)?;
        if trend_scan_hour_utc > 23 {
            anyhow::bail!("TREND_SCAN_HOUR_UTC must be between 0 and 23");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            gemini_base_url: optional_env("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            text_models: parse_model_list(
                &optional_env("GEMINI_TEXT_MODELS").unwrap_or_else(|| DEFAULT_TEXT_MODELS.into()),
            ),
            imagen_model: optional_env("IMAGEN_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGEN_MODEL.to_string()),
            canva_client_id: optional_env("CANVA_CLIENT_ID"),
            canva_client_secret: optional_env("CANVA_CLIENT_SECRET"),
            canva_redirect_uri: optional_env("CANVA_REDIRECT_URI").unwrap_or_else(|| {
                format!("http://127.0.0.1:{port}/api/v1/canva/callback")
            }),
            canva_api_base: optional_env("CANVA_API_BASE")
                .unwrap_or_else(|| DEFAULT_CANVA_API_BASE.to_string()),
            canva_authorize_url: optional_env("CANVA_AUTHORIZE_URL")
                .unwrap_or_else(|| DEFAULT_CANVA_AUTHORIZE_URL.to_string()),
            dashboard_url: optional_env("DASHBOARD_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            generation_max_attempts: parse_env("GENERATION_MAX_ATTEMPTS", 3)?,
            generation_base_delay_secs: parse_env("GENERATION_BASE_DELAY_SECS", 5)?,
            generation_attempt_timeout_secs: parse_env("GENERATION_ATTEMPT_TIMEOUT_SECS", 60)?,
            stale_pending_minutes: parse_env("STALE_PENDING_MINUTES", 15)?,
            trend_scan_hour_utc,
            dev_user_id: optional_env("DEV_USER_ID"),
            port,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Values used by unit and router tests; no environment access.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/test".into(),
            s3_bucket: "exports".into(),
            s3_endpoint: "http://127.0.0.1:9000".into(),
            aws_access_key_id: "minio".into(),
            aws_secret_access_key: "minio123".into(),
            gemini_api_key: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.into(),
            text_models: parse_model_list(DEFAULT_TEXT_MODELS),
            imagen_model: DEFAULT_IMAGEN_MODEL.into(),
            canva_client_id: Some("canva-client".into()),
            canva_client_secret: Some("canva-secret".into()),
            canva_redirect_uri: "http://127.0.0.1:8080/api/v1/canva/callback".into(),
            canva_api_base: DEFAULT_CANVA_API_BASE.into(),
            canva_authorize_url: DEFAULT_CANVA_AUTHORIZE_URL.into(),
            dashboard_url: "http://localhost:3000".into(),
            generation_max_attempts: 3,
            generation_base_delay_secs: 5,
            generation_attempt_timeout_secs: 60,
            stale_pending_minutes: 15,
            trend_scan_hour_utc: 12,
            dev_user_id: None,
            port: 8080,
            rust_log: "info".into(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and empty are treated the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Environment variable '{key}' is invalid: {e}")),
    }
}

fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}
