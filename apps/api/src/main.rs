mod config;
mod db;
mod drafts;
mod errors;
mod identity;
mod llm_client;
mod models;
mod pipelines;
mod publish;
mod routes;
mod state;
mod trends;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::connect_and_migrate;
use crate::drafts::approval::ApprovalGate;
use crate::drafts::orchestrator::{spawn_stale_monitor, Orchestrator};
use crate::drafts::pg::PgDraftStore;
use crate::llm_client::{GeminiClient, GeneratorClient, RetryPolicy};
use crate::pipelines::PipelineRegistry;
use crate::publish::canva::CanvaPublisher;
use crate::publish::connections::PgConnectionStore;
use crate::publish::oauth::CanvaOAuth;
use crate::publish::pdf::{PdfPublisher, S3ObjectStore};
use crate::publish::records::PgPublicationStore;
use crate::publish::Publishers;
use crate::routes::build_router;
use crate::state::AppState;
use crate::trends::feeds::default_feeds;
use crate::trends::scanner::{spawn_daily_scan, TrendScanner};
use crate::trends::store::PgTrendStore;

const STALE_CHECK_EVERY: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Studio API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL
    let db = connect_and_migrate(&config.database_url).await?;

    // S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Generator
    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; drafts will settle with fallback content");
    }
    let gemini = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_base_url.clone(),
    ));
    let retry = RetryPolicy {
        max_attempts: config.generation_max_attempts,
        base_delay: Duration::from_secs(config.generation_base_delay_secs),
        attempt_timeout: Duration::from_secs(config.generation_attempt_timeout_secs),
    };
    let generator = GeneratorClient::new(gemini, retry);
    info!("Generator initialized (text models: {})", config.text_models.join(", "));

    // Drafts
    let drafts = Arc::new(PgDraftStore::new(db.clone()));
    let orchestrator = Orchestrator::new(
        drafts.clone(),
        generator,
        PipelineRegistry::from_config(&config),
    );
    let gate = ApprovalGate::new(drafts.clone());

    // Publishing
    let connections = Arc::new(PgConnectionStore::new(db.clone()));
    let publishers = Publishers::new(vec![
        Arc::new(CanvaPublisher::new(
            config.canva_api_base.clone(),
            connections.clone(),
        )),
        Arc::new(PdfPublisher::new(Arc::new(S3ObjectStore::new(
            s3,
            config.s3_bucket.clone(),
        )))),
    ]);
    let canva = CanvaOAuth::new(&config, connections);
    let publications = Arc::new(PgPublicationStore::new(db.clone()));

    // Trends
    let trends = Arc::new(PgTrendStore::new(db));
    let scanner = TrendScanner::new(default_feeds(), trends.clone());

    // Background tasks
    spawn_stale_monitor(
        orchestrator.clone(),
        chrono::Duration::minutes(config.stale_pending_minutes),
        STALE_CHECK_EVERY,
    );
    spawn_daily_scan(scanner.clone(), config.trend_scan_hour_utc);

    let state = AppState {
        drafts,
        orchestrator,
        gate,
        publishers,
        publications,
        canva,
        trends,
        scanner,
        config: config.clone(),
    };

    let origin = HeaderValue::from_str(&config.dashboard_url)
        .context("DASHBOARD_URL must be a valid header value")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "studio-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
