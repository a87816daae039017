pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::drafts::handlers as drafts;
use crate::publish::handlers as publish;
use crate::state::AppState;
use crate::trends::handlers as trends;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Drafts
        .route(
            "/api/v1/drafts",
            post(drafts::handle_submit).get(drafts::handle_list),
        )
        .route("/api/v1/drafts/stale", get(drafts::handle_list_stale))
        .route(
            "/api/v1/drafts/reset-approvals",
            post(drafts::handle_reset_all),
        )
        .route(
            "/api/v1/drafts/:id",
            get(drafts::handle_get).delete(drafts::handle_delete),
        )
        .route(
            "/api/v1/drafts/:id/regenerate",
            post(drafts::handle_regenerate),
        )
        // Approval gate
        .route(
            "/api/v1/drafts/:id/sections/:section/approve",
            post(drafts::handle_approve_section),
        )
        .route(
            "/api/v1/drafts/:id/sections/:section/reject",
            post(drafts::handle_reject_section),
        )
        .route(
            "/api/v1/drafts/:id/approve-all",
            post(drafts::handle_approve_all),
        )
        .route("/api/v1/drafts/:id/reset", post(drafts::handle_reset))
        .route("/api/v1/drafts/:id/reject", post(drafts::handle_reject))
        .route("/api/v1/drafts/:id/posted", post(drafts::handle_mark_posted))
        .route(
            "/api/v1/approved-sections",
            get(drafts::handle_approved_sections),
        )
        // Publishing
        .route(
            "/api/v1/drafts/:id/sections/:section/publish",
            post(publish::handle_publish),
        )
        .route(
            "/api/v1/publications",
            get(publish::handle_list_publications),
        )
        .route("/api/v1/canva/auth-url", get(publish::handle_canva_auth_url))
        .route("/api/v1/canva/callback", get(publish::handle_canva_callback))
        .route("/api/v1/canva/status", get(publish::handle_canva_status))
        // Trends
        .route("/api/v1/trends", get(trends::handle_list_trends))
        .route("/api/v1/trends/scan", post(trends::handle_scan_trends))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::drafts::approval::ApprovalGate;
    use crate::drafts::models::fixtures::{generated, strategy_draft};
    use crate::drafts::orchestrator::Orchestrator;
    use crate::drafts::store::{DraftStore, MemoryDraftStore};
    use crate::llm_client::fallback::test_support::ScriptedBackend;
    use crate::llm_client::{GenerationError, GeneratorClient, RetryPolicy};
    use crate::pipelines::PipelineRegistry;
    use crate::publish::connections::MemoryConnectionStore;
    use crate::publish::oauth::CanvaOAuth;
    use crate::publish::pdf::{MemoryObjectStore, PdfPublisher};
use crate::publish::records::MemoryPublicationStore;
    use crate::publish::Publishers;
    use crate::trends::scanner::TrendScanner;
    use crate::trends::store::MemoryTrendStore;

    struct Harness {
        state: AppState,
        drafts: Arc<MemoryDraftStore>,
        objects: Arc<MemoryObjectStore>,
    }

    fn harness(config: Config) -> Harness {
        let drafts = Arc::new(MemoryDraftStore::new());
        let objects = Arc::new(MemoryObjectStore::default());
        let trends = Arc::new(MemoryTrendStore::new());
        let backend = Arc::new(ScriptedBackend::always(Err(GenerationError::Transient(
            "offline".into(),
        ))));
        let generator = GeneratorClient::new(backend, RetryPolicy::default());
        let state = AppState {
            drafts: drafts.clone(),
            orchestrator: Orchestrator::new(
                drafts.clone(),
                generator,
                PipelineRegistry::from_config(&config),
            ),
            gate: ApprovalGate::new(drafts.clone()),
            publishers: Publishers::new(vec![Arc::new(PdfPublisher::new(objects.clone()))]),
            publications: Arc::new(MemoryPublicationStore::new()),
            canva: CanvaOAuth::new(&config, Arc::new(MemoryConnectionStore::new())),
            trends: trends.clone(),
            scanner: TrendScanner::new(Vec::new(), trends),
            config,
        };
        Harness {
            state,
            drafts,
            objects,
        }
    }

    fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(state: &AppState, req: Request<Body>) -> (StatusCode, Value) {
        let resp = build_router(state.clone()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(Config::for_tests());
        let (status, body) = send(&h.state, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "studio-api");
        assert_eq!(body["integrations"]["gemini"], false);
        assert_eq!(body["integrations"]["canva"], true);
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let h = harness(Config::for_tests());
        let (status, body) = send(&h.state, request("GET", "/api/v1/drafts", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_dev_user_fallback_when_configured() {
        let mut config = Config::for_tests();
        config.dev_user_id = Some("dev".into());
        let h = harness(config);
        h.drafts.insert(&strategy_draft("dev")).await.unwrap();

        let (status, body) = send(&h.state, request("GET", "/api/v1/drafts", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_returns_pending_placeholder() {
        let h = harness(Config::for_tests());
        let (status, body) = send(
            &h.state,
            request(
                "POST",
                "/api/v1/drafts",
                Some("u1"),
                Some(json!({"kind": "linkedin", "topic": "Shipping on Fridays"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["owner_id"], "u1");
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_topic() {
        let h = harness(Config::for_tests());
        let (status, _) = send(
            &h.state,
            request(
                "POST",
                "/api/v1/drafts",
                Some("u1"),
                Some(json!({"kind": "strategy", "topic": "  "})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_other_owner_sees_not_found() {
        let h = harness(Config::for_tests());
        let draft = strategy_draft("u1");
        h.drafts.insert(&draft).await.unwrap();

        let uri = format!("/api/v1/drafts/{}", draft.id);
        let (status, _) = send(&h.state, request("GET", &uri, Some("u2"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&h.state, request("DELETE", &uri, Some("u2"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(h.drafts.get(draft.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_approve_pending_section_conflicts() {
        let h = harness(Config::for_tests());
        let draft = strategy_draft("u1");
        h.drafts.insert(&draft).await.unwrap();

        let uri = format!("/api/v1/drafts/{}/sections/blog/approve", draft.id);
        let (status, body) = send(&h.state, request("POST", &uri, Some("u1"), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "PRECONDITION_FAILED");
    }

    #[tokio::test]
    async fn test_approve_then_publish_pdf() {
        let h = harness(Config::for_tests());
        let draft = generated(strategy_draft("u1"));
        h.drafts.insert(&draft).await.unwrap();

        let approve = format!("/api/v1/drafts/{}/sections/blog/approve", draft.id);
        let (status, body) = send(&h.state, request("POST", &approve, Some("u1"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["approvals"]["blog"], true);

        let (_, sections) = send(
            &h.state,
            request("GET", "/api/v1/approved-sections?scope=2026-W04", Some("u1"), None),
        )
        .await;
        assert_eq!(sections.as_array().unwrap().len(), 1);

        let publish = format!("/api/v1/drafts/{}/sections/blog/publish", draft.id);
        let (status, receipt) = send(
            &h.state,
            request("POST", &publish, Some("u1"), Some(json!({"destination": "pdf"}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["destination"], "pdf");
        assert_eq!(h.objects.objects.read().await.len(), 1);

        let history = format!("/api/v1/publications?draft_id={}", draft.id);
        let (status, rows) = send(&h.state, request("GET", &history, Some("u1"), None)).await;
        assert_eq!(status, StatusCode::OK);
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["section"], "blog");
        assert_eq!(rows[0]["destination"], "pdf");
        assert_eq!(rows[0]["remote_id"], receipt["remote_id"]);

        let (_, others) = send(
            &h.state,
            request("GET", "/api/v1/publications", Some("u2"), None),
        )
        .await;
        assert!(others.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_unapproved_section_conflicts() {
        let h = harness(Config::for_tests());
        let draft = generated(strategy_draft("u1"));
        h.drafts.insert(&draft).await.unwrap();

        let publish = format!("/api/v1/drafts/{}/sections/etsy/publish", draft.id);
        let (status, _) = send(
            &h.state,
            request("POST", &publish, Some("u1"), Some(json!({"destination": "pdf"}))),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(h.objects.objects.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_canva_callback_error_redirects_to_planner() {
        let h = harness(Config::for_tests());
        let resp = build_router(h.state.clone())
            .oneshot(request(
                "GET",
                "/api/v1/canva/callback?error=access_denied",
                None,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers()[header::LOCATION],
            "http://localhost:3000/planner?error=access_denied"
        );
    }

    #[tokio::test]
    async fn test_reset_all_counts_drafts() {
        let h = harness(Config::for_tests());
        let mut draft = generated(strategy_draft("u1"));
        draft.approve_section("instagram").unwrap();
        h.drafts.insert(&draft).await.unwrap();
        h.drafts.insert(&generated(strategy_draft("u1"))).await.unwrap();

        let (status, body) = send(
            &h.state,
            request("POST", "/api/v1/drafts/reset-approvals", Some("u1"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reset"], 1);
    }
}
