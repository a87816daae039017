use std::sync::Arc;

use crate::config::Config;
use crate::drafts::approval::ApprovalGate;
use crate::drafts::orchestrator::Orchestrator;
use crate::drafts::store::DraftStore;
use crate::publish::oauth::CanvaOAuth;
use crate::publish::records::PublicationStore;
use crate::publish::Publishers;
use crate::trends::scanner::TrendScanner;
use crate::trends::store::TrendStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub drafts: Arc<dyn DraftStore>,
    pub orchestrator: Orchestrator,
    pub gate: ApprovalGate,
    pub publishers: Publishers,
    pub publications: Arc<dyn PublicationStore>,
    pub canva: CanvaOAuth,
    pub trends: Arc<dyn TrendStore>,
    pub scanner: TrendScanner,
    pub config: Config,
}
