use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;
use crate::state::AppState;

pub const USER_HEADER: &str = "x-user-id";

/// The caller every draft, approval and connection operation acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub owner_id: String,
}

impl Identity {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
        }
    }

    /// `x-user-id` header first, then the configured development identity.
    pub fn resolve(header: Option<&str>, dev_user_id: Option<&str>) -> Result<Self, AppError> {
        header
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or(dev_user_id)
            .map(Identity::new)
            .ok_or(AppError::Unauthorized)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok());
        Identity::resolve(header, state.config.dev_user_id.as_deref())
    }
}
