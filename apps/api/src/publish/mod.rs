//! Publisher adapters: approved sections out to Canva designs or PDF exports.
//!
//! Publishing never changes draft status and never deduplicates: every call creates a
//! new remote object.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::drafts::models::ApprovedSection;
use crate::errors::AppError;
use crate::identity::Identity;

pub mod canva;
pub mod connections;
pub mod handlers;
pub mod oauth;
pub mod pdf;
pub mod records;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Canva,
    Pdf,
}

impl Destination {
    pub fn as_str(self) -> &'static str {
        match self {
            Destination::Canva => "canva",
            Destination::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishReceipt {
    pub destination: Destination,
    /// Edit URL for Canva, object URL for PDF exports.
    pub reference: String,
    pub view_url: Option<String>,
    pub remote_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum PublishError {
    #[error("Not connected to Canva or token expired. Please reconnect to Canva.")]
    NotConnected,

    #[error("{0}")]
    Failed(String),

    /// Our own object storage failed, not the destination.
    #[error("{0}")]
    Storage(String),
}

impl From<PublishError> for AppError {
    fn from(e: PublishError) -> Self {
        match e {
            PublishError::NotConnected => AppError::NotConnected(e.to_string()),
            PublishError::Failed(msg) => AppError::PublishFailed(msg),
            PublishError::Storage(msg) => AppError::Storage(msg),
        }
    }
}

#[async_trait]
pub trait Publisher: Send + Sync {
    fn destination(&self) -> Destination;

    async fn publish(
        &self,
        identity: &Identity,
        section: &ApprovedSection,
    ) -> Result<PublishReceipt, PublishError>;
}

#[derive(Clone, Default)]
pub struct Publishers {
    by_destination: HashMap<Destination, Arc<dyn Publisher>>,
}

impl Publishers {
    pub fn new(publishers: Vec<Arc<dyn Publisher>>) -> Self {
        Self {
            by_destination: publishers
                .into_iter()
                .map(|p| (p.destination(), p))
                .collect(),
        }
    }

    pub fn get(&self, destination: Destination) -> Result<Arc<dyn Publisher>, AppError> {
        self.by_destination.get(&destination).cloned().ok_or_else(|| {
            AppError::Validation(format!("Publishing to {destination:?} is not enabled"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_errors_map_to_http_errors() {
        assert!(matches!(
            AppError::from(PublishError::NotConnected),
            AppError::NotConnected(_)
        ));
        assert!(matches!(
            AppError::from(PublishError::Failed("boom".into())),
            AppError::PublishFailed(m) if m == "boom"
        ));
        assert!(matches!(
            AppError::from(PublishError::Storage("S3 upload failed".into())),
            AppError::Storage(_)
        ));
    }

    #[test]
    fn test_missing_destination_is_validation_error() {
        let publishers = Publishers::default();
        assert!(matches!(
            publishers.get(Destination::Pdf),
            Err(AppError::Validation(_))
        ));
    }
}
