use std::collections::HashMap;
use std::io::BufWriter;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::drafts::models::ApprovedSection;
use crate::identity::Identity;
use crate::publish::{Destination, PublishError, PublishReceipt, Publisher};

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN_X: f32 = 20.0;
const TOP_Y: f32 = 277.0;
const BOTTOM_Y: f32 = 20.0;
const LINE_HEIGHT: f32 = 5.0;
const WRAP_AT: usize = 90;

/// Renders a title and a plain-text body onto as many A4 pages as needed.
pub fn render_document(title: &str, body: &str) -> Result<Vec<u8>, PublishError> {
    let title = printable(title);
    let (doc, page, layer) = PdfDocument::new(&title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| PublishError::Failed(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| PublishError::Failed(format!("PDF font error: {e}")))?;

    let mut current = doc.get_page(page).get_layer(layer);
    let mut y = TOP_Y;
    current.use_text(&title, 14.0, Mm(MARGIN_X), Mm(y), &bold);
    y -= LINE_HEIGHT * 2.0;

    for paragraph in printable(body).lines() {
        for line in wrap_text(paragraph, WRAP_AT) {
            if y < BOTTOM_Y {
                let (page, layer) = doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
                current = doc.get_page(page).get_layer(layer);
                y = TOP_Y;
            }
            current.use_text(&line, 10.0, Mm(MARGIN_X), Mm(y), &font);
            y -= LINE_HEIGHT;
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| PublishError::Failed(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| PublishError::Failed(format!("PDF buffer error: {e}")))
}

/// Builtin PDF fonts only cover Latin-1.
fn printable(text: &str) -> String {
    text.chars()
        .filter(|c| *c == '\n' || (!c.is_control() && (*c as u32) < 0x100))
        .collect()
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.chars().count() + word.chars().count() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

// ── object storage ──────────────────────────────────────────────────────────

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` under `key` and returns the object URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, PublishError>;
}

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, PublishError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| PublishError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Uploaded export to s3://{}/{}", self.bucket, key);
        Ok(format!("s3://{}/{key}", self.bucket))
    }
}

/// Keeps objects in memory. Used by tests and local demos without MinIO.
#[derive(Default)]
pub struct MemoryObjectStore {
    pub objects: RwLock<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, PublishError> {
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(format!("memory://{key}"))
    }
}

// ── publisher ───────────────────────────────────────────────────────────────

pub struct PdfPublisher {
    store: Arc<dyn ObjectStore>,
}

impl PdfPublisher {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn object_key(identity: &Identity, section: &ApprovedSection) -> String {
        format!(
            "exports/{}/{}/{}-{}.pdf",
            identity.owner_id,
            section.draft_id,
            section.section,
            Uuid::new_v4()
        )
    }
}

#[async_trait]
impl Publisher for PdfPublisher {
    fn destination(&self) -> Destination {
        Destination::Pdf
    }

    async fn publish(
        &self,
        identity: &Identity,
        section: &ApprovedSection,
    ) -> Result<PublishReceipt, PublishError> {
        let title = section
            .content
            .headline()
            .unwrap_or_else(|| section.source_topic.clone());
        let bytes = render_document(&title, &section.content.render())?;
        let key = Self::object_key(identity, section);
        let reference = self.store.put(&key, bytes, "application/pdf").await?;

        Ok(PublishReceipt {
            destination: Destination::Pdf,
            reference,
            view_url: None,
            remote_id: key,
            asset_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafts::content::SectionContent;
    use crate::errors::AppError;
    use crate::pipelines::PipelineKind;
    use axum::response::IntoResponse;

    fn approved() -> ApprovedSection {
        ApprovedSection {
            draft_id: Uuid::new_v4(),
            pipeline: PipelineKind::JobHunter,
            source_topic: "Backend Engineer at Acme".into(),
            scope: None,
            section: "cover_letter".into(),
            content: SectionContent::text("Dear Hiring Manager,\n\nI build payment APIs."),
        }
    }

    #[test]
    fn test_render_document_produces_pdf_bytes() {
        let body = "word ".repeat(5_000);
        let bytes = render_document("Weekly plan ✨", &body).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let lines = wrap_text("one two three four five six", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "one two three four five six");
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn test_printable_drops_emoji() {
        assert_eq!(printable("⏳ Café"), " Café");
    }

    #[tokio::test]
    async fn test_each_publish_stores_a_new_object() {
        let store = Arc::new(MemoryObjectStore::default());
        let publisher = PdfPublisher::new(store.clone());
        let identity = Identity::new("u1");
        let section = approved();

        let first = publisher.publish(&identity, &section).await.unwrap();
        let second = publisher.publish(&identity, &section).await.unwrap();

        assert_ne!(first.remote_id, second.remote_id);
        assert!(first.remote_id.starts_with(&format!("exports/u1/{}/cover_letter-", section.draft_id)));
        assert_eq!(store.objects.read().await.len(), 2);
    }

    struct UnreachableBucket;

    #[async_trait]
    impl ObjectStore for UnreachableBucket {
        async fn put(&self, _key: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<String, PublishError> {
            Err(PublishError::Storage("S3 upload failed: connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_upload_failure_is_storage_error() {
        let publisher = PdfPublisher::new(Arc::new(UnreachableBucket));
        let err = publisher
            .publish(&Identity::new("u1"), &approved())
            .await
            .unwrap_err();
        assert!(matches!(
            AppError::from(err).into_response().status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        ));
    }
}
