use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::drafts::content::{ImageAsset, SectionContent};
use crate::drafts::models::ApprovedSection;
use crate::identity::Identity;
use crate::pipelines::image::decode_data_url;
use crate::publish::connections::ConnectionStore;
use crate::publish::{Destination, PublishError, PublishReceipt, Publisher};

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Canvas size and title for one approved section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignSpec {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl DesignSpec {
    pub fn for_section(section: &ApprovedSection) -> Self {
        let (title, width, height) = match &section.content {
            SectionContent::InstagramPosts(posts) => (
                format!(
                    "Instagram: {}",
                    posts.first().map_or("Weekly Post", |p| p.title.as_str())
                ),
                1080,
                1080,
            ),
            SectionContent::BlogPost(post) => (format!("Blog: {}", or(&post.title, "Weekly Blog")), 1200, 630),
            SectionContent::EbookChapter(ch) => (
                format!("Ebook Ch.{}: {}", ch.chapter_number, ch.title),
                816,
                1056,
            ),
            SectionContent::EtsyProducts(products) => (
                format!(
                    "Etsy: {}",
                    products.first().map_or("Product Listing", |p| p.name.as_str())
                ),
                2000,
                2000,
            ),
            other => (
                other
                    .headline()
                    .map(|h| truncate(&h, 80))
                    .unwrap_or_else(|| "Marketing Content".to_string()),
                1080,
                1080,
            ),
        };
        Self {
            title,
            width,
            height,
        }
    }

    fn asset_file_name(&self) -> String {
        let stem: String = self
            .title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{stem}.png")
    }
}

fn or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

// ── Canva wire format ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct CreateDesignRequest<'a> {
    design_type: CustomDesignType,
    title: &'a str,
}

#[derive(Serialize)]
struct CustomDesignType {
    #[serde(rename = "type")]
    kind: &'static str,
    width: u32,
    height: u32,
    units: &'static str,
}

#[derive(Deserialize)]
struct CreateDesignResponse {
    design: Design,
}

#[derive(Deserialize)]
struct Design {
    id: String,
    urls: DesignUrls,
}

#[derive(Deserialize)]
struct DesignUrls {
    edit_url: String,
    view_url: Option<String>,
}

#[derive(Deserialize)]
struct UploadAssetResponse {
    asset: Asset,
}

#[derive(Deserialize)]
struct Asset {
    id: String,
}

/// Creates one Canva design per call, uploading the section's image first when it has one.
pub struct CanvaPublisher {
    client: Client,
    api_base: String,
    connections: Arc<dyn ConnectionStore>,
}

impl CanvaPublisher {
    pub fn new(api_base: impl Into<String>, connections: Arc<dyn ConnectionStore>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            connections,
        }
    }

    async fn access_token(&self, owner_id: &str) -> Result<String, PublishError> {
        let connection = self
            .connections
            .get(owner_id)
            .await
            .map_err(|e| PublishError::Failed(format!("Could not load Canva connection: {e}")))?
            .ok_or(PublishError::NotConnected)?;
        if !connection.is_usable() {
            return Err(PublishError::NotConnected);
        }
        Ok(connection.access_token)
    }

    async fn image_bytes(&self, image: &ImageAsset) -> Result<Bytes, PublishError> {
        if let Some((_, bytes)) = decode_data_url(&image.url) {
            return Ok(Bytes::from(bytes));
        }
        let response = self
            .client
            .get(&image.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PublishError::Failed(format!("Could not fetch image: {e}")))?;
        response
            .bytes()
            .await
            .map_err(|e| PublishError::Failed(format!("Could not read image: {e}")))
    }

    async fn upload_asset(
        &self,
        token: &str,
        bytes: Bytes,
        file_name: String,
    ) -> Result<String, PublishError> {
        let part = multipart::Part::bytes(bytes.to_vec())
            .file_name(file_name)
            .mime_str("image/png")
            .map_err(|e| PublishError::Failed(e.to_string()))?;
        let form = multipart::Form::new().part("asset", part);

        let response = self
            .client
            .post(format!("{}/assets", self.api_base))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PublishError::Failed(format!("Failed to upload asset: {e}")))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Failed(format!("Failed to upload asset: {body}")));
        }
        let data: UploadAssetResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Failed(format!("Unexpected asset response: {e}")))?;
        Ok(data.asset.id)
    }

    async fn create_design(&self, token: &str, spec: &DesignSpec) -> Result<Design, PublishError> {
        let body = CreateDesignRequest {
            design_type: CustomDesignType {
                kind: "custom",
                width: spec.width,
                height: spec.height,
                units: "px",
            },
            title: &spec.title,
        };

        let response = self
            .client
            .post(format!("{}/designs", self.api_base))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::Failed(format!("Failed to create Canva design: {e}")))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Failed(format!(
                "Failed to create Canva design: {body}"
            )));
        }
        let data: CreateDesignResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Failed(format!("Unexpected design response: {e}")))?;
        Ok(data.design)
    }
}

#[async_trait]
impl Publisher for CanvaPublisher {
    fn destination(&self) -> Destination {
        Destination::Canva
    }

    async fn publish(
        &self,
        identity: &Identity,
        section: &ApprovedSection,
    ) -> Result<PublishReceipt, PublishError> {
        let token = self.access_token(&identity.owner_id).await?;
        let spec = DesignSpec::for_section(section);

        let mut asset_id = None;
        if let SectionContent::Image(image) = &section.content {
            let uploaded = match self.image_bytes(image).await {
                Ok(bytes) => self.upload_asset(&token, bytes, spec.asset_file_name()).await,
                Err(e) => Err(e),
            };
            match uploaded {
                Ok(id) => asset_id = Some(id),
                Err(e) => warn!(draft_id = %section.draft_id, error = %e, "Image upload failed; creating design without it"),
            }
        }

        let design = self.create_design(&token, &spec).await?;
        info!(
            draft_id = %section.draft_id,
            section = %section.section,
            design_id = %design.id,
            "Canva design created"
        );

        Ok(PublishReceipt {
            destination: Destination::Canva,
            reference: design.urls.edit_url,
            view_url: design.urls.view_url,
            remote_id: design.id,
            asset_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafts::content::{BlogPost, EbookChapter};
    use crate::pipelines::PipelineKind;
    use crate::publish::connections::fixtures::connection;
    use crate::publish::connections::MemoryConnectionStore;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn approved(section: &str, content: SectionContent) -> ApprovedSection {
        ApprovedSection {
            draft_id: Uuid::new_v4(),
            pipeline: PipelineKind::Strategy,
            source_topic: "morning calm routine".into(),
            scope: Some("2026-W04".into()),
            section: section.into(),
            content,
        }
    }

    fn design_body() -> serde_json::Value {
        serde_json::json!({
            "design": {
                "id": "DAF123",
                "urls": {
                    "edit_url": "https://www.canva.com/design/DAF123/edit",
                    "view_url": "https://www.canva.com/design/DAF123/view"
                }
            }
        })
    }

    async fn connected_store(owner: &str) -> Arc<MemoryConnectionStore> {
        let store = Arc::new(MemoryConnectionStore::new());
        store.upsert(&connection(owner, 3_600_000)).await.unwrap();
        store
    }

    #[test]
    fn test_design_sizes_by_section_type() {
        let blog = DesignSpec::for_section(&approved(
            "blog",
            SectionContent::BlogPost(BlogPost {
                title: "5 Calm Mornings".into(),
                ..Default::default()
            }),
        ));
        assert_eq!((blog.width, blog.height), (1200, 630));
        assert_eq!(blog.title, "Blog: 5 Calm Mornings");

        let ebook = DesignSpec::for_section(&approved(
            "ebook",
            SectionContent::EbookChapter(EbookChapter {
                chapter_number: 3,
                title: "Rituals".into(),
                ..Default::default()
            }),
        ));
        assert_eq!((ebook.width, ebook.height), (816, 1056));
        assert_eq!(ebook.title, "Ebook Ch.3: Rituals");

        let other = DesignSpec::for_section(&approved("post", SectionContent::text("")));
        assert_eq!(other.title, "Marketing Content");
        assert_eq!((other.width, other.height), (1080, 1080));
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(design_body()))
            .expect(0)
            .mount(&server)
            .await;

        let publisher = CanvaPublisher::new(server.uri(), Arc::new(MemoryConnectionStore::new()));
        let err = publisher
            .publish(&Identity::new("u1"), &approved("blog", SectionContent::text("x")))
            .await
            .unwrap_err();
        assert_eq!(err, PublishError::NotConnected);
    }

    #[tokio::test]
    async fn test_expired_token_is_not_connected() {
        let store = Arc::new(MemoryConnectionStore::new());
        store.upsert(&connection("u1", -1_000)).await.unwrap();
        let publisher = CanvaPublisher::new("http://127.0.0.1:1", store);
        let err = publisher
            .publish(&Identity::new("u1"), &approved("blog", SectionContent::text("x")))
            .await
            .unwrap_err();
        assert_eq!(err, PublishError::NotConnected);
    }

    #[tokio::test]
    async fn test_creates_custom_design_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/designs"))
            .and(header("authorization", "Bearer access-token"))
            .and(body_partial_json(serde_json::json!({
                "design_type": { "type": "custom", "width": 1200, "height": 630, "units": "px" },
                "title": "Blog: Slow Sundays"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(design_body()))
            .expect(1)
            .mount(&server)
            .await;

        let publisher = CanvaPublisher::new(server.uri(), connected_store("u1").await);
        let receipt = publisher
            .publish(
                &Identity::new("u1"),
                &approved(
                    "blog",
                    SectionContent::BlogPost(BlogPost {
                        title: "Slow Sundays".into(),
                        ..Default::default()
                    }),
                ),
            )
            .await
            .unwrap();
        assert_eq!(receipt.reference, "https://www.canva.com/design/DAF123/edit");
        assert_eq!(receipt.remote_id, "DAF123");
        assert!(receipt.asset_id.is_none());
    }

    #[tokio::test]
    async fn test_failed_asset_upload_still_creates_design() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/assets"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upload broke"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/designs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(design_body()))
            .expect(1)
            .mount(&server)
            .await;

        let image = ImageAsset {
            url: format!("data:image/png;base64,{}", BASE64.encode(b"PNG")),
            mime_type: "image/png".into(),
            prompt: "sunrise yoga".into(),
            placeholder: false,
        };
        let publisher = CanvaPublisher::new(server.uri(), connected_store("u1").await);
        let receipt = publisher
            .publish(&Identity::new("u1"), &approved("image", SectionContent::Image(image)))
            .await
            .unwrap();
        assert_eq!(receipt.remote_id, "DAF123");
        assert!(receipt.asset_id.is_none());
    }

    #[tokio::test]
    async fn test_design_rejection_is_publish_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/designs"))
            .respond_with(ResponseTemplate::new(403).set_body_string("missing scope"))
            .mount(&server)
            .await;

        let publisher = CanvaPublisher::new(server.uri(), connected_store("u1").await);
        let err = publisher
            .publish(&Identity::new("u1"), &approved("post", SectionContent::text("Hello")))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PublishError::Failed("Failed to create Canva design: missing scope".into())
        );
    }
}
