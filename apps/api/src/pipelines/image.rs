use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::drafts::content::{ImageAsset, SectionContent};
use crate::drafts::parser::ParseError;
use crate::llm_client::prompts::IMAGE_STYLE_SUFFIX;
use crate::llm_client::{GenerationOutput, GenerationRequest};
use crate::pipelines::{wrong_input, FailureNotice, Pipeline, PipelineInput, PipelineKind, Sections};

const SECTIONS: &[&str] = &["image"];
const PLACEHOLDER_BASE: &str = "https://placehold.co/1024x1024/E8D5C4/6B5B4F";
const ASPECT_RATIOS: &[&str] = &["1:1", "16:9", "9:16", "4:3", "3:4"];

/// One on-brand image from a text prompt.
pub struct ImagePipeline {
    models: Vec<String>,
}

impl ImagePipeline {
    pub fn new(models: Vec<String>) -> Self {
        Self { models }
    }
}

fn prompt_of(input: &PipelineInput) -> (&str, &str) {
    match input {
        PipelineInput::Image {
            prompt,
            aspect_ratio,
        } => (
            prompt.trim(),
            aspect_ratio
                .as_deref()
                .filter(|r| ASPECT_RATIOS.contains(r))
                .unwrap_or("1:1"),
        ),
        _ => ("", "1:1"),
    }
}

pub fn placeholder_url(prompt: &str) -> String {
    let label: String = prompt.chars().take(30).collect();
    let encoded: String = url::form_urlencoded::byte_serialize(label.as_bytes()).collect();
    format!("{PLACEHOLDER_BASE}?text={encoded}")
}

/// Decodes a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = BASE64.decode(payload.as_bytes()).ok()?;
    Some((mime.to_string(), bytes))
}

impl Pipeline for ImagePipeline {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Image
    }

    fn sections(&self) -> &'static [&'static str] {
        SECTIONS
    }

    fn models(&self) -> &[String] {
        &self.models
    }

    fn placeholder(&self, _section: &str) -> SectionContent {
        SectionContent::text("⏳ Generating image...")
    }

    fn request(&self, input: &PipelineInput) -> GenerationRequest {
        let (prompt, aspect_ratio) = prompt_of(input);
        GenerationRequest::image(format!("{prompt}\n\n{IMAGE_STYLE_SUFFIX}"), aspect_ratio)
    }

    fn parse(&self, input: &PipelineInput, output: GenerationOutput) -> Result<Sections, ParseError> {
        if input.kind() != self.kind() {
            return Err(wrong_input(self.kind()));
        }
        let GenerationOutput::Image { bytes, mime_type } = output else {
            return Err(ParseError::UnparsableResponse(
                "expected an image, got text".into(),
            ));
        };
        if bytes.is_empty() {
            return Err(ParseError::UnparsableResponse("empty image".into()));
        }

        let asset = ImageAsset {
            url: format!("data:{mime_type};base64,{}", BASE64.encode(&bytes)),
            mime_type,
            prompt: prompt_of(input).0.to_string(),
            placeholder: false,
        };
        Ok(Sections::from([("image".to_string(), SectionContent::Image(asset))]))
    }

    fn fallback(&self, input: &PipelineInput, _failure: &FailureNotice) -> Sections {
        let prompt = prompt_of(input).0;
        let asset = ImageAsset {
            url: placeholder_url(prompt),
            mime_type: "image/png".into(),
            prompt: prompt.to_string(),
            placeholder: true,
        };
        Sections::from([("image".to_string(), SectionContent::Image(asset))])
    }
}
