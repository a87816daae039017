use serde::Deserialize;

use crate::drafts::content::SectionContent;
use crate::drafts::parser::lenient::text;
use crate::drafts::parser::{self, ParseError};
use crate::llm_client::prompts::fill;
use crate::llm_client::{GenerationOutput, GenerationRequest};
use crate::pipelines::prompts::CONTENT_LAB_PROMPT;
use crate::pipelines::{
    expect_text, uniform_sections, wrong_input, FailureNotice, Pipeline, PipelineInput,
    PipelineKind, Sections,
};

const SECTIONS: &[&str] = &["technical", "strategic", "networking"];
const MISSING_DRAFT: &str = "Generation failed";

/// Three LinkedIn variants of one trending topic.
pub struct ContentLabPipeline {
    models: Vec<String>,
}

impl ContentLabPipeline {
    pub fn new(models: Vec<String>) -> Self {
        Self { models }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VariantsResponse {
    #[serde(deserialize_with = "text", alias = "technicalDraft", alias = "technical")]
    technical_draft: String,
    #[serde(deserialize_with = "text", alias = "strategicDraft", alias = "strategic")]
    strategic_draft: String,
    #[serde(deserialize_with = "text", alias = "networkingDraft", alias = "networking")]
    networking_draft: String,
}

fn or_missing(draft: String) -> SectionContent {
    if draft.trim().is_empty() {
        SectionContent::text(MISSING_DRAFT)
    } else {
        SectionContent::Text(draft)
    }
}

impl Pipeline for ContentLabPipeline {
    fn kind(&self) -> PipelineKind {
        PipelineKind::ContentLab
    }

    fn sections(&self) -> &'static [&'static str] {
        SECTIONS
    }

    fn models(&self) -> &[String] {
        &self.models
    }

    fn placeholder(&self, section: &str) -> SectionContent {
        let label = match section {
            "technical" => "technical deep dive",
            "strategic" => "strategic insight",
            _ => "networking hook",
        };
        SectionContent::text(format!("⏳ Generating {label}..."))
    }

    fn request(&self, input: &PipelineInput) -> GenerationRequest {
        let (topic, source) = match input {
            PipelineInput::ContentLab { topic, source_url } => (
                topic.trim().to_string(),
                source_url
                    .as_deref()
                    .map(|url| format!("## SOURCE: {url}"))
                    .unwrap_or_default(),
            ),
            _ => Default::default(),
        };
        let prompt = fill(
            CONTENT_LAB_PROMPT,
            &[("topic", topic.as_str()), ("source", source.as_str())],
        );
        GenerationRequest::json(prompt)
            .with_temperature(0.9)
            .with_max_output_tokens(2048)
    }

    fn parse(&self, input: &PipelineInput, output: GenerationOutput) -> Result<Sections, ParseError> {
        if input.kind() != self.kind() {
            return Err(wrong_input(self.kind()));
        }
        let raw = expect_text(output)?;
        let response: VariantsResponse = serde_json::from_value(parser::parse_json_value(&raw)?)
            .map_err(|e| ParseError::UnparsableResponse(format!("unexpected variants shape: {e}")))?;

        if [
            &response.technical_draft,
            &response.strategic_draft,
            &response.networking_draft,
        ]
        .iter()
        .all(|d| d.is_empty())
        {
            return Err(ParseError::UnparsableResponse(
                "response contains none of the three drafts".into(),
            ));
        }

        Ok(Sections::from([
            ("technical".to_string(), or_missing(response.technical_draft)),
            ("strategic".to_string(), or_missing(response.strategic_draft)),
            ("networking".to_string(), or_missing(response.networking_draft)),
        ]))
    }

    fn fallback(&self, _input: &PipelineInput, failure: &FailureNotice) -> Sections {
        uniform_sections(SECTIONS, &failure.section_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> PipelineInput {
        PipelineInput::ContentLab {
            topic: "Agents in production".into(),
            source_url: Some("https://news.example.com/agents".into()),
        }
    }

    #[test]
    fn test_placeholders_match_variants() {
        let p = ContentLabPipeline::new(vec![]);
        assert_eq!(
            p.placeholder("technical"),
            SectionContent::text("⏳ Generating technical deep dive...")
        );
        assert_eq!(
            p.placeholder("networking"),
            SectionContent::text("⏳ Generating networking hook...")
        );
    }

    #[test]
    fn test_missing_variant_gets_default() {
        let raw = r#"{"technicalDraft": "Tech post", "strategicDraft": "Strategy post"}"#;
        let sections = ContentLabPipeline::new(vec![])
            .parse(&input(), GenerationOutput::Text(raw.into()))
            .unwrap();
        assert_eq!(sections["technical"], SectionContent::text("Tech post"));
        assert_eq!(sections["networking"], SectionContent::text(MISSING_DRAFT));
    }

    #[test]
    fn test_no_variants_is_unparsable() {
        let err = ContentLabPipeline::new(vec![])
            .parse(&input(), GenerationOutput::Text("{}".into()))
            .unwrap_err();
        assert!(matches!(err, ParseError::UnparsableResponse(_)));
    }

    #[test]
    fn test_fallback_marks_error() {
        let sections = ContentLabPipeline::new(vec![]).fallback(
            &input(),
            &FailureNotice {
                message: "All attempted models failed. Last error: 404".into(),
                quota: false,
            },
        );
        assert_eq!(
            sections["strategic"],
            SectionContent::text("❌ Error: All attempted models failed. Last error: 404")
        );
    }

    #[test]
    fn test_request_mentions_source() {
        let request = ContentLabPipeline::new(vec![]).request(&input());
        assert!(request.prompt.contains("## SOURCE: https://news.example.com/agents"));
        assert!((request.temperature - 0.9).abs() < f32::EPSILON);
    }
}
