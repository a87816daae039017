use serde::{Deserialize, Serialize};

use crate::drafts::content::SectionContent;
use crate::drafts::parser::{strip_code_fences, ParseError};
use crate::llm_client::prompts::fill;
use crate::llm_client::{GenerationOutput, GenerationRequest};
use crate::pipelines::prompts::{
    LINKEDIN_PROMPT, LINKEDIN_STYLE_CONTROVERSIAL, LINKEDIN_STYLE_STORY, LINKEDIN_STYLE_THOUGHT_LEADERSHIP,
    LINKEDIN_STYLE_TIPS,
};
use crate::pipelines::{
    expect_text, uniform_sections, wrong_input, FailureNotice, Pipeline, PipelineInput,
    PipelineKind, Sections,
};

const SECTIONS: &[&str] = &["post", "hook"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkedinStyle {
    #[default]
    ThoughtLeadership,
    Story,
    Tips,
    Controversial,
}

impl LinkedinStyle {
    pub fn guide(&self) -> &'static str {
        match self {
            LinkedinStyle::ThoughtLeadership => LINKEDIN_STYLE_THOUGHT_LEADERSHIP,
            LinkedinStyle::Story => LINKEDIN_STYLE_STORY,
            LinkedinStyle::Tips => LINKEDIN_STYLE_TIPS,
            LinkedinStyle::Controversial => LINKEDIN_STYLE_CONTROVERSIAL,
        }
    }
}

/// Free-text LinkedIn post; the hook is its first line.
pub struct LinkedinPipeline {
    models: Vec<String>,
}

impl LinkedinPipeline {
    pub fn new(models: Vec<String>) -> Self {
        Self { models }
    }
}

impl Pipeline for LinkedinPipeline {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Linkedin
    }

    fn sections(&self) -> &'static [&'static str] {
        SECTIONS
    }

    fn models(&self) -> &[String] {
        &self.models
    }

    fn request(&self, input: &PipelineInput) -> GenerationRequest {
        let (topic, style) = match input {
            PipelineInput::Linkedin { topic, style } => (topic.trim(), *style),
            _ => ("", LinkedinStyle::default()),
        };
        let prompt = fill(LINKEDIN_PROMPT, &[("topic", topic), ("style", style.guide())]);
        GenerationRequest::text(prompt)
            .with_temperature(0.9)
            .with_max_output_tokens(1024)
    }

    fn parse(&self, input: &PipelineInput, output: GenerationOutput) -> Result<Sections, ParseError> {
        if input.kind() != self.kind() {
            return Err(wrong_input(self.kind()));
        }
        let raw = expect_text(output)?;
        let post = strip_code_fences(&raw).to_string();
        let hook = post
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(String::from)
            .ok_or_else(|| ParseError::UnparsableResponse("empty post".into()))?;

        Ok(Sections::from([
            ("post".to_string(), SectionContent::Text(post)),
            ("hook".to_string(), SectionContent::Text(hook)),
        ]))
    }

    fn fallback(&self, _input: &PipelineInput, failure: &FailureNotice) -> Sections {
        uniform_sections(SECTIONS, &failure.section_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(style: LinkedinStyle) -> PipelineInput {
        PipelineInput::Linkedin {
            topic: "Shipping Rust at a startup".into(),
            style,
        }
    }

    #[test]
    fn test_hook_is_first_non_empty_line() {
        let raw = "\n\nI rewrote our API in a weekend.\n\nHere is what broke.\n#rust";
        let sections = LinkedinPipeline::new(vec![])
            .parse(&input(LinkedinStyle::Story), GenerationOutput::Text(raw.into()))
            .unwrap();
        assert_eq!(
            sections["hook"],
            SectionContent::text("I rewrote our API in a weekend.")
        );
        let SectionContent::Text(post) = &sections["post"] else {
            panic!("expected text")
        };
        assert!(post.ends_with("#rust"));
    }

    #[test]
    fn test_blank_output_is_unparsable() {
        let err = LinkedinPipeline::new(vec![])
            .parse(&input(LinkedinStyle::Tips), GenerationOutput::Text("  \n ".into()))
            .unwrap_err();
        assert!(matches!(err, ParseError::UnparsableResponse(_)));
    }

    #[test]
    fn test_style_guide_lands_in_prompt() {
        let request = LinkedinPipeline::new(vec![]).request(&input(LinkedinStyle::Controversial));
        assert!(request.prompt.contains(LINKEDIN_STYLE_CONTROVERSIAL));
        assert_eq!(request.mode, crate::llm_client::OutputMode::Text);
        assert_eq!(request.max_output_tokens, 1024);
    }

    #[test]
    fn test_style_defaults_to_thought_leadership() {
        let input: PipelineInput =
            serde_json::from_str(r#"{"kind": "linkedin", "topic": "x"}"#).unwrap();
        assert_eq!(
            input,
            PipelineInput::Linkedin {
                topic: "x".into(),
                style: LinkedinStyle::ThoughtLeadership
            }
        );
    }
}
