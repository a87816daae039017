use serde_json::Value;

use crate::drafts::content::{Complete, PlanDay, SectionContent};
use crate::drafts::parser::{self, ParseError};
use crate::llm_client::prompts::{fill, BRAND_VOICE};
use crate::llm_client::{GenerationOutput, GenerationRequest};
use crate::pipelines::prompts::WEEKLY_PLAN_PROMPT;
use crate::pipelines::{
    expect_text, uniform_sections, wrong_input, FailureNotice, Pipeline, PipelineInput,
    PipelineKind, Sections,
};

const SECTIONS: &[&str] = &["plan"];

pub struct WeeklyPlanPipeline {
    models: Vec<String>,
}

impl WeeklyPlanPipeline {
    pub fn new(models: Vec<String>) -> Self {
        Self { models }
    }
}

fn context_block(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items
            .iter()
            .map(|i| format!("- {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Accepts a bare array of days or an object carrying one under `days` / `plan`.
fn plan_days(value: Value) -> Result<Vec<PlanDay>, ParseError> {
    let days = match value {
        array @ Value::Array(_) => array,
        Value::Object(mut map) => ["days", "plan", "weeklyPlan"]
            .iter()
            .find_map(|key| map.remove(*key))
            .ok_or_else(|| ParseError::UnparsableResponse("no days in plan response".into()))?,
        _ => {
            return Err(ParseError::UnparsableResponse(
                "plan response is not an object or array".into(),
            ))
        }
    };

    let days: Vec<PlanDay> = serde_json::from_value(days)
        .map_err(|e| ParseError::UnparsableResponse(format!("unexpected plan shape: {e}")))?;
    if days.is_empty() {
        return Err(ParseError::UnparsableResponse("plan has no days".into()));
    }
    Ok(days)
}

impl Pipeline for WeeklyPlanPipeline {
    fn kind(&self) -> PipelineKind {
        PipelineKind::WeeklyPlan
    }

    fn sections(&self) -> &'static [&'static str] {
        SECTIONS
    }

    fn models(&self) -> &[String] {
        &self.models
    }

    fn placeholder(&self, _section: &str) -> SectionContent {
        SectionContent::text("⏳ Planning your week...")
    }

    fn request(&self, input: &PipelineInput) -> GenerationRequest {
        let (knowledge, trends) = match input {
            PipelineInput::WeeklyPlan {
                knowledge, trends, ..
            } => (
                context_block(knowledge, "(no knowledge base documents yet)"),
                context_block(trends, "(no recent trends)"),
            ),
            _ => (String::new(), String::new()),
        };
        let prompt = fill(
            WEEKLY_PLAN_PROMPT,
            &[("knowledge", knowledge.as_str()), ("trends", trends.as_str())],
        );
        GenerationRequest::json(prompt)
            .with_system(BRAND_VOICE)
            .with_temperature(0.8)
            .with_max_output_tokens(2048)
    }

    fn parse(&self, input: &PipelineInput, output: GenerationOutput) -> Result<Sections, ParseError> {
        if input.kind() != self.kind() {
            return Err(wrong_input(self.kind()));
        }
        let raw = expect_text(output)?;
        let days = plan_days(parser::parse_json_value(&raw)?)?;

        let mut content = SectionContent::PlanDays(days);
        content.complete();
        Ok(Sections::from([("plan".to_string(), content)]))
    }

    fn fallback(&self, _input: &PipelineInput, failure: &FailureNotice) -> Sections {
        uniform_sections(SECTIONS, &failure.section_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> PipelineInput {
        PipelineInput::WeeklyPlan {
            knowledge: vec!["Breathing games for toddlers".into()],
            trends: vec!["Screen-free mornings".into()],
            week_of: Some("2026-W04".into()),
        }
    }

    fn pipeline() -> WeeklyPlanPipeline {
        WeeklyPlanPipeline::new(vec!["m1".into()])
    }

    #[test]
    fn test_morning_calm_routine_scenario_with_ration_alias() {
        let raw = "```json\n{\"topic\":\"X\",\"days\":[{\"day\":1,\"topic\":\"A\",\"format\":\"Blog\",\"hook\":\"H\",\"ration\":\"R\"}]}\n```";
        let sections = pipeline()
            .parse(&input(), GenerationOutput::Text(raw.into()))
            .unwrap();
        assert_eq!(
            sections["plan"],
            SectionContent::PlanDays(vec![PlanDay {
                day: 1,
                topic: "A".into(),
                format: "Blog".into(),
                hook: "H".into(),
                rationale: "R".into(),
            }])
        );
    }

    #[test]
    fn test_bare_array_is_accepted() {
        let raw = r#"[{"day": 1, "topic": "A"}, {"day": 2, "topic": "B"}]"#;
        let sections = pipeline()
            .parse(&input(), GenerationOutput::Text(raw.into()))
            .unwrap();
        let SectionContent::PlanDays(days) = &sections["plan"] else {
            panic!("expected plan days")
        };
        assert_eq!(days.len(), 2);
        assert_eq!(days[1].format, "Blog");
    }

    #[test]
    fn test_empty_plan_is_unparsable() {
        let err = pipeline()
            .parse(&input(), GenerationOutput::Text("{\"days\": []}".into()))
            .unwrap_err();
        assert!(matches!(err, ParseError::UnparsableResponse(_)));
    }

    #[test]
    fn test_request_includes_trends_and_json_mode() {
        let request = pipeline().request(&input());
        assert_eq!(request.mode, crate::llm_client::OutputMode::Json);
        assert!(request.prompt.contains("- Screen-free mornings"));
        assert!(request.prompt.contains("- Breathing games for toddlers"));
    }
}
