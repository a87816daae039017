//! Resume tailoring against one job description.
//!
//! Sections: `analysis` (score, gaps, pain points), `summary`, `resume`, `dm` and
//! `cover_letter`. When generation fails the draft still gets usable material built from
//! the master resume.

use serde::Deserialize;

use crate::drafts::content::{JobAnalysis, SectionContent};
use crate::drafts::parser::lenient::text;
use crate::drafts::parser::{self, ParseError};
use crate::llm_client::prompts::fill;
use crate::llm_client::{GenerationOutput, GenerationRequest};
use crate::pipelines::prompts::{JOB_HUNTER_PROMPT, JOB_HUNTER_SYSTEM};
use crate::pipelines::{
    expect_text, wrong_input, FailureNotice, Pipeline, PipelineInput, PipelineKind, Sections,
};

const SECTIONS: &[&str] = &["analysis", "summary", "resume", "dm", "cover_letter"];
const FALLBACK_MATCH_SCORE: u32 = 75;
const GENERIC_SUMMARY: &str = "Experienced professional with relevant skills matching this opportunity. Review and customize the generated materials for best results.";
const GENERIC_DM: &str = "Hi! I noticed your posting and believe my background aligns well with what you're looking for. I'd love to connect and discuss how I can contribute to your team. Looking forward to hearing from you!";

pub struct JobHunterPipeline {
    models: Vec<String>,
}

impl JobHunterPipeline {
    pub fn new(models: Vec<String>) -> Self {
        Self { models }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TailoredTexts {
    #[serde(deserialize_with = "text", alias = "tailoredSummary", alias = "summary")]
    tailored_summary: String,
    #[serde(deserialize_with = "text", alias = "tailoredResume", alias = "resume")]
    tailored_resume: String,
    #[serde(deserialize_with = "text", alias = "dmDraft", alias = "dm", alias = "recruiterDm")]
    dm_draft: String,
    #[serde(deserialize_with = "text", alias = "coverLetter")]
    cover_letter: String,
}

fn master_resume(input: &PipelineInput) -> &str {
    match input {
        PipelineInput::JobHunter { master_resume, .. } => master_resume,
        _ => "",
    }
}

fn cover_letter_template(master_resume: &str) -> String {
    let excerpt: String = master_resume.chars().take(500).collect();
    format!(
        "Dear Hiring Manager,\n\n\
         I am writing to express my strong interest in this position. After reviewing the job \
         requirements, I am confident that my skills and experience make me an excellent candidate.\n\n\
         {excerpt}...\n\n\
         I am excited about the opportunity to contribute to your team and would welcome the \
         chance to discuss my qualifications further.\n\n\
         Thank you for considering my application.\n\n\
         Best regards"
    )
}

fn or_else(value: String, default: impl FnOnce() -> String) -> SectionContent {
    if value.trim().is_empty() {
        SectionContent::Text(default())
    } else {
        SectionContent::Text(value)
    }
}

impl Pipeline for JobHunterPipeline {
    fn kind(&self) -> PipelineKind {
        PipelineKind::JobHunter
    }

    fn sections(&self) -> &'static [&'static str] {
        SECTIONS
    }

    fn models(&self) -> &[String] {
        &self.models
    }

    fn request(&self, input: &PipelineInput) -> GenerationRequest {
        let job_description = match input {
            PipelineInput::JobHunter {
                job_description, ..
            } => job_description.as_str(),
            _ => "",
        };
        let prompt = fill(
            JOB_HUNTER_PROMPT,
            &[
                ("job_description", job_description),
                ("master_resume", master_resume(input)),
            ],
        );
        GenerationRequest::json(prompt)
            .with_system(JOB_HUNTER_SYSTEM)
            .with_temperature(0.7)
            .with_max_output_tokens(4096)
    }

    fn parse(&self, input: &PipelineInput, output: GenerationOutput) -> Result<Sections, ParseError> {
        if input.kind() != self.kind() {
            return Err(wrong_input(self.kind()));
        }
        let raw = expect_text(output)?;
        let value = parser::parse_json_value(&raw)?;
        if !value.is_object() {
            return Err(ParseError::UnparsableResponse(
                "analysis response is not an object".into(),
            ));
        }

        let analysis: JobAnalysis = parser::from_value(value.clone())?;
        let texts: TailoredTexts = serde_json::from_value(value)
            .map_err(|e| ParseError::UnparsableResponse(format!("unexpected analysis shape: {e}")))?;
        let resume = master_resume(input);

        Ok(Sections::from([
            ("analysis".to_string(), SectionContent::JobAnalysis(analysis)),
            (
                "summary".to_string(),
                or_else(texts.tailored_summary, || GENERIC_SUMMARY.to_string()),
            ),
            (
                "resume".to_string(),
                or_else(texts.tailored_resume, || resume.to_string()),
            ),
            (
                "dm".to_string(),
                or_else(texts.dm_draft, || GENERIC_DM.to_string()),
            ),
            (
                "cover_letter".to_string(),
                or_else(texts.cover_letter, || cover_letter_template(resume)),
            ),
        ]))
    }

    fn fallback(&self, input: &PipelineInput, failure: &FailureNotice) -> Sections {
        let reason = if failure.quota { "rate limit" } else { "error" };
        let resume = master_resume(input);
        let analysis = JobAnalysis {
            match_score: FALLBACK_MATCH_SCORE,
            gap_analysis: format!(
                "AI analysis temporarily unavailable ({reason}). Based on your resume, you appear \
                 to be a strong candidate. Review the tailored materials below and customize as needed."
            ),
            missing_skills: vec!["Review job posting for specific requirements".into()],
            pain_points: Vec::new(),
            key_changes: Vec::new(),
        };

        Sections::from([
            ("analysis".to_string(), SectionContent::JobAnalysis(analysis)),
            ("summary".to_string(), SectionContent::text(GENERIC_SUMMARY)),
            (
                "resume".to_string(),
                or_else(resume.to_string(), || failure.section_text()),
            ),
            ("dm".to_string(), SectionContent::text(GENERIC_DM)),
            (
                "cover_letter".to_string(),
                SectionContent::Text(cover_letter_template(resume)),
            ),
        ])
    }
}
