//! Pipelines: each dashboard feature expressed as data over the one generic draft flow.
//!
//! A `Pipeline` fixes the section set, builds the generation request from the submitted
//! input, parses the model output into `SectionContent`, and supplies fallback content
//! when generation fails. `PipelineRegistry` maps each `PipelineKind` to its
//! implementation and is carried by the orchestrator.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::drafts::content::SectionContent;
use crate::drafts::parser::ParseError;
use crate::errors::AppError;
use crate::llm_client::{GenerationOutput, GenerationRequest};

pub mod content_lab;
pub mod image;
pub mod job_hunter;
pub mod linkedin;
pub mod prompts;
pub mod strategy;
pub mod weekly_plan;

pub use linkedin::LinkedinStyle;

pub type Sections = BTreeMap<String, SectionContent>;

// ────────────────────────────────────────────────────────────────────────────
// Kind and input
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    WeeklyPlan,
    Strategy,
    ContentLab,
    Linkedin,
    JobHunter,
    Image,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 6] = [
        PipelineKind::WeeklyPlan,
        PipelineKind::Strategy,
        PipelineKind::ContentLab,
        PipelineKind::Linkedin,
        PipelineKind::JobHunter,
        PipelineKind::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::WeeklyPlan => "weekly_plan",
            PipelineKind::Strategy => "strategy",
            PipelineKind::ContentLab => "content_lab",
            PipelineKind::Linkedin => "linkedin",
            PipelineKind::JobHunter => "job_hunter",
            PipelineKind::Image => "image",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PipelineKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown pipeline '{s}'")))
    }
}

/// What the caller submits. Stored on the draft so it can be regenerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineInput {
    WeeklyPlan {
        #[serde(default)]
        knowledge: Vec<String>,
        #[serde(default)]
        trends: Vec<String>,
        #[serde(default, alias = "weekOf")]
        week_of: Option<String>,
    },
    Strategy {
        topic: String,
        #[serde(default)]
        hook: Option<String>,
        #[serde(default, alias = "weekOf")]
        week_of: Option<String>,
    },
    ContentLab {
        topic: String,
        #[serde(default, alias = "sourceUrl")]
        source_url: Option<String>,
    },
    Linkedin {
        topic: String,
        #[serde(default)]
        style: LinkedinStyle,
    },
    JobHunter {
        #[serde(default, alias = "jobTitle")]
        job_title: Option<String>,
        #[serde(default)]
        company: Option<String>,
        #[serde(alias = "jobDescription")]
        job_description: String,
        #[serde(alias = "masterResume")]
        master_resume: String,
    },
    Image {
        prompt: String,
        #[serde(default, alias = "aspectRatio")]
        aspect_ratio: Option<String>,
    },
}

impl PipelineInput {
    pub fn kind(&self) -> PipelineKind {
        match self {
            PipelineInput::WeeklyPlan { .. } => PipelineKind::WeeklyPlan,
            PipelineInput::Strategy { .. } => PipelineKind::Strategy,
            PipelineInput::ContentLab { .. } => PipelineKind::ContentLab,
            PipelineInput::Linkedin { .. } => PipelineKind::Linkedin,
            PipelineInput::JobHunter { .. } => PipelineKind::JobHunter,
            PipelineInput::Image { .. } => PipelineKind::Image,
        }
    }

    /// Seed prompt or topic recorded on the draft.
    pub fn source_topic(&self) -> String {
        match self {
            PipelineInput::WeeklyPlan { week_of, .. } => format!(
                "Weekly plan {}",
                week_of.clone().unwrap_or_else(current_iso_week)
            ),
            PipelineInput::Strategy { topic, .. }
            | PipelineInput::ContentLab { topic, .. }
            | PipelineInput::Linkedin { topic, .. } => topic.trim().to_string(),
            PipelineInput::JobHunter {
                job_title, company, ..
            } => match (job_title.as_deref(), company.as_deref()) {
                (Some(t), Some(c)) => format!("{t} at {c}"),
                (Some(t), None) => t.to_string(),
                _ => "Job Analysis".to_string(),
            },
            PipelineInput::Image { prompt, .. } => prompt.trim().to_string(),
        }
    }

    /// ISO week scope for the planning pipelines.
    pub fn scope(&self) -> Option<String> {
        match self {
            PipelineInput::WeeklyPlan { week_of, .. } | PipelineInput::Strategy { week_of, .. } => {
                Some(week_of.clone().unwrap_or_else(current_iso_week))
            }
            _ => None,
        }
    }

    /// Rejects inputs a pipeline cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        let require = |value: &str, field: &str| {
            if value.trim().is_empty() {
                Err(AppError::Validation(format!("'{field}' must not be empty")))
            } else {
                Ok(())
            }
        };
        match self {
            PipelineInput::WeeklyPlan { .. } => Ok(()),
            PipelineInput::Strategy { topic, .. }
            | PipelineInput::ContentLab { topic, .. }
            | PipelineInput::Linkedin { topic, .. } => require(topic, "topic"),
            PipelineInput::JobHunter {
                job_description,
                master_resume,
                ..
            } => {
                require(job_description, "job_description")?;
                require(master_resume, "master_resume")
            }
            PipelineInput::Image { prompt, .. } => require(prompt, "prompt"),
        }
    }
}

pub fn current_iso_week() -> String {
    let week = Utc::now().iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline trait
// ────────────────────────────────────────────────────────────────────────────

/// Why generation failed, as seen by fallback builders.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureNotice {
    pub message: String,
    pub quota: bool,
}

impl FailureNotice {
    /// User-facing error text for sections without a synthetic fallback.
    pub fn section_text(&self) -> String {
        if self.quota {
            "⚠️ Daily AI generation limit reached. Please try again tomorrow.".to_string()
        } else {
            format!("❌ Error: {}", self.message)
        }
    }
}

pub trait Pipeline: Send + Sync {
    fn kind(&self) -> PipelineKind;

    /// Fixed section set.
    fn sections(&self) -> &'static [&'static str];

    /// Ordered model fallback chain.
    fn models(&self) -> &[String];

    fn placeholder(&self, section: &str) -> SectionContent {
        SectionContent::text(format!("⏳ Generating {}...", section.replace('_', " ")))
    }

    fn request(&self, input: &PipelineInput) -> GenerationRequest;

    /// Must return a value for every section or fail.
    fn parse(&self, input: &PipelineInput, output: GenerationOutput) -> Result<Sections, ParseError>;

    /// Content written when generation or parsing fails. Every section, never empty.
    fn fallback(&self, input: &PipelineInput, failure: &FailureNotice) -> Sections;

    fn placeholders(&self) -> Sections {
        self.sections()
            .iter()
            .map(|s| (s.to_string(), self.placeholder(s)))
            .collect()
    }
}

/// Fills every section with the same text.
pub(crate) fn uniform_sections(sections: &[&str], text: &str) -> Sections {
    sections
        .iter()
        .map(|s| (s.to_string(), SectionContent::text(text)))
        .collect()
}

pub(crate) fn expect_text(output: GenerationOutput) -> Result<String, ParseError> {
    match output {
        GenerationOutput::Text(text) => Ok(text),
        GenerationOutput::Image { .. } => Err(ParseError::UnparsableResponse(
            "expected text, got an image".into(),
        )),
    }
}

pub(crate) fn wrong_input(kind: PipelineKind) -> ParseError {
    ParseError::UnparsableResponse(format!("input does not belong to the {kind} pipeline"))
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PipelineRegistry {
    pipelines: HashMap<PipelineKind, Arc<dyn Pipeline>>,
}

impl PipelineRegistry {
    pub fn new(pipelines: Vec<Arc<dyn Pipeline>>) -> Self {
        Self {
            pipelines: pipelines.into_iter().map(|p| (p.kind(), p)).collect(),
        }
    }

    /// All six pipelines; text pipelines share the configured chain, images use Imagen.
    pub fn from_config(config: &Config) -> Self {
        let text = config.text_models.clone();
        Self::new(vec![
            Arc::new(weekly_plan::WeeklyPlanPipeline::new(text.clone())),
            Arc::new(strategy::StrategyPipeline::new(text.clone())),
            Arc::new(content_lab::ContentLabPipeline::new(text.clone())),
            Arc::new(linkedin::LinkedinPipeline::new(text.clone())),
            Arc::new(job_hunter::JobHunterPipeline::new(text)),
            Arc::new(image::ImagePipeline::new(vec![config.imagen_model.clone()])),
        ])
    }

    pub fn get(&self, kind: PipelineKind) -> Result<Arc<dyn Pipeline>, AppError> {
        self.pipelines
            .get(&kind)
            .cloned()
            .ok_or_else(|| AppError::Validation(format!("Pipeline '{kind}' is not enabled")))
    }
}
