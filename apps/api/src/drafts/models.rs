use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::drafts::content::SectionContent;
use crate::errors::AppError;
use crate::pipelines::PipelineKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Pending,
    Generated,
    Error,
    Approved,
    Rejected,
    Posted,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Pending => "pending",
            DraftStatus::Generated => "generated",
            DraftStatus::Error => "error",
            DraftStatus::Approved => "approved",
            DraftStatus::Rejected => "rejected",
            DraftStatus::Posted => "posted",
        }
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DraftStatus::Pending),
            "generated" => Ok(DraftStatus::Generated),
            "error" => Ok(DraftStatus::Error),
            "approved" => Ok(DraftStatus::Approved),
            "rejected" => Ok(DraftStatus::Rejected),
            "posted" => Ok(DraftStatus::Posted),
            other => Err(AppError::Validation(format!("Unknown draft status '{other}'"))),
        }
    }
}

/// One pipeline run: placeholder first, then generated content, then human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: Uuid,
    pub owner_id: String,
    pub pipeline: PipelineKind,
    pub source_topic: String,
    pub scope: Option<String>,
    /// Pipeline input as submitted, kept for regeneration.
    pub input: serde_json::Value,
    pub sections: BTreeMap<String, SectionContent>,
    pub approvals: BTreeMap<String, bool>,
    pub status: DraftStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Terminal result of one background generation, written once.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub sections: BTreeMap<String, SectionContent>,
    pub error: Option<String>,
    pub model: Option<String>,
}

/// A section whose approval flag is set, with enough draft context to publish it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovedSection {
    pub draft_id: Uuid,
    pub pipeline: PipelineKind,
    pub source_topic: String,
    pub scope: Option<String>,
    pub section: String,
    pub content: SectionContent,
}

impl Draft {
    /// Placeholder draft in `pending`, every approval flag false.
    pub fn placeholder(
        owner_id: impl Into<String>,
        pipeline: PipelineKind,
        source_topic: impl Into<String>,
        scope: Option<String>,
        input: serde_json::Value,
        sections: BTreeMap<String, SectionContent>,
    ) -> Self {
        let now = Utc::now();
        let approvals = sections.keys().map(|k| (k.clone(), false)).collect();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            pipeline,
            source_topic: source_topic.into(),
            scope,
            input,
            sections,
            approvals,
            status: DraftStatus::Pending,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_approval(&self) -> bool {
        self.approvals.values().any(|approved| *approved)
    }

    pub fn is_approved(&self, section: &str) -> bool {
        self.approvals.get(section).copied().unwrap_or(false)
    }

    pub fn ensure_owner(&self, owner_id: &str) -> Result<(), AppError> {
        if self.owner_id == owner_id {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Draft {} not found", self.id)))
        }
    }

    // ── gate preconditions ──────────────────────────────────────────────────

    fn ensure_not_posted(&self) -> Result<(), AppError> {
        if self.status == DraftStatus::Posted {
            return Err(AppError::Precondition(format!(
                "Draft {} has been posted and can no longer change",
                self.id
            )));
        }
        Ok(())
    }

    fn ensure_generated(&self) -> Result<(), AppError> {
        self.ensure_not_posted()?;
        if self.status == DraftStatus::Pending {
            return Err(AppError::Precondition(format!(
                "Draft {} is still generating",
                self.id
            )));
        }
        Ok(())
    }

    fn ensure_section(&self, section: &str) -> Result<(), AppError> {
        if self.sections.contains_key(section) {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "Unknown section '{section}' for {} draft (expected one of: {})",
                self.pipeline,
                self.sections.keys().cloned().collect::<Vec<_>>().join(", ")
            )))
        }
    }

    /// Status after a gate mutation: any approval wins, then a standing rejection,
    /// then the outcome of the last generation. `pending` and `posted` are left alone.
    fn derive_status(&mut self) {
        if matches!(self.status, DraftStatus::Pending | DraftStatus::Posted) {
            return;
        }
        self.status = if self.has_approval() {
            DraftStatus::Approved
        } else if self.status == DraftStatus::Rejected {
            DraftStatus::Rejected
        } else if self.error.is_some() {
            DraftStatus::Error
        } else {
            DraftStatus::Generated
        };
    }

    // ── gate mutations ──────────────────────────────────────────────────────

    pub fn approve_section(&mut self, section: &str) -> Result<(), AppError> {
        self.ensure_generated()?;
        self.ensure_section(section)?;
        self.approvals.insert(section.to_string(), true);
        self.derive_status();
        Ok(())
    }

    pub fn reject_section(&mut self, section: &str) -> Result<(), AppError> {
        self.ensure_not_posted()?;
        self.ensure_section(section)?;
        self.approvals.insert(section.to_string(), false);
        self.derive_status();
        Ok(())
    }

    pub fn approve_all(&mut self) -> Result<(), AppError> {
        self.ensure_generated()?;
        self.approvals.values_mut().for_each(|v| *v = true);
        self.derive_status();
        Ok(())
    }

    pub fn reset_approvals(&mut self) -> Result<(), AppError> {
        self.ensure_not_posted()?;
        self.approvals.values_mut().for_each(|v| *v = false);
        if self.status == DraftStatus::Rejected {
            self.status = DraftStatus::Generated;
        }
        self.derive_status();
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), AppError> {
        self.ensure_generated()?;
        self.approvals.values_mut().for_each(|v| *v = false);
        self.status = DraftStatus::Rejected;
        Ok(())
    }

    pub fn mark_posted(&mut self) -> Result<(), AppError> {
        self.ensure_generated()?;
        if !self.has_approval() {
            return Err(AppError::Precondition(format!(
                "Draft {} has no approved sections to post",
                self.id
            )));
        }
        self.status = DraftStatus::Posted;
        Ok(())
    }

    // ── generation lifecycle ────────────────────────────────────────────────

    /// Moves a settled draft back to `pending`. Content and approvals are kept.
    pub fn begin_regeneration(&mut self) -> Result<(), AppError> {
        self.ensure_generated()?;
        self.status = DraftStatus::Pending;
        Ok(())
    }

    /// The single terminal write of a background generation. Only known section keys
    /// are replaced; approval flags are untouched. Posted drafts are never mutated.
    pub fn apply_generation(&mut self, outcome: GenerationOutcome) -> bool {
        if self.status == DraftStatus::Posted {
            return false;
        }
        for (name, content) in outcome.sections {
            if let Some(slot) = self.sections.get_mut(&name) {
                *slot = content;
            }
        }
        self.error = outcome.error;
        self.status = if self.error.is_some() {
            DraftStatus::Error
        } else {
            DraftStatus::Generated
        };
        self.derive_status();
        true
    }

    /// Projection of every approved section, in section-name order. Empty while the
    /// draft is `pending`: the stored content is about to be replaced.
    pub fn approved_sections(&self) -> Vec<ApprovedSection> {
        if self.status == DraftStatus::Pending {
            return Vec::new();
        }
        self.sections
            .iter()
            .filter(|(name, _)| self.is_approved(name))
            .map(|(name, content)| ApprovedSection {
                draft_id: self.id,
                pipeline: self.pipeline,
                source_topic: self.source_topic.clone(),
                scope: self.scope.clone(),
                section: name.clone(),
                content: content.clone(),
            })
            .collect()
    }

    pub fn approved_section(&self, section: &str) -> Result<ApprovedSection, AppError> {
        self.ensure_section(section)?;
        if self.status == DraftStatus::Pending {
            return Err(AppError::Precondition(format!(
                "Draft {} is still generating",
                self.id
            )));
        }
        self.approved_sections()
            .into_iter()
            .find(|s| s.section == section)
            .ok_or_else(|| {
                AppError::Precondition(format!("Section '{section}' has not been approved"))
            })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_placeholder_defaults() {
        let d = strategy_draft("u1");
        assert_eq!(d.status, DraftStatus::Pending);
        assert_eq!(d.approvals.len(), 5);
        assert!(d.approvals.values().all(|a| !a));
    }

    #[test]
    fn test_approve_on_pending_is_precondition_error() {
        let mut d = strategy_draft("u1");
        let err = d.approve_section("instagram").unwrap_err();
        assert!(matches!(err, AppError::Precondition(_)));
        assert_eq!(d.status, DraftStatus::Pending);
        assert!(!d.is_approved("instagram"));
    }

    #[test]
    fn test_approve_twice_equals_once() {
        let mut once = generated(strategy_draft("u1"));
        once.approve_section("blog").unwrap();
        let mut twice = once.clone();
        twice.approve_section("blog").unwrap();
        assert_eq!(once.approvals, twice.approvals);
        assert_eq!(once.status, twice.status);
        assert_eq!(twice.status, DraftStatus::Approved);
    }

    #[test]
    fn test_unknown_section_is_validation_error() {
        let mut d = generated(strategy_draft("u1"));
        assert!(matches!(
            d.approve_section("tiktok"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_reset_approvals_clears_flags_and_status() {
        let mut d = generated(strategy_draft("u1"));
        d.approve_section("instagram").unwrap();
        d.approve_section("blog").unwrap();
        assert_eq!(d.status, DraftStatus::Approved);

        d.reset_approvals().unwrap();
        assert!(!d.is_approved("instagram"));
        assert!(!d.is_approved("blog"));
        assert_eq!(d.status, DraftStatus::Generated);
    }

    #[test]
    fn test_reject_last_section_falls_back_to_error_when_generation_failed() {
        let mut d = strategy_draft("u1");
        d.apply_generation(GenerationOutcome {
            sections: BTreeMap::new(),
            error: Some("quota".into()),
            model: None,
        });
        assert_eq!(d.status, DraftStatus::Error);
        d.approve_section("etsy").unwrap();
        assert_eq!(d.status, DraftStatus::Approved);
        d.reject_section("etsy").unwrap();
        assert_eq!(d.status, DraftStatus::Error);
    }

    #[test]
    fn test_reject_draft_clears_flags() {
        let mut d = generated(strategy_draft("u1"));
        d.approve_all().unwrap();
        d.reject().unwrap();
        assert_eq!(d.status, DraftStatus::Rejected);
        assert!(!d.has_approval());
    }

    #[test]
    fn test_approve_all_sets_every_flag() {
        let mut d = generated(strategy_draft("u1"));
        d.approve_all().unwrap();
        assert!(d.approvals.values().all(|a| *a));
        assert_eq!(d.approved_sections().len(), 5);
    }

    #[test]
    fn test_posted_rejects_every_mutation() {
        let mut d = generated(strategy_draft("u1"));
        d.approve_section("blog").unwrap();
        d.mark_posted().unwrap();

        assert!(matches!(d.approve_section("ebook"), Err(AppError::Precondition(_))));
        assert!(matches!(d.reject_section("blog"), Err(AppError::Precondition(_))));
        assert!(matches!(d.reset_approvals(), Err(AppError::Precondition(_))));
        assert!(matches!(d.reject(), Err(AppError::Precondition(_))));
        assert!(matches!(d.begin_regeneration(), Err(AppError::Precondition(_))));
        assert!(!d.apply_generation(GenerationOutcome {
            sections: BTreeMap::new(),
            error: None,
            model: None
        }));
        assert_eq!(d.status, DraftStatus::Posted);
    }

    #[test]
    fn test_mark_posted_requires_approval() {
        let mut d = generated(strategy_draft("u1"));
        assert!(matches!(d.mark_posted(), Err(AppError::Precondition(_))));
    }

    #[test]
    fn test_regeneration_keeps_approvals() {
        let mut d = generated(strategy_draft("u1"));
        d.approve_section("blog").unwrap();
        d.begin_regeneration().unwrap();
        assert_eq!(d.status, DraftStatus::Pending);

        let mut sections = BTreeMap::new();
        sections.insert("blog".to_string(), SectionContent::text("fresh blog"));
        sections.insert("tiktok".to_string(), SectionContent::text("ignored"));
        d.apply_generation(GenerationOutcome {
            sections,
            error: None,
            model: Some("m2".into()),
        });

        assert!(d.is_approved("blog"));
        assert_eq!(d.status, DraftStatus::Approved);
        assert_eq!(d.sections["blog"], SectionContent::text("fresh blog"));
        assert!(!d.sections.contains_key("tiktok"));
    }

    #[test]
    fn test_approved_section_requires_flag() {
        let mut d = generated(strategy_draft("u1"));
        assert!(matches!(
            d.approved_section("blog"),
            Err(AppError::Precondition(_))
        ));
        d.approve_section("blog").unwrap();
        let s = d.approved_section("blog").unwrap();
        assert_eq!(s.source_topic, "morning calm routine");
        assert_eq!(s.scope.as_deref(), Some("2026-W04"));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for s in ["pending", "generated", "error", "approved", "rejected", "posted"] {
            assert_eq!(s.parse::<DraftStatus>().unwrap().as_str(), s);
        }
        assert!("done".parse::<DraftStatus>().is_err());
    }
}
