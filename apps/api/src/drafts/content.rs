//! Typed section payloads.
//!
//! Every section of every pipeline holds exactly one `SectionContent` variant. The payload
//! structs accept the loose shapes models emit (camelCase or snake_case keys, a few known
//! typos, numbers as strings) and `Complete::complete` fills whatever is still empty with
//! the documented defaults, so a parsed value is always fully populated.

use serde::{Deserialize, Serialize};

use crate::drafts::parser::lenient::{f64_or_zero, string_list, text, u32_or_zero};

pub const DEFAULT_TOPIC: &str = "Untitled Topic";
pub const DEFAULT_FORMAT: &str = "Blog";
pub const DEFAULT_RATIONALE: &str = "Strategic alignment with recent trends.";
pub const DEFAULT_MATCH_SCORE: u32 = 50;
pub const DEFAULT_GAP_ANALYSIS: &str = "Analysis pending";

/// Fills empty fields with defaults after a lenient parse.
pub trait Complete {
    fn complete(&mut self);
}

impl<T: Complete> Complete for Vec<T> {
    fn complete(&mut self) {
        self.iter_mut().for_each(Complete::complete);
    }
}

fn or_default(field: &mut String, default: &str) {
    if field.trim().is_empty() {
        *field = default.to_string();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SectionContent
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SectionContent {
    Text(String),
    PlanDays(Vec<PlanDay>),
    InstagramPosts(Vec<InstagramPost>),
    BlogPost(BlogPost),
    EbookChapter(EbookChapter),
    EtsyProducts(Vec<EtsyProduct>),
    AffiliateProducts(Vec<AffiliateProduct>),
    JobAnalysis(JobAnalysis),
    Image(ImageAsset),
}

impl SectionContent {
    pub fn text(value: impl Into<String>) -> Self {
        SectionContent::Text(value.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SectionContent::Text(_) => "text",
            SectionContent::PlanDays(_) => "plan_days",
            SectionContent::InstagramPosts(_) => "instagram_posts",
            SectionContent::BlogPost(_) => "blog_post",
            SectionContent::EbookChapter(_) => "ebook_chapter",
            SectionContent::EtsyProducts(_) => "etsy_products",
            SectionContent::AffiliateProducts(_) => "affiliate_products",
            SectionContent::JobAnalysis(_) => "job_analysis",
            SectionContent::Image(_) => "image",
        }
    }

    /// First title-like field, used to name exported designs and documents.
    pub fn headline(&self) -> Option<String> {
        let headline = match self {
            SectionContent::Text(t) => t.lines().find(|l| !l.trim().is_empty())?.trim().to_string(),
            SectionContent::PlanDays(days) => days.first()?.topic.clone(),
            SectionContent::InstagramPosts(posts) => posts.first()?.title.clone(),
            SectionContent::BlogPost(post) => post.title.clone(),
            SectionContent::EbookChapter(ch) => ch.title.clone(),
            SectionContent::EtsyProducts(products) => products.first()?.name.clone(),
            SectionContent::AffiliateProducts(products) => products.first()?.product_name.clone(),
            SectionContent::JobAnalysis(a) => format!("Match score {}", a.match_score),
            SectionContent::Image(img) => img.prompt.clone(),
        };
        (!headline.trim().is_empty()).then_some(headline)
    }

    /// Human-readable rendering. Never empty.
    pub fn render(&self) -> String {
        let rendered = match self {
            SectionContent::Text(t) => t.trim().to_string(),
            SectionContent::PlanDays(days) => days
                .iter()
                .map(|d| {
                    format!(
                        "Day {}: {} [{}]\nHook: {}\nWhy: {}",
                        d.day, d.topic, d.format, d.hook, d.rationale
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            SectionContent::InstagramPosts(posts) => posts
                .iter()
                .map(|p| {
                    let tags = p
                        .hashtags
                        .iter()
                        .map(|t| format!("#{}", t.trim_start_matches('#')))
                        .collect::<Vec<_>>()
                        .join(" ");
                    format!(
                        "{} ({}): {}\n{}\n{}",
                        p.day, p.post_type, p.title, p.caption, tags
                    )
                    .trim_end()
                    .to_string()
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            SectionContent::BlogPost(post) => format!(
                "{}\n\n{}\n\nKeywords: {}\nTarget length: {} words\nLead magnet: {}",
                post.title,
                bullets(&post.outline),
                post.seo_keywords.join(", "),
                post.target_word_count,
                post.lead_magnet
            ),
            SectionContent::EbookChapter(ch) => format!(
                "Chapter {}: {}\n\n{}\n\nWorksheets:\n{}",
                ch.chapter_number,
                ch.title,
                bullets(&ch.outline),
                bullets(&ch.worksheets)
            ),
            SectionContent::EtsyProducts(products) => products
                .iter()
                .map(|p| {
                    format!(
                        "{} ({}, €{:.2})\n{}\nTags: {}",
                        p.name,
                        p.product_type,
                        p.price,
                        p.description,
                        p.seo_tags.join(", ")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            SectionContent::AffiliateProducts(products) => products
                .iter()
                .map(|p| {
                    format!(
                        "{} ({}): {}\nMention in: {}",
                        p.product_name,
                        p.platform,
                        p.link,
                        p.mention_in.join(", ")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            SectionContent::JobAnalysis(a) => format!(
                "Match score: {}/100\n\n{}\n\nMissing skills:\n{}\n\nPain points:\n{}",
                a.match_score,
                a.gap_analysis,
                bullets(&a.missing_skills),
                bullets(&a.pain_points)
            ),
            SectionContent::Image(img) => format!("Image: {}\n{}", img.prompt, img.url),
        };

        if rendered.trim().is_empty() {
            format!("(empty {})", self.kind())
        } else {
            rendered
        }
    }
}

impl Complete for SectionContent {
    fn complete(&mut self) {
        match self {
            SectionContent::Text(_) => {}
            SectionContent::PlanDays(days) => {
                for (i, day) in days.iter_mut().enumerate() {
                    day.complete();
                    if day.day == 0 {
                        day.day = i as u32 + 1;
                    }
                }
            }
            SectionContent::InstagramPosts(posts) => posts.complete(),
            SectionContent::BlogPost(post) => post.complete(),
            SectionContent::EbookChapter(ch) => ch.complete(),
            SectionContent::EtsyProducts(products) => products.complete(),
            SectionContent::AffiliateProducts(products) => products.complete(),
            SectionContent::JobAnalysis(a) => a.complete(),
            SectionContent::Image(_) => {}
        }
    }
}

fn bullets(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none)".to_string();
    }
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ────────────────────────────────────────────────────────────────────────────
// Payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanDay {
    #[serde(deserialize_with = "u32_or_zero", alias = "dayNumber", alias = "day_number")]
    pub day: u32,
    #[serde(deserialize_with = "text", alias = "title")]
    pub topic: String,
    #[serde(deserialize_with = "text")]
    pub format: String,
    #[serde(deserialize_with = "text")]
    pub hook: String,
    #[serde(deserialize_with = "text", alias = "ration", alias = "reason")]
    pub rationale: String,
}

impl Complete for PlanDay {
    fn complete(&mut self) {
        or_default(&mut self.topic, DEFAULT_TOPIC);
        or_default(&mut self.format, DEFAULT_FORMAT);
        or_default(&mut self.rationale, DEFAULT_RATIONALE);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstagramPost {
    #[serde(deserialize_with = "text")]
    pub day: String,
    #[serde(
        rename = "type",
        deserialize_with = "text",
        alias = "postType",
        alias = "post_type",
        alias = "format"
    )]
    pub post_type: String,
    #[serde(deserialize_with = "text")]
    pub title: String,
    #[serde(deserialize_with = "text")]
    pub caption: String,
    #[serde(deserialize_with = "text")]
    pub hook: String,
    #[serde(deserialize_with = "string_list", alias = "tags")]
    pub hashtags: Vec<String>,
    #[serde(deserialize_with = "text")]
    pub goal: String,
}

impl Complete for InstagramPost {
    fn complete(&mut self) {
        or_default(&mut self.post_type, "post");
        or_default(&mut self.title, "Untitled Post");
        let fallback_caption = self.title.clone();
        or_default(&mut self.caption, &fallback_caption);
        or_default(&mut self.goal, "engagement");
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogPost {
    #[serde(deserialize_with = "text")]
    pub title: String,
    #[serde(deserialize_with = "string_list", alias = "sections")]
    pub outline: Vec<String>,
    #[serde(deserialize_with = "string_list", alias = "seoKeywords", alias = "keywords")]
    pub seo_keywords: Vec<String>,
    #[serde(deserialize_with = "u32_or_zero", alias = "targetWordCount", alias = "wordCount")]
    pub target_word_count: u32,
    #[serde(deserialize_with = "text", alias = "leadMagnet")]
    pub lead_magnet: String,
}

impl Complete for BlogPost {
    fn complete(&mut self) {
        or_default(&mut self.title, DEFAULT_TOPIC);
        if self.target_word_count == 0 {
            self.target_word_count = 1500;
        }
        or_default(&mut self.lead_magnet, "Free printable checklist");
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EbookChapter {
    #[serde(deserialize_with = "u32_or_zero", alias = "chapterNumber", alias = "chapter")]
    pub chapter_number: u32,
    #[serde(deserialize_with = "text")]
    pub title: String,
    #[serde(deserialize_with = "string_list", alias = "sections")]
    pub outline: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    pub worksheets: Vec<String>,
}

impl Complete for EbookChapter {
    fn complete(&mut self) {
        if self.chapter_number == 0 {
            self.chapter_number = 1;
        }
        or_default(&mut self.title, DEFAULT_TOPIC);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtsyProduct {
    #[serde(deserialize_with = "text", alias = "title", alias = "productName")]
    pub name: String,
    #[serde(
        rename = "type",
        deserialize_with = "text",
        alias = "productType",
        alias = "product_type"
    )]
    pub product_type: String,
    #[serde(deserialize_with = "text")]
    pub description: String,
    #[serde(deserialize_with = "f64_or_zero")]
    pub price: f64,
    #[serde(deserialize_with = "string_list", alias = "seoTags", alias = "tags")]
    pub seo_tags: Vec<String>,
}

impl Complete for EtsyProduct {
    fn complete(&mut self) {
        or_default(&mut self.name, "Untitled Product");
        or_default(&mut self.product_type, "printable");
        let fallback = self.name.clone();
        or_default(&mut self.description, &fallback);
        if !self.price.is_finite() || self.price < 0.0 {
            self.price = 0.0;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffiliateProduct {
    #[serde(deserialize_with = "text", alias = "productName", alias = "name")]
    pub product_name: String,
    #[serde(deserialize_with = "text", alias = "url")]
    pub link: String,
    #[serde(deserialize_with = "text")]
    pub platform: String,
    #[serde(deserialize_with = "string_list", alias = "mentionIn")]
    pub mention_in: Vec<String>,
}

impl Complete for AffiliateProduct {
    fn complete(&mut self) {
        or_default(&mut self.product_name, "Untitled Product");
        or_default(&mut self.platform, "amazon");
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobAnalysis {
    #[serde(deserialize_with = "u32_or_zero", alias = "matchScore")]
    pub match_score: u32,
    #[serde(deserialize_with = "text", alias = "gapAnalysis")]
    pub gap_analysis: String,
    #[serde(deserialize_with = "string_list", alias = "missingSkills")]
    pub missing_skills: Vec<String>,
    #[serde(
        deserialize_with = "string_list",
        alias = "identifiedPainPoints",
        alias = "identified_pain_points",
        alias = "painPoints"
    )]
    pub pain_points: Vec<String>,
    #[serde(deserialize_with = "string_list", alias = "keyChangesLog", alias = "key_changes_log")]
    pub key_changes: Vec<String>,
}

impl Complete for JobAnalysis {
    fn complete(&mut self) {
        if self.match_score == 0 {
            self.match_score = DEFAULT_MATCH_SCORE;
        }
        self.match_score = self.match_score.min(100);
        or_default(&mut self.gap_analysis, DEFAULT_GAP_ANALYSIS);
    }
}

/// A generated (or placeholder) visual. `url` is a `data:` URL for generated bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub url: String,
    pub mime_type: String,
    pub prompt: String,
    pub placeholder: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_day_accepts_ration_alias() {
        let day: PlanDay = serde_json::from_str(
            r#"{"day":1,"topic":"A","format":"Blog","hook":"H","ration":"R"}"#,
        )
        .unwrap();
        assert_eq!(day.rationale, "R");
    }

    #[test]
    fn test_plan_day_defaults_after_complete() {
        let mut day: PlanDay = serde_json::from_str(r#"{"day":"3","topic":null}"#).unwrap();
        day.complete();
        assert_eq!(day.day, 3);
        assert_eq!(day.topic, DEFAULT_TOPIC);
        assert_eq!(day.format, DEFAULT_FORMAT);
        assert_eq!(day.hook, "");
        assert_eq!(day.rationale, DEFAULT_RATIONALE);
    }

    #[test]
    fn test_plan_days_fill_missing_day_numbers_by_position() {
        let mut content = SectionContent::PlanDays(vec![PlanDay::default(), PlanDay::default()]);
        content.complete();
        let SectionContent::PlanDays(days) = content else {
            panic!("variant changed")
        };
        assert_eq!(days[0].day, 1);
        assert_eq!(days[1].day, 2);
    }

    #[test]
    fn test_camel_case_keys_accepted() {
        let mut product: EtsyProduct = serde_json::from_str(
            r#"{"name":"Chart","productType":"digital","price":"€4.99","seoTags":"a, b"}"#,
        )
        .unwrap();
        product.complete();
        assert_eq!(product.product_type, "digital");
        assert!((product.price - 4.99).abs() < 1e-9);
        assert_eq!(product.seo_tags, vec!["a", "b"]);
        assert_eq!(product.description, "Chart");
    }

    #[test]
    fn test_job_analysis_defaults() {
        let mut analysis: JobAnalysis = serde_json::from_str(r#"{"matchScore":0}"#).unwrap();
        analysis.complete();
        assert_eq!(analysis.match_score, DEFAULT_MATCH_SCORE);
        assert_eq!(analysis.gap_analysis, DEFAULT_GAP_ANALYSIS);
    }

    #[test]
    fn test_section_content_is_adjacently_tagged() {
        let content = SectionContent::text("hello");
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "text", "value": "hello"}));
        let back: SectionContent = serde_json::from_value(json).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn test_render_never_empty() {
        let samples = vec![
            SectionContent::text(""),
            SectionContent::PlanDays(vec![]),
            SectionContent::InstagramPosts(vec![]),
            SectionContent::BlogPost(BlogPost::default()),
            SectionContent::EbookChapter(EbookChapter::default()),
            SectionContent::EtsyProducts(vec![]),
            SectionContent::AffiliateProducts(vec![]),
            SectionContent::JobAnalysis(JobAnalysis::default()),
            SectionContent::Image(ImageAsset::default()),
        ];
        for s in samples {
            assert!(!s.render().trim().is_empty(), "{} rendered empty", s.kind());
        }
    }

    #[test]
    fn test_headline_uses_first_item() {
        let posts = SectionContent::InstagramPosts(vec![
            InstagramPost {
                title: "First".into(),
                ..Default::default()
            },
            InstagramPost {
                title: "Second".into(),
                ..Default::default()
            },
        ]);
        assert_eq!(posts.headline().as_deref(), Some("First"));
        assert_eq!(SectionContent::EtsyProducts(vec![]).headline(), None);
    }
}
