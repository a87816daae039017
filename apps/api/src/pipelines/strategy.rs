//! Weekly content strategy: seven Instagram posts, a blog outline, an ebook chapter,
//! Etsy listings and affiliate placements around one topic.
//!
//! Sections the model leaves out are filled from the built-in template; the same
//! template is the fallback when generation fails.

use serde::Deserialize;

use crate::drafts::content::{
    AffiliateProduct, BlogPost, Complete, EbookChapter, EtsyProduct, InstagramPost,
    SectionContent,
};
use crate::drafts::parser::{self, ParseError};
use crate::llm_client::prompts::{fill, BRAND_VOICE};
use crate::llm_client::{GenerationOutput, GenerationRequest};
use crate::pipelines::prompts::STRATEGY_PROMPT;
use crate::pipelines::{
    current_iso_week, expect_text, wrong_input, FailureNotice, Pipeline, PipelineInput,
    PipelineKind, Sections,
};

const SECTIONS: &[&str] = &["instagram", "blog", "ebook", "etsy", "affiliates"];
const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

pub struct StrategyPipeline {
    models: Vec<String>,
}

impl StrategyPipeline {
    pub fn new(models: Vec<String>) -> Self {
        Self { models }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StrategyResponse {
    #[serde(
        alias = "instagramContent",
        alias = "instagram_content",
        alias = "instagramPosts",
        alias = "instagram"
    )]
    instagram_posts: Option<Vec<InstagramPost>>,
    #[serde(alias = "blogPost", alias = "blog")]
    blog_post: Option<BlogPost>,
    #[serde(alias = "ebookChapter", alias = "ebook")]
    ebook_chapter: Option<EbookChapter>,
    #[serde(alias = "etsyProducts", alias = "etsy")]
    etsy_products: Option<Vec<EtsyProduct>>,
    #[serde(alias = "affiliateProducts", alias = "affiliates")]
    affiliate_products: Option<Vec<AffiliateProduct>>,
}

impl StrategyResponse {
    fn is_empty(&self) -> bool {
        self.instagram_posts.as_ref().map_or(true, Vec::is_empty)
            && self.blog_post.is_none()
            && self.ebook_chapter.is_none()
            && self.etsy_products.as_ref().map_or(true, Vec::is_empty)
            && self.affiliate_products.as_ref().map_or(true, Vec::is_empty)
    }
}

fn topic_of(input: &PipelineInput) -> &str {
    match input {
        PipelineInput::Strategy { topic, .. } => topic.trim(),
        _ => "",
    }
}

/// Present, non-empty list or the template's.
fn non_empty<T>(value: Option<Vec<T>>, template: Vec<T>) -> Vec<T> {
    value.filter(|v| !v.is_empty()).unwrap_or(template)
}

fn sections_from(
    mut instagram: Vec<InstagramPost>,
    mut blog: BlogPost,
    mut ebook: EbookChapter,
    mut etsy: Vec<EtsyProduct>,
    mut affiliates: Vec<AffiliateProduct>,
) -> Sections {
    for (i, post) in instagram.iter_mut().enumerate() {
        if post.day.trim().is_empty() {
            post.day = WEEKDAYS[i % WEEKDAYS.len()].to_string();
        }
    }
    instagram.complete();
    blog.complete();
    ebook.complete();
    etsy.complete();
    affiliates.complete();

    Sections::from([
        ("instagram".to_string(), SectionContent::InstagramPosts(instagram)),
        ("blog".to_string(), SectionContent::BlogPost(blog)),
        ("ebook".to_string(), SectionContent::EbookChapter(ebook)),
        ("etsy".to_string(), SectionContent::EtsyProducts(etsy)),
        ("affiliates".to_string(), SectionContent::AffiliateProducts(affiliates)),
    ])
}

impl Pipeline for StrategyPipeline {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Strategy
    }

    fn sections(&self) -> &'static [&'static str] {
        SECTIONS
    }

    fn models(&self) -> &[String] {
        &self.models
    }

    fn request(&self, input: &PipelineInput) -> GenerationRequest {
        let (topic, hook, week) = match input {
            PipelineInput::Strategy {
                topic,
                hook,
                week_of,
            } => (
                topic.trim().to_string(),
                hook.clone().unwrap_or_else(|| "practical, calm, doable".into()),
                week_of.clone().unwrap_or_else(current_iso_week),
            ),
            _ => Default::default(),
        };
        let prompt = fill(
            STRATEGY_PROMPT,
            &[
                ("topic", topic.as_str()),
                ("hook", hook.as_str()),
                ("week", week.as_str()),
            ],
        );
        GenerationRequest::json(prompt)
            .with_system(BRAND_VOICE)
            .with_temperature(0.8)
            .with_max_output_tokens(8192)
    }

    fn parse(&self, input: &PipelineInput, output: GenerationOutput) -> Result<Sections, ParseError> {
        if input.kind() != self.kind() {
            return Err(wrong_input(self.kind()));
        }
        let raw = expect_text(output)?;
        let value = parser::parse_json_value(&raw)?;
        let response: StrategyResponse = serde_json::from_value(value)
            .map_err(|e| ParseError::UnparsableResponse(format!("unexpected strategy shape: {e}")))?;
        if response.is_empty() {
            return Err(ParseError::UnparsableResponse(
                "strategy response has none of the expected sections".into(),
            ));
        }

        let t = Template::new(topic_of(input));
        Ok(sections_from(
            non_empty(response.instagram_posts, t.instagram()),
            response.blog_post.unwrap_or_else(|| t.blog()),
            response.ebook_chapter.unwrap_or_else(|| t.ebook()),
            non_empty(response.etsy_products, t.etsy()),
            non_empty(response.affiliate_products, t.affiliates()),
        ))
    }

    fn fallback(&self, input: &PipelineInput, _failure: &FailureNotice) -> Sections {
        let t = Template::new(topic_of(input));
        sections_from(t.instagram(), t.blog(), t.ebook(), t.etsy(), t.affiliates())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Template
// ────────────────────────────────────────────────────────────────────────────

struct Template<'a> {
    topic: &'a str,
}

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl<'a> Template<'a> {
    fn new(topic: &'a str) -> Self {
        let topic = if topic.is_empty() { "Mindful Mornings" } else { topic };
        Self { topic }
    }

    fn post(day: &str, kind: &str, title: String, caption: String, hook: &str, hashtags: &[&str], goal: &str) -> InstagramPost {
        InstagramPost {
            day: day.into(),
            post_type: kind.into(),
            title,
            caption,
            hook: hook.into(),
            hashtags: tags(hashtags),
            goal: goal.into(),
        }
    }

    fn instagram(&self) -> Vec<InstagramPost> {
        let topic = self.topic;
        vec![
            Self::post(
                "monday",
                "reel",
                format!("Transform Your Mornings: {topic}"),
                "Your mornings don't have to be chaos. Try this 5-minute routine and watch what happens ✨\n\nSave this for tomorrow morning!".into(),
                "Your kid is crying, you're late... here's what actually works 👇",
                &["morningroutine", "peutersochtends", "calmkids", "gentleparenting", "mindfulness"],
                "reach",
            ),
            Self::post(
                "tuesday",
                "carousel",
                "Step-by-Step: Complete Guide".into(),
                format!("Here's exactly how to implement {topic} 📋\n\nSlide to see all 10 steps!\n\nWhich step will you try first? Comment below 👇"),
                "Save this before your next hectic morning",
                &["parentinghacks", "montessorimornings", "toddlerlife", "mindfulopvoeden"],
                "engagement",
            ),
            Self::post(
                "wednesday",
                "story",
                "Behind the Scenes".into(),
                "Watch me try this with my own kids! Real, unfiltered morning chaos → calm ✨\n\nSwipe up for the FREE printable checklist".into(),
                "No filter, just a real Wednesday morning",
                &["realparenting", "parentingreel", "morningvibes", "authenticparenting"],
                "engagement",
            ),
            Self::post(
                "thursday",
                "reel",
                "Common Mistakes to Avoid".into(),
                "❌ STOP doing these 3 things during your morning routine!\n\nI made ALL these mistakes... so you don't have to 🙏".into(),
                "Mistake #2 surprised me the most",
                &["parentingmistakes", "parentingtips", "morningroutine", "mindfulparenting"],
                "reach",
            ),
            Self::post(
                "friday",
                "carousel",
                "Success Stories from Real Parents".into(),
                "💬 \"We tried this routine for 7 days and our mornings are SO much calmer!\"\n\n📸 Share YOUR results and tag me for a feature".into(),
                "Seven days, one calmer household",
                &["successstory", "parentingwins", "morningroutine", "beforeafter"],
                "engagement",
            ),
            Self::post(
                "saturday",
                "post",
                "Weekend Bonus: Advanced Tips".into(),
                "🎯 Ready to level up? These 5 advanced techniques make your routine even smoother".into(),
                "For when the basic routine starts to feel easy",
                &["advancedparenting", "parentinghacks", "mindfulness", "parentinggoals"],
                "engagement",
            ),
            Self::post(
                "sunday",
                "post",
                "Join My Yoga Class - Special Offer".into(),
                "Want MORE calming techniques for your family?\n\n🧘‍♀️ Join the Parent-Child Yoga class in Amsterdam\n🎁 First class FREE with code CALM2026\n\nLink in bio to register!".into(),
                "Breathing, movement and connection, together",
                &["yogaclass", "amsterdamyoga", "familyyoga", "parentchildyoga", "themindfulnl"],
                "conversion",
            ),
        ]
    }

    fn blog(&self) -> BlogPost {
        BlogPost {
            title: format!(
                "The Science-Backed {}: A Complete Guide From a Dutch Mindfulness Expert",
                self.topic
            ),
            outline: tags(&[
                "Introduction: why mornings matter for your child's development",
                "The neuroscience behind morning routines",
                "The 5-minute routine explained step by step",
                "Age-specific adaptations (2-3 years vs 4-6 years)",
                "Common challenges and how to overcome them",
                "Real success stories from Dutch parents",
                "Printable morning routine chart (free download)",
                "How this connects to emotional intelligence",
                "FAQ: your questions answered",
                "Next steps: join our parent-child yoga class",
            ]),
            seo_keywords: tags(&[
                "morning routine toddlers",
                "calm kids morning",
                "peuter ochtend routine",
                "mindfulness kids Netherlands",
                "gentle parenting morning",
            ]),
            target_word_count: 2500,
            lead_magnet: "FREE Morning Routine Visual Chart (printable PDF)".into(),
        }
    }

    fn ebook(&self) -> EbookChapter {
        EbookChapter {
            chapter_number: 3,
            title: format!("Chapter 3: {}", self.topic),
            outline: tags(&[
                "Introduction: the morning routine challenge",
                "Scientific foundation: why routines work",
                "The complete 5-minute framework",
                "Worksheet 1: morning routine planner",
                "Troubleshooting guide",
                "Worksheet 2: success tracker",
                "Integration with yoga and mindfulness",
            ]),
            worksheets: tags(&[
                "Morning Routine Visual Chart",
                "Progress Tracker for 30 Days",
                "Breathing Exercises Reference Sheet",
            ]),
        }
    }

    fn etsy(&self) -> Vec<EtsyProduct> {
        vec![
            EtsyProduct {
                name: format!("{} - Complete Visual Chart Pack", self.topic),
                product_type: "printable".into(),
                description: "10-page printable pack: routine chart, blank template, reward stickers, progress tracker and breathing cards. For toddlers 2-6 years, Dutch and English versions.".into(),
                price: 4.99,
                seo_tags: tags(&["morning routine", "toddler chart", "printable", "visual schedule", "montessori printable", "calm kids", "peuter schema", "ochtend routine"]),
            },
            EtsyProduct {
                name: "30-Day Calm Kids Challenge - Complete Workbook".into(),
                product_type: "printable".into(),
                description: "Daily activities, progress trackers, breathing exercises, yoga poses for kids and parent reflection prompts. 45 pages.".into(),
                price: 9.99,
                seo_tags: tags(&["parenting challenge", "calm kids", "30 day challenge", "mindfulness workbook", "yoga for kids", "breathing exercises", "family activities", "nederlandstalig"]),
            },
            EtsyProduct {
                name: "Emotion Regulation Toolkit for Toddlers".into(),
                product_type: "printable".into(),
                description: "Emotion faces chart, calm-down corner setup guide, breathing games and morning/bedtime routines.".into(),
                price: 7.99,
                seo_tags: tags(&["emotion regulation", "toddler emotions", "calm down corner", "parenting printable", "mindfulness kids", "emotional intelligence", "gentle parenting", "printable chart"]),
            },
        ]
    }

    fn affiliates(&self) -> Vec<AffiliateProduct> {
        let product = |name: &str, link: &str, platform: &str, mention: &[&str]| AffiliateProduct {
            product_name: name.into(),
            link: link.into(),
            platform: platform.into(),
            mention_in: tags(mention),
        };
        vec![
            product(
                "Gro Clock - Sleep Trainer & Wake-Up Light for Kids",
                "https://amazon.nl/gro-clock",
                "amazon",
                &["blog", "instagram_monday_reel", "ebook_chapter_3"],
            ),
            product(
                "The Whole-Brain Child (Dutch Edition)",
                "https://bol.com/whole-brain-child-nl",
                "bol.com",
                &["blog", "email_newsletter"],
            ),
            product(
                "Mindfulness Breathing Ball for Kids",
                "https://amazon.nl/breathing-ball",
                "amazon",
                &["instagram_thursday_reel"],
            ),
            product(
                "Montessori Morning Routine Wooden Board",
                "https://etsy.com/montessori-morning-board",
                "etsy_affiliate",
                &["blog", "instagram_tuesday_carousel"],
            ),
        ]
    }
}
