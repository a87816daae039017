// Prompt templates for every pipeline.
// Placeholders are `{name}` and are filled with `llm_client::prompts::fill`.

/// Weekly plan. Replace `{knowledge}` and `{trends}`.
pub const WEEKLY_PLAN_PROMPT: &str = r#"Your mission is to suggest a 7-day social media marketing plan based on the knowledge base and current market trends.

Knowledge Base Context:
{knowledge}

Current Market Trends:
{trends}

Generate a 7-day plan. For each day, provide:
- Day Number (1-7)
- Topic (e.g., "The Power of Mindfulness in Meltdowns")
- Format (Blog, Tweet, Carousel, Reel, Flyer, IG Caption, Viral Hooks)
- Hook (a scroll-stopping opening)
- Rationale (why this topic now, based on context and trends)

Format the output as a JSON array of objects. Use EXACTLY these keys: "day", "topic", "format", "hook", "rationale".
Example:
[
  { "day": 1, "topic": "...", "format": "...", "hook": "...", "rationale": "..." }
]

Return ONLY the JSON array."#;

/// Weekly content strategy. Replace `{topic}`, `{hook}` and `{week}`.
pub const STRATEGY_PROMPT: &str = r#"Build the complete content strategy for week {week} around this topic:

TOPIC: {topic}
ANGLE: {hook}

Return ONE JSON object with EXACTLY these keys:
{
  "instagramContent": [
    { "day": "monday", "type": "reel|carousel|story|post", "title": "...", "caption": "...", "hook": "...", "hashtags": ["..."], "goal": "reach|engagement|conversion" }
  ],
  "blogPost": { "title": "...", "outline": ["..."], "seoKeywords": ["..."], "targetWordCount": 2500, "leadMagnet": "..." },
  "ebookChapter": { "chapterNumber": 3, "title": "...", "outline": ["..."], "worksheets": ["..."] },
  "etsyProducts": [
    { "name": "...", "type": "printable", "description": "...", "price": 4.99, "seoTags": ["..."] }
  ],
  "affiliateProducts": [
    { "productName": "...", "link": "https://...", "platform": "amazon|bol.com|etsy_affiliate", "mentionIn": ["blog"] }
  ]
}

RULES:
1. Exactly 7 Instagram posts, Monday through Sunday. Sunday promotes the parent-child yoga class.
2. The blog outline has 8-10 sections; the ebook chapter has 6-8 sections and 2-3 worksheets.
3. Exactly 3 Etsy products priced between 2.99 and 14.99 EUR, each with 8-13 SEO tags.
4. 3-4 affiliate products, each mentioned in at least one other asset.
5. Hashtags mix Dutch and English."#;

/// Content lab, three LinkedIn variants. Replace `{topic}` and `{source}`.
pub const CONTENT_LAB_PROMPT: &str = r#"You are a LinkedIn content strategist. Create 3 different post variations about this trending topic:

## TOPIC: {topic}
{source}

---

Generate 3 distinct LinkedIn posts in this EXACT JSON format:
{
  "technicalDraft": "<A 'Technical Deep Dive' post. Code-focused, shows expertise. Use bullet points for key technical insights. ~800-1000 characters>",
  "strategicDraft": "<A 'Strategic Insight' post. Business/marketing angle. Focus on automation, AI trends, industry impact. ~800-1000 characters>",
  "networkingDraft": "<A 'Networking Hook' post. Casual, conversational. Asks a question to spark discussion. ~500-700 characters>"
}

RULES FOR ALL POSTS:
1. Start with a powerful hook (first line = everything on LinkedIn)
2. Use line breaks liberally (1-2 sentences per paragraph)
3. End with a question or call-to-action
4. Include 3-5 relevant hashtags at the end"#;

/// Single LinkedIn post. Replace `{topic}` and `{style}`.
pub const LINKEDIN_PROMPT: &str = r#"Write a viral LinkedIn post about: {topic}

STYLE: {style}

RULES:
1. Start with a powerful hook (first line is EVERYTHING on LinkedIn)
2. Keep paragraphs to 1-2 lines max
3. Use line breaks liberally
4. End with a question or call-to-action
5. Include 3-5 relevant hashtags at the end
6. Total length: 1200-1500 characters

Write the post now:"#;

pub const LINKEDIN_STYLE_THOUGHT_LEADERSHIP: &str = "Write as a seasoned professional sharing insights. Be bold, offer unique perspectives. Use line breaks for readability.";
pub const LINKEDIN_STYLE_STORY: &str = "Tell a personal story with a clear lesson. Start with a hook, build tension, deliver the insight.";
pub const LINKEDIN_STYLE_TIPS: &str =
    "Share 5-7 actionable tips. Use emojis as bullet points. Keep each tip to 1-2 lines.";
pub const LINKEDIN_STYLE_CONTROVERSIAL: &str = "Take a strong stance on a debatable topic. Challenge conventional wisdom. Invite discussion.";

/// System instruction for resume tailoring.
pub const JOB_HUNTER_SYSTEM: &str = r#"You are an elite technical recruiter and forensic resume analyst. Re-engineer the candidate's base resume to align with a specific job description.

HARD RULES:
1. NO HALLUCINATIONS: do not invent skills, job titles, or companies.
2. NO NEW DATES: never change employment dates to hide gaps.
3. STRATEGIC REFRAMING: generic titles may become functional titles only if the experience supports it.

STYLE:
- Banned words: "Delve", "Tapestry", "Landscape", "Fostered", "Spearheaded", "Honed", "Passionate", "Crucial", "Meticulous".
- Prefer verbs such as "Architected", "Deployed", "Engineered", "Reduced", "Accelerated", "Orchestrated", "Revamped".
- Tone: professional, authoritative, result-oriented."#;

/// Resume tailoring. Replace `{job_description}` and `{master_resume}`.
pub const JOB_HUNTER_PROMPT: &str = r#"### JOB DESCRIPTION (TARGET):
{job_description}

### CANDIDATE'S BASE RESUME:
{master_resume}

### EXECUTION STEPS
1. Identify the top 3 technical or business problems mentioned or implied in the JD.
2. Scan the base resume for any experience that solves those problems.
3. Rewrite the resume bullets to focus on those matching experiences.
4. Mirror the exact keywords from the JD for ATS matching.

### REQUIRED OUTPUT FORMAT (JSON ONLY)
{
  "matchScore": <integer 0-100>,
  "gapAnalysis": "<what is missing and which changes were made>",
  "missingSkills": ["skill1", "skill2"],
  "tailoredSummary": "<3 sentences: identity, relevant win, how you solve their pain point>",
  "tailoredResume": "<full markdown resume>",
  "dmDraft": "<max 280 chars recruiter DM>",
  "coverLetter": "<3 paragraphs, peer-to-peer expert tone>",
  "identifiedPainPoints": ["..."],
  "keyChangesLog": ["..."]
}"#;
