// Cross-cutting prompt fragments and template filling.
// Each pipeline keeps its own templates in pipelines/prompts.rs.

/// System instruction for every JSON-mode pipeline.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Brand persona shared by the marketing pipelines.
pub const BRAND_VOICE: &str = "You are \"The Mindful NL\" AI marketing agent for a \
    mindfulness and parent-child yoga brand based in Amsterdam. Warm, practical, \
    evidence-informed. Never preachy.";

/// Appended to every image prompt so generated visuals stay on-brand.
pub const IMAGE_STYLE_SUFFIX: &str = "Style: soft natural light, warm beige and sage \
    palette, calm minimal composition, no text overlays.";

/// Replaces every `{key}` in `template` with its value. Unknown placeholders are left as-is.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}
