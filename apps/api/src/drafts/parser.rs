//! Response parser: fenced or chatty model output → typed payload.
//!
//! Order of attempts:
//! 1. strip markdown code fences and parse the remainder as JSON
//! 2. extract the first top-level `{...}` / `[...]` span and parse that
//! 3. give up with `ParseError::UnparsableResponse`
//!
//! Typed conversion goes through the lenient serde helpers below, then `Complete` fills
//! defaults, so callers get either a fully-populated value or an error.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::drafts::content::Complete;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Unparsable response: {0}")]
    UnparsableResponse(String),
}

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("valid regex"));

static SPAN_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\{\[]").expect("valid regex"));

static GREEDY_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}|\[.*\]").expect("valid regex"));

/// Returns the body of the first fenced block, or the trimmed input when there is none.
/// An unterminated opening fence is dropped.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(caps) = FENCED_BLOCK.captures(trimmed) {
        if let Some(body) = caps.get(1) {
            return body.as_str().trim();
        }
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        return rest.trim();
    }
    trimmed
}

/// First balanced `{...}` or `[...]` region, honouring JSON string escapes. Falls back to
/// the greedy first-open to last-close match when nothing balances.
pub fn extract_json_span(raw: &str) -> Option<&str> {
    for start in SPAN_START.find_iter(raw).map(|m| m.start()) {
        if let Some(end) = balanced_end(&raw[start..]) {
            return Some(&raw[start..start + end]);
        }
    }
    GREEDY_SPAN.find(raw).map(|m| m.as_str())
}

fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Untyped parse with the fence / span fallbacks.
pub fn parse_json_value(raw: &str) -> Result<Value, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::UnparsableResponse("empty response".into()));
    }

    let unfenced = strip_code_fences(raw);
    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return Ok(value);
    }

    let span = extract_json_span(unfenced)
        .or_else(|| extract_json_span(raw))
        .ok_or_else(|| {
            ParseError::UnparsableResponse(format!(
                "no JSON object or array found in response: {}",
                preview(raw)
            ))
        })?;

    serde_json::from_str::<Value>(span).map_err(|e| {
        ParseError::UnparsableResponse(format!("{e}. Raw: {}", preview(raw)))
    })
}

/// Typed parse: JSON value → `T` → defaults filled.
pub fn parse_structured<T>(raw: &str) -> Result<T, ParseError>
where
    T: DeserializeOwned + Complete,
{
    let value = parse_json_value(raw)?;
    from_value(value)
}

/// Typed conversion of an already-parsed value.
pub fn from_value<T>(value: Value) -> Result<T, ParseError>
where
    T: DeserializeOwned + Complete,
{
    let mut typed: T = serde_json::from_value(value)
        .map_err(|e| ParseError::UnparsableResponse(format!("unexpected shape: {e}")))?;
    typed.complete();
    Ok(typed)
}

fn preview(raw: &str) -> String {
    let cut: String = raw.chars().take(200).collect();
    if cut.len() < raw.len() {
        format!("{cut}...")
    } else {
        cut
    }
}

/// `deserialize_with` helpers that coerce whatever a model emitted into the target type.
pub mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Text of a value: null → "", numbers and bools stringified, arrays joined by newlines.
    pub fn value_text(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(items) => items
                .iter()
                .map(value_text)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            Value::Object(_) => value.to_string(),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(value_text(&Value::deserialize(d)?).trim().to_string())
    }

    pub fn u32_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let number = match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => numeric_prefix(&s).unwrap_or(0.0),
            _ => 0.0,
        };
        Ok(if number.is_finite() && number > 0.0 {
            number.round().min(u32::MAX as f64) as u32
        } else {
            0
        })
    }

    pub fn f64_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => numeric_prefix(&s).unwrap_or(0.0),
            _ => 0.0,
        })
    }

    /// Arrays as-is; a single string is split on commas and newlines.
    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let items = match Value::deserialize(d)? {
            Value::Array(items) => items.iter().map(value_text).collect(),
            Value::String(s) => s.split([',', '\n']).map(String::from).collect(),
            Value::Null => Vec::new(),
            other => vec![value_text(&other)],
        };
        Ok(items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    /// "€4.99" → 4.99, "Day 3" → 3.
    fn numeric_prefix(s: &str) -> Option<f64> {
        let digits: String = s
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        digits.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafts::content::{PlanDay, DEFAULT_RATIONALE};
    use serde_json::json;

    #[test]
    fn test_strip_code_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_code_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_code_fences_no_fences() {
        let input = "  {\"key\": \"value\"} ";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_fenced_parses_equal_to_unwrapped() {
        let inner = r#"{"topic":"X","days":[{"day":1}]}"#;
        let fenced = format!("```json\n{inner}\n```");
        assert_eq!(
            parse_json_value(&fenced).unwrap(),
            parse_json_value(inner).unwrap()
        );
    }

    #[test]
    fn test_chatty_response_uses_span_extraction() {
        let raw = "Sure! Here is the plan:\n[{\"day\": 1, \"topic\": \"Breathing {basics}\"}]\nEnjoy.";
        let value = parse_json_value(raw).unwrap();
        assert_eq!(value, json!([{"day": 1, "topic": "Breathing {basics}"}]));
    }

    #[test]
    fn test_span_extraction_skips_unbalanced_prefix() {
        let raw = "note: { broken\n{\"ok\": true}";
        assert_eq!(extract_json_span(raw), Some("{\"ok\": true}"));
        assert_eq!(parse_json_value(raw).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_no_brace_region_is_unparsable() {
        let err = parse_json_value("I cannot help with that.").unwrap_err();
        assert!(matches!(err, ParseError::UnparsableResponse(_)));
        assert!(parse_json_value("   ").is_err());
    }

    #[test]
    fn test_parse_structured_fills_defaults() {
        let day: PlanDay = parse_structured(r#"{"day": 2, "topic": "Calm"}"#).unwrap();
        assert_eq!(day.rationale, DEFAULT_RATIONALE);
        assert_eq!(day.format, "Blog");
    }

    #[test]
    fn test_parse_structured_rejects_wrong_shape() {
        let err = parse_structured::<PlanDay>("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ParseError::UnparsableResponse(_)));
    }

    #[test]
    fn test_lenient_string_list_splits_strings() {
        #[derive(serde::Deserialize)]
        struct Tags {
            #[serde(deserialize_with = "lenient::string_list")]
            tags: Vec<String>,
        }
        let t: Tags = serde_json::from_str(r#"{"tags": "a, b\nc,"}"#).unwrap();
        assert_eq!(t.tags, vec!["a", "b", "c"]);
    }
}
