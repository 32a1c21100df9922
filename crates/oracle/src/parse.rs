//! Turning the model's free-text reply into the three interpretation
//! sections.
//!
//! Structured replies are tried first: the whole text as JSON, then a fenced
//! code block, then the span from the first `{` to the last `}`. If none of
//! those yields an object with a summary, the text is split on blank lines.
//! The result always has three non-empty sections.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

pub const SUMMARY_PLACEHOLDER: &str = "The model did not provide a summary for this reading.";
pub const ANALYSIS_PLACEHOLDER: &str =
    "No detailed analysis was provided; read the judgment and the changing lines of the primary hexagram.";
pub const ADVICE_PLACEHOLDER: &str =
    "No specific advice was provided; reflect on the judgment before acting.";

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("valid regex")
});

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub summary: String,
    pub detailed_analysis: String,
    pub advice: String,
    /// `false` when the blank-line fallback was used.
    pub structured: bool,
}

#[derive(Debug, Deserialize)]
struct JsonReply {
    #[serde(default)]
    summary: Option<Value>,
    #[serde(default, alias = "detailedAnalysis", alias = "analysis")]
    detailed_analysis: Option<Value>,
    #[serde(default)]
    advice: Option<Value>,
}

pub fn parse_reply(text: &str) -> ParsedReply {
    structured_reply(text).unwrap_or_else(|| sectioned_reply(text))
}

fn structured_reply(text: &str) -> Option<ParsedReply> {
    let trimmed = text.trim();
    let candidates = [
        Some(trimmed),
        FENCED_BLOCK
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str()),
        brace_span(trimmed),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|candidate| serde_json::from_str::<JsonReply>(candidate).ok())
        .and_then(|reply| {
            let summary = reply.summary.as_ref().map(value_text).unwrap_or_default();
            if summary.is_empty() {
                return None;
            }
            Some(ParsedReply {
                summary,
                detailed_analysis: or_placeholder(
                    reply.detailed_analysis.as_ref().map(value_text),
                    ANALYSIS_PLACEHOLDER,
                ),
                advice: or_placeholder(reply.advice.as_ref().map(value_text), ADVICE_PLACEHOLDER),
                structured: true,
            })
        })
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Render a JSON field as prose. Lists become one item per line.
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

fn or_placeholder(text: Option<String>, placeholder: &str) -> String {
    text.filter(|t| !t.is_empty())
        .unwrap_or_else(|| placeholder.to_string())
}

/// Fallback: first paragraph is the summary, last is the advice, anything
/// between is the analysis. With two paragraphs the advice is missing.
fn sectioned_reply(text: &str) -> ParsedReply {
    let normalized = text.replace("\r\n", "\n");
    let paragraphs: Vec<&str> = BLANK_LINE
        .split(normalized.trim())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let (summary, analysis, advice) = match paragraphs.as_slice() {
        [] => (None, None, None),
        [only] => (Some(only.to_string()), None, None),
        [first, second] => (Some(first.to_string()), Some(second.to_string()), None),
        [first, middle @ .., last] => (
            Some(first.to_string()),
            Some(middle.join("\n\n")),
            Some(last.to_string()),
        ),
    };

    ParsedReply {
        summary: or_placeholder(summary, SUMMARY_PLACEHOLDER),
        detailed_analysis: or_placeholder(analysis, ANALYSIS_PLACEHOLDER),
        advice: or_placeholder(advice, ADVICE_PLACEHOLDER),
        structured: false,
    }
}
