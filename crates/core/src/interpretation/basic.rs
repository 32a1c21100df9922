//! Rule-based short readings per life domain.
//!
//! Career, relationships and wealth prefer authentic text: the six line
//! texts are scanned for domain keywords and the first matching line's
//! translation is used. Only when nothing matches is a sentence synthesised
//! from the hexagram name and its fortune tag. Health is always templated
//! from the body-part metadata.

use serde::{Deserialize, Serialize};

use crate::hexagram::{Fortune, HexagramRef, TextPair};

// ---------------------------------------------------------------------------
// Keyword sets
// ---------------------------------------------------------------------------

/// Office, rank and advancement.
pub const CAREER_KEYWORDS: &[&str] = &[
    "官", "仕", "王", "君", "位", "进", "career", "office", "official", "promotion", "advance",
    "ruler",
];

/// Marriage, family and companionship.
pub const RELATIONSHIP_KEYWORDS: &[&str] = &[
    "婚", "媾", "妻", "夫", "友", "朋", "家", "marriage", "wife", "husband", "friend",
    "companion", "family",
];

/// Riches, goods and income.
pub const WEALTH_KEYWORDS: &[&str] = &[
    "财", "富", "贝", "资", "货", "禄", "wealth", "riches", "rich", "money", "goods",
];

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInterpretation {
    pub overall: String,
    pub career: String,
    pub relationships: String,
    pub health: String,
    pub wealth: String,
}

/// Build the five short readings for one hexagram.
pub fn basic_interpretation(hexagram: &HexagramRef) -> BasicInterpretation {
    BasicInterpretation {
        overall: overall_reading(hexagram),
        career: keyword_reading(hexagram, CAREER_KEYWORDS)
            .unwrap_or_else(|| career_template(hexagram)),
        relationships: keyword_reading(hexagram, RELATIONSHIP_KEYWORDS)
            .unwrap_or_else(|| relationships_template(hexagram)),
        health: health_reading(hexagram),
        wealth: keyword_reading(hexagram, WEALTH_KEYWORDS)
            .unwrap_or_else(|| wealth_template(hexagram)),
    }
}

fn overall_reading(hexagram: &HexagramRef) -> String {
    [
        hexagram.judgment.translation.trim(),
        hexagram.commentary.translation.trim(),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Translation of the first line (bottom up) whose text contains any of
/// `keywords`.
pub fn keyword_reading(hexagram: &HexagramRef, keywords: &[&str]) -> Option<String> {
    hexagram
        .lines
        .iter()
        .find(|line| mentions_any(line, keywords))
        .map(|line| line.translation.clone())
}

fn mentions_any(line: &TextPair, keywords: &[&str]) -> bool {
    let translation = line.translation.to_lowercase();
    keywords
        .iter()
        .any(|keyword| line.original.contains(keyword) || translation.contains(keyword))
}

fn career_template(hexagram: &HexagramRef) -> String {
    let label = hexagram.label();
    match hexagram.fortune {
        Fortune::Favorable => format!(
            "{label}: the career outlook is {}; steady effort is likely to be recognised.",
            hexagram.fortune.label()
        ),
        Fortune::Caution => format!(
            "{label}: the career outlook {}; consolidate your position before pushing forward.",
            hexagram.fortune.label()
        ),
    }
}

fn relationships_template(hexagram: &HexagramRef) -> String {
    let label = hexagram.label();
    match hexagram.fortune {
        Fortune::Favorable => format!(
            "{label}: the relationship outlook is {}; sincerity draws people closer.",
            hexagram.fortune.label()
        ),
        Fortune::Caution => format!(
            "{label}: the relationship outlook {}; listen more and avoid hasty commitments.",
            hexagram.fortune.label()
        ),
    }
}

fn wealth_template(hexagram: &HexagramRef) -> String {
    let label = hexagram.label();
    match hexagram.fortune {
        Fortune::Favorable => format!(
            "{label}: the financial outlook is {}; prudent investment can bring returns.",
            hexagram.fortune.label()
        ),
        Fortune::Caution => format!(
            "{label}: the financial outlook {}; guard against loss and avoid speculation.",
            hexagram.fortune.label()
        ),
    }
}

fn health_reading(hexagram: &HexagramRef) -> String {
    let body_part = match hexagram.body_part.trim() {
        "" => "overall constitution",
        part => part,
    };
    format!(
        "{}: pay particular attention to the {body_part}; keep a regular routine and rest well.",
        hexagram.label()
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
