//! Rule-based detailed analysis of a complete cast: what the changing lines
//! say, what the mutual hexagram hides, and when change is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::divination::DivinationResult;
use crate::hexagram::FiveElement;
use crate::line::LinePolarity;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedAnalysis {
    pub changing_analysis: String,
    pub mutual_analysis: String,
    pub timing_analysis: String,
    pub advice: Advice,
}

/// Four-point recommendation. The wording is the same for every hexagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    pub mindset: String,
    pub action: String,
    pub caution: String,
    pub timing: String,
}

impl Advice {
    pub fn standard() -> Self {
        Self {
            mindset: "Stay calm and objective; read the situation as it is, not as you wish it to be."
                .to_string(),
            action: "Act step by step and build on what is already working.".to_string(),
            caution: "Avoid rash decisions and overreach; leave yourself room to adjust."
                .to_string(),
            timing: "Move when conditions are ripe; patience is part of the answer.".to_string(),
        }
    }
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "1. Mindset: {}", self.mindset)?;
        writeln!(f, "2. Action: {}", self.action)?;
        writeln!(f, "3. Caution: {}", self.caution)?;
        write!(f, "4. Timing: {}", self.timing)
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

pub fn detailed_analysis(result: &DivinationResult) -> DetailedAnalysis {
    DetailedAnalysis {
        changing_analysis: changing_analysis(result),
        mutual_analysis: mutual_analysis(result),
        timing_analysis: timing_analysis(result),
        advice: Advice::standard(),
    }
}

fn changing_analysis(result: &DivinationResult) -> String {
    let primary = result.primary.label();
    let changed = result.changed.label();

    match result.changing_lines.as_slice() {
        [] => format!(
            "No lines are changing. The situation is stable and {primary} describes it fully: {}",
            result.primary.commentary.translation
        ),
        [position] => {
            let text = result
                .primary
                .line(*position)
                .map(|line| format!("\"{}\" ({})", line.original, line.translation))
                .unwrap_or_default();
            let name = result
                .lines
                .iter()
                .find(|line| line.position == *position)
                .map(|line| traditional_line_name(line.position, line.polarity))
                .unwrap_or_default();
            format!(
                "Line {position} ({name}) is changing and carries the answer: {text}. \
                 The situation moves from {primary} to {changed}."
            )
        }
        [_, _] => format!(
            "Two lines are changing, so the situation is complex. Weigh {primary}, the present, \
             against {changed}, where things are heading."
        ),
        [_, _, _] => format!(
            "Three lines are changing: the present ({primary}) and the outcome ({changed}) carry equal \
             weight. Let the mutual hexagram {} break the tie.",
            result.mutual.label()
        ),
        lines => format!(
            "{} lines are changing. The changed hexagram {changed} dominates the reading; \
             {primary} is only the background.",
            lines.len()
        ),
    }
}

fn mutual_analysis(result: &DivinationResult) -> String {
    let mutual = &result.mutual;
    format!(
        "The mutual hexagram {} shows the forces at work beneath the surface: {} Its nature is {}.",
        mutual.label(),
        mutual.commentary.translation,
        mutual.nature
    )
}

fn timing_analysis(result: &DivinationResult) -> String {
    let element = result.primary.five_element;
    let opening = format!(
        "{} belongs to the {element} element, whose energy peaks in {}.",
        result.primary.label(),
        season_for(element)
    );
    match result.earliest_changing_line() {
        Some(position) => format!(
            "{opening} Change is expected {}, as signalled by line {position}.",
            change_window(position)
        ),
        None => format!(
            "{opening} With no changing lines the situation is stable; there is no urgency to act."
        ),
    }
}

/// Season in which an element is strongest.
pub fn season_for(element: FiveElement) -> &'static str {
    match element {
        FiveElement::Metal => "autumn",
        FiveElement::Wood => "spring",
        FiveElement::Water => "winter",
        FiveElement::Fire => "summer",
        FiveElement::Earth => "the four transitional months closing each season",
    }
}

/// Relative time window keyed by the lowest changing line. Lower lines
/// point to nearer events.
pub fn change_window(position: u8) -> &'static str {
    match position {
        1 => "within about 7 days",
        2 => "within about two weeks",
        3 => "within about a month",
        4 => "within one to three months",
        5 => "within three to six months",
        _ => "in six months or more",
    }
}

/// Classical line name: 初九, 六二, ..., 上六.
pub fn traditional_line_name(position: u8, polarity: LinePolarity) -> String {
    let number = match polarity {
        LinePolarity::Yang => "九",
        LinePolarity::Yin => "六",
    };
    match position {
        1 => format!("初{number}"),
        6 => format!("上{number}"),
        2 => format!("{number}二"),
        3 => format!("{number}三"),
        4 => format!("{number}四"),
        _ => format!("{number}五"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
