//! Prompt construction for the AI interpretation.

use std::fmt::Write as _;

use iching_core::divination::DivinationResult;
use iching_core::hashing::sha256_hex;
use iching_core::hexagram::HexagramRef;

/// Closing instruction appended to every prompt.
pub const RESPONSE_INSTRUCTION: &str = "Reply with a single JSON object and nothing else. \
It must have exactly three string fields: \"summary\" (two or three sentences), \
\"detailed_analysis\" (the reasoning across the primary, changed and mutual hexagrams) \
and \"advice\" (concrete guidance for the questioner).";

/// A rendered prompt and its SHA-256 hex digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub digest: String,
}

/// Render the prompt for `result`.
///
/// The primary judgment and all six line texts are always included. The
/// changed hexagram's judgment appears only when lines are changing; the
/// mutual hexagram is always named.
pub fn build_prompt(result: &DivinationResult, question: Option<&str>) -> Prompt {
    let mut text = String::from("Interpret the following I Ching reading.\n\n");

    if let Some(question) = question.map(str::trim).filter(|q| !q.is_empty()) {
        let _ = writeln!(text, "Question: {question}\n");
    }

    write_hexagram(&mut text, "Primary hexagram", &result.primary);
    let _ = writeln!(text, "Lines (bottom to top):");
    for line in &result.lines {
        let Some(line_text) = result.primary.line(line.position) else {
            continue;
        };
        let marker = if line.changing { " [changing]" } else { "" };
        let _ = writeln!(
            text,
            "  {}. {} ({}){marker}",
            line.position, line_text.original, line_text.translation
        );
    }
    text.push('\n');

    if result.has_changing_lines() {
        let positions = result
            .changing_lines
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(text, "Changing lines: {positions}");
        write_hexagram(&mut text, "Changed hexagram", &result.changed);
    } else {
        let _ = writeln!(text, "Changing lines: none");
    }
    let _ = writeln!(text, "Mutual hexagram: {}\n", result.mutual.label());

    text.push_str(RESPONSE_INSTRUCTION);

    let digest = sha256_hex(text.as_bytes());
    Prompt { text, digest }
}

fn write_hexagram(text: &mut String, heading: &str, hexagram: &HexagramRef) {
    let _ = writeln!(
        text,
        "{heading}: {} {}, {} over {}",
        hexagram.label(),
        hexagram.glyph,
        hexagram.upper.image(),
        hexagram.lower.image()
    );
    let _ = writeln!(
        text,
        "Judgment: {} ({})",
        hexagram.judgment.original, hexagram.judgment.translation
    );
}
