//! Hexagram reference data: the typed model the generators read, and the
//! load-time validation that turns untyped dataset rows into it.
//!
//! Metadata tags (trigrams, five element, fortune) are closed enums. A row
//! that does not fit is rejected when the dataset is loaded, so nothing
//! downstream has to re-check it.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::trigram::{king_wen_sequence, Trigram};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of hexagrams in a complete dataset.
pub const HEXAGRAM_COUNT: usize = 64;

/// Number of lines in a hexagram.
pub const LINES_PER_HEXAGRAM: usize = 6;

/// First code point of the Unicode "Yijing Hexagram Symbols" block (䷀).
const HEXAGRAM_GLYPH_BASE: u32 = 0x4DC0;

// ---------------------------------------------------------------------------
// Metadata tags
// ---------------------------------------------------------------------------

/// The five-phase classification attached to each hexagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FiveElement {
    Metal,
    Wood,
    Water,
    Fire,
    Earth,
}

impl FiveElement {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metal => "metal",
            Self::Wood => "wood",
            Self::Water => "water",
            Self::Fire => "fire",
            Self::Earth => "earth",
        }
    }
}

impl fmt::Display for FiveElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FiveElement {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metal" | "金" => Ok(Self::Metal),
            "wood" | "木" => Ok(Self::Wood),
            "water" | "水" => Ok(Self::Water),
            "fire" | "火" => Ok(Self::Fire),
            "earth" | "土" => Ok(Self::Earth),
            other => Err(CoreError::Validation(format!(
                "Unknown five element '{other}'"
            ))),
        }
    }
}

/// Coarse quality tag: whether the hexagram reads as favourable overall or
/// calls for caution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fortune {
    Favorable,
    Caution,
}

impl Fortune {
    /// Stable tag used in datasets and database rows.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Favorable => "favorable",
            Self::Caution => "caution",
        }
    }

    /// Human-readable label used in templated readings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Favorable => "favorable",
            Self::Caution => "needs caution",
        }
    }
}

impl FromStr for Fortune {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "favorable" | "favourable" | "auspicious" | "吉" => Ok(Self::Favorable),
            "caution" | "inauspicious" | "凶" => Ok(Self::Caution),
            other => Err(CoreError::Validation(format!("Unknown fortune '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Hexagram reference
// ---------------------------------------------------------------------------

/// Canonical text with its modern translation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextPair {
    pub original: String,
    pub translation: String,
}

impl TextPair {
    pub fn new(original: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            translation: translation.into(),
        }
    }
}

/// One validated hexagram from the reference catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexagramRef {
    /// King Wen sequence number, 1..=64.
    pub sequence: u8,
    pub name: String,
    pub glyph: String,
    pub pinyin: String,
    pub upper: Trigram,
    pub lower: Trigram,
    pub judgment: TextPair,
    pub commentary: TextPair,
    /// Line texts, bottom (position 1) to top (position 6).
    pub lines: [TextPair; LINES_PER_HEXAGRAM],
    pub five_element: FiveElement,
    pub fortune: Fortune,
    /// Short description of the hexagram's character.
    pub nature: String,
    /// Body part associated with the hexagram, read by the health reading.
    pub body_part: String,
}

impl HexagramRef {
    /// Line text at `position` (1..=6).
    pub fn line(&self, position: u8) -> Option<&TextPair> {
        match position {
            1..=6 => self.lines.get(usize::from(position) - 1),
            _ => None,
        }
    }

    /// `"Qian 乾 (#1)"`-style label for narrative text.
    pub fn label(&self) -> String {
        format!("{} {} (#{})", self.pinyin, self.name, self.sequence)
    }
}

/// The Unicode hexagram symbol for a sequence number (1 -> ䷀).
pub fn hexagram_glyph(sequence: u8) -> Option<char> {
    match sequence {
        1..=64 => char::from_u32(HEXAGRAM_GLYPH_BASE + u32::from(sequence) - 1),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Untyped dataset rows
// ---------------------------------------------------------------------------

/// A hexagram as it arrives from a JSON dataset or a database row, before
/// any of its tags have been checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHexagram {
    pub sequence: i64,
    pub name: String,
    pub glyph: String,
    pub pinyin: String,
    pub upper_trigram: String,
    pub lower_trigram: String,
    pub judgment: TextPair,
    pub commentary: TextPair,
    pub lines: Vec<TextPair>,
    pub five_element: String,
    pub fortune: String,
    #[serde(default)]
    pub nature: String,
    #[serde(default)]
    pub body_part: String,
}

impl TryFrom<RawHexagram> for HexagramRef {
    type Error = CoreError;

    fn try_from(raw: RawHexagram) -> Result<Self, Self::Error> {
        let sequence = u8::try_from(raw.sequence)
            .ok()
            .filter(|s| (1..=HEXAGRAM_COUNT as u8).contains(s))
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Hexagram sequence {} is outside 1..=64",
                    raw.sequence
                ))
            })?;

        let context = |err: CoreError| match err {
            CoreError::Validation(msg) => {
                CoreError::Validation(format!("Hexagram #{sequence}: {msg}"))
            }
            other => other,
        };

        let upper: Trigram = raw.upper_trigram.parse().map_err(context)?;
        let lower: Trigram = raw.lower_trigram.parse().map_err(context)?;
        let expected = king_wen_sequence(upper, lower);
        if expected != sequence {
            return Err(CoreError::Validation(format!(
                "Hexagram #{sequence}: trigrams {upper}/{lower} belong to #{expected}"
            )));
        }

        let line_count = raw.lines.len();
        let lines: [TextPair; LINES_PER_HEXAGRAM] = raw.lines.try_into().map_err(|_| {
            CoreError::Validation(format!(
                "Hexagram #{sequence}: expected {LINES_PER_HEXAGRAM} line texts, got {line_count}"
            ))
        })?;

        if raw.name.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "Hexagram #{sequence}: name must not be empty"
            )));
        }

        Ok(Self {
            sequence,
            name: raw.name,
            glyph: raw.glyph,
            pinyin: raw.pinyin,
            upper,
            lower,
            judgment: raw.judgment,
            commentary: raw.commentary,
            lines,
            five_element: raw.five_element.parse().map_err(context)?,
            fortune: raw.fortune.parse().map_err(context)?,
            nature: raw.nature,
            body_part: raw.body_part,
        })
    }
}

/// Validate a whole dataset: every row individually, then the uniqueness of
/// sequence numbers, glyphs and trigram pairs across rows.
pub fn validate_dataset(rows: Vec<RawHexagram>) -> Result<Vec<HexagramRef>, CoreError> {
    let mut sequences = HashSet::new();
    let mut glyphs = HashSet::new();
    let mut pairs = HashSet::new();
    let mut hexagrams = Vec::with_capacity(rows.len());

    for row in rows {
        let hexagram = HexagramRef::try_from(row)?;
        if !sequences.insert(hexagram.sequence) {
            return Err(CoreError::Validation(format!(
                "Duplicate hexagram sequence #{}",
                hexagram.sequence
            )));
        }
        if !glyphs.insert(hexagram.glyph.clone()) {
            return Err(CoreError::Validation(format!(
                "Duplicate hexagram glyph '{}' at #{}",
                hexagram.glyph, hexagram.sequence
            )));
        }
        if !pairs.insert((hexagram.upper, hexagram.lower)) {
            return Err(CoreError::Validation(format!(
                "Duplicate trigram pair {}/{} at #{}",
                hexagram.upper, hexagram.lower, hexagram.sequence
            )));
        }
        hexagrams.push(hexagram);
    }

    Ok(hexagrams)
}

/// Parse and validate a JSON array of [`RawHexagram`] rows.
pub fn parse_dataset_json(json: &str) -> Result<Vec<HexagramRef>, CoreError> {
    let rows: Vec<RawHexagram> = serde_json::from_str(json)
        .map_err(|e| CoreError::Validation(format!("Malformed hexagram dataset: {e}")))?;
    validate_dataset(rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
