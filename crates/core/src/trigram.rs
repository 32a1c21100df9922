//! The eight trigrams and the King Wen lookup table that pairs them into
//! the sixty-four hexagrams.
//!
//! A trigram's binary code reads top line first: `"001"` is Zhen (thunder),
//! with a single solid line at the bottom.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::line::LinePolarity;

// ---------------------------------------------------------------------------
// Trigram
// ---------------------------------------------------------------------------

/// One of the eight three-line figures, in King Wen chart order
/// (father, three sons, mother, three daughters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigram {
    Qian,
    Zhen,
    Kan,
    Gen,
    Kun,
    Xun,
    Li,
    Dui,
}

/// All trigrams in chart order.
pub const ALL_TRIGRAMS: [Trigram; 8] = [
    Trigram::Qian,
    Trigram::Zhen,
    Trigram::Kan,
    Trigram::Gen,
    Trigram::Kun,
    Trigram::Xun,
    Trigram::Li,
    Trigram::Dui,
];

impl Trigram {
    /// Three-bit code, top line in the most significant bit.
    pub const fn code(self) -> u8 {
        match self {
            Self::Qian => 0b111,
            Self::Zhen => 0b001,
            Self::Kan => 0b010,
            Self::Gen => 0b100,
            Self::Kun => 0b000,
            Self::Xun => 0b110,
            Self::Li => 0b101,
            Self::Dui => 0b011,
        }
    }

    /// Inverse of [`Trigram::code`]. Only the low three bits are read.
    pub fn from_code(code: u8) -> Self {
        match code & 0b111 {
            0b111 => Self::Qian,
            0b001 => Self::Zhen,
            0b010 => Self::Kan,
            0b100 => Self::Gen,
            0b000 => Self::Kun,
            0b110 => Self::Xun,
            0b101 => Self::Li,
            _ => Self::Dui,
        }
    }

    /// Build a trigram from three polarities listed bottom to top.
    pub fn from_polarities(bottom: LinePolarity, middle: LinePolarity, top: LinePolarity) -> Self {
        Self::from_code(top.bit() << 2 | middle.bit() << 1 | bottom.bit())
    }

    /// Polarities bottom to top.
    pub fn polarities(self) -> [LinePolarity; 3] {
        let code = self.code();
        [
            LinePolarity::from_bit(code),
            LinePolarity::from_bit(code >> 1),
            LinePolarity::from_bit(code >> 2),
        ]
    }

    /// The code as a three-character string, e.g. `"101"` for Li.
    pub fn binary(self) -> String {
        format!("{:03b}", self.code())
    }

    /// Every line flipped (Qian <-> Kun, Zhen <-> Xun, ...).
    pub fn inverted(self) -> Self {
        Self::from_code(!self.code())
    }

    /// Pinyin name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Qian => "Qian",
            Self::Zhen => "Zhen",
            Self::Kan => "Kan",
            Self::Gen => "Gen",
            Self::Kun => "Kun",
            Self::Xun => "Xun",
            Self::Li => "Li",
            Self::Dui => "Dui",
        }
    }

    pub fn chinese(self) -> &'static str {
        match self {
            Self::Qian => "乾",
            Self::Zhen => "震",
            Self::Kan => "坎",
            Self::Gen => "艮",
            Self::Kun => "坤",
            Self::Xun => "巽",
            Self::Li => "离",
            Self::Dui => "兑",
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Self::Qian => '☰',
            Self::Zhen => '☳',
            Self::Kan => '☵',
            Self::Gen => '☶',
            Self::Kun => '☷',
            Self::Xun => '☴',
            Self::Li => '☲',
            Self::Dui => '☱',
        }
    }

    /// The natural image the trigram stands for.
    pub fn image(self) -> &'static str {
        match self {
            Self::Qian => "heaven",
            Self::Zhen => "thunder",
            Self::Kan => "water",
            Self::Gen => "mountain",
            Self::Kun => "earth",
            Self::Xun => "wind",
            Self::Li => "fire",
            Self::Dui => "lake",
        }
    }

    fn chart_index(self) -> usize {
        match self {
            Self::Qian => 0,
            Self::Zhen => 1,
            Self::Kan => 2,
            Self::Gen => 3,
            Self::Kun => 4,
            Self::Xun => 5,
            Self::Li => 6,
            Self::Dui => 7,
        }
    }
}

impl fmt::Display for Trigram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Trigram {
    type Err = CoreError;

    /// Accepts the pinyin name (any case), the Chinese character, the
    /// glyph, or the three-character binary code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ALL_TRIGRAMS
            .into_iter()
            .find(|t| {
                t.name().eq_ignore_ascii_case(trimmed)
                    || t.chinese() == trimmed
                    || t.binary() == trimmed
                    || trimmed.chars().eq(std::iter::once(t.glyph()))
            })
            .ok_or_else(|| CoreError::Validation(format!("Unknown trigram '{trimmed}'")))
    }
}

// ---------------------------------------------------------------------------
// King Wen sequence
// ---------------------------------------------------------------------------

/// Hexagram sequence numbers, rows by upper trigram and columns by lower
/// trigram, both in chart order.
const KING_WEN: [[u8; 8]; 8] = [
    [1, 25, 6, 33, 12, 44, 13, 10],
    [34, 51, 40, 62, 16, 32, 55, 54],
    [5, 3, 29, 39, 8, 48, 63, 60],
    [26, 27, 4, 52, 23, 18, 22, 41],
    [11, 24, 7, 15, 2, 46, 36, 19],
    [9, 42, 59, 53, 20, 57, 37, 61],
    [14, 21, 64, 56, 35, 50, 30, 38],
    [43, 17, 47, 31, 45, 28, 49, 58],
];

/// The canonical sequence number (1..=64) of the hexagram with the given
/// upper and lower trigrams.
pub fn king_wen_sequence(upper: Trigram, lower: Trigram) -> u8 {
    KING_WEN[upper.chart_index()][lower.chart_index()]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn codes_are_distinct_and_round_trip() {
        let codes: HashSet<u8> = ALL_TRIGRAMS.iter().map(|t| t.code()).collect();
        assert_eq!(codes.len(), 8);
        for t in ALL_TRIGRAMS {
            assert_eq!(Trigram::from_code(t.code()), t);
        }
    }

    #[test]
    fn binary_reads_top_line_first() {
        assert_eq!(Trigram::Zhen.binary(), "001");
        assert_eq!(Trigram::Gen.binary(), "100");
        assert_eq!(Trigram::Xun.binary(), "110");
        assert_eq!(Trigram::Dui.binary(), "011");
    }

    #[test]
    fn from_polarities_uses_bottom_to_top_order() {
        use LinePolarity::{Yang, Yin};
        assert_eq!(Trigram::from_polarities(Yang, Yin, Yin), Trigram::Zhen);
        assert_eq!(Trigram::from_polarities(Yin, Yin, Yang), Trigram::Gen);
        assert_eq!(Trigram::from_polarities(Yang, Yin, Yang), Trigram::Li);
        for t in ALL_TRIGRAMS {
            let [b, m, top] = t.polarities();
            assert_eq!(Trigram::from_polarities(b, m, top), t);
        }
    }

    #[test]
    fn inversion_pairs() {
        assert_eq!(Trigram::Qian.inverted(), Trigram::Kun);
        assert_eq!(Trigram::Zhen.inverted(), Trigram::Xun);
        assert_eq!(Trigram::Kan.inverted(), Trigram::Li);
        assert_eq!(Trigram::Gen.inverted(), Trigram::Dui);
    }

    #[test]
    fn parses_every_spelling() {
        assert_eq!("qian".parse::<Trigram>().unwrap(), Trigram::Qian);
        assert_eq!("坎".parse::<Trigram>().unwrap(), Trigram::Kan);
        assert_eq!("☲".parse::<Trigram>().unwrap(), Trigram::Li);
        assert_eq!("011".parse::<Trigram>().unwrap(), Trigram::Dui);
        assert!("thunderbolt".parse::<Trigram>().is_err());
    }

    #[test]
    fn king_wen_table_covers_all_sixty_four_once() {
        let mut seen = HashSet::new();
        for upper in ALL_TRIGRAMS {
            for lower in ALL_TRIGRAMS {
                assert!(seen.insert(king_wen_sequence(upper, lower)));
            }
        }
        assert_eq!(seen.len(), 64);
        assert!(seen.iter().all(|s| (1..=64).contains(s)));
    }

    #[test]
    fn king_wen_spot_checks() {
        assert_eq!(king_wen_sequence(Trigram::Qian, Trigram::Qian), 1);
        assert_eq!(king_wen_sequence(Trigram::Kun, Trigram::Kun), 2);
        assert_eq!(king_wen_sequence(Trigram::Kun, Trigram::Qian), 11);
        assert_eq!(king_wen_sequence(Trigram::Qian, Trigram::Kun), 12);
        assert_eq!(king_wen_sequence(Trigram::Kan, Trigram::Li), 63);
        assert_eq!(king_wen_sequence(Trigram::Li, Trigram::Kan), 64);
    }
}
