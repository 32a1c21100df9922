//! Single hexagram lines and the four coin-toss outcomes that produce them.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Polarity
// ---------------------------------------------------------------------------

/// Whether a line is broken (yin) or solid (yang).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinePolarity {
    Yin,
    Yang,
}

impl LinePolarity {
    /// The opposite polarity.
    pub fn flipped(self) -> Self {
        match self {
            Self::Yin => Self::Yang,
            Self::Yang => Self::Yin,
        }
    }

    /// `1` for a solid line, `0` for a broken one.
    pub fn bit(self) -> u8 {
        match self {
            Self::Yin => 0,
            Self::Yang => 1,
        }
    }

    pub fn from_bit(bit: u8) -> Self {
        if bit & 1 == 1 {
            Self::Yang
        } else {
            Self::Yin
        }
    }
}

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

/// One line of a cast, numbered 1 (bottom) to 6 (top).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub position: u8,
    pub polarity: LinePolarity,
    pub changing: bool,
}

impl Line {
    pub fn new(position: u8, polarity: LinePolarity, changing: bool) -> Self {
        Self {
            position,
            polarity,
            changing,
        }
    }

    /// The line as it reads in the changed hexagram: changing lines flip
    /// polarity and every line comes out at rest.
    pub fn settled(self) -> Self {
        let polarity = if self.changing {
            self.polarity.flipped()
        } else {
            self.polarity
        };
        Self {
            position: self.position,
            polarity,
            changing: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Coin-toss outcomes
// ---------------------------------------------------------------------------

/// The four admissible results of tossing three coins for one line.
///
/// Traditional scoring counts heads as 3 and tails as 2, giving the ritual
/// values 6 (old yin), 7 (young yang), 8 (young yin) and 9 (old yang).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    OldYin,
    YoungYang,
    YoungYin,
    OldYang,
}

impl LineKind {
    /// Classify a toss by its number of heads. Three coins can only yield
    /// 0..=3 heads; any other count returns `None`.
    pub fn from_heads(heads: u8) -> Option<Self> {
        match heads {
            0 => Some(Self::OldYin),
            1 => Some(Self::YoungYang),
            2 => Some(Self::YoungYin),
            3 => Some(Self::OldYang),
            _ => None,
        }
    }

    pub fn polarity(self) -> LinePolarity {
        match self {
            Self::YoungYang | Self::OldYang => LinePolarity::Yang,
            Self::YoungYin | Self::OldYin => LinePolarity::Yin,
        }
    }

    /// Old lines are the ones that change.
    pub fn is_changing(self) -> bool {
        matches!(self, Self::OldYin | Self::OldYang)
    }

    pub fn ritual_value(self) -> u8 {
        match self {
            Self::OldYin => 6,
            Self::YoungYang => 7,
            Self::YoungYin => 8,
            Self::OldYang => 9,
        }
    }

    pub fn into_line(self, position: u8) -> Line {
        Line::new(position, self.polarity(), self.is_changing())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
