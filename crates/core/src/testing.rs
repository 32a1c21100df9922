//! Fixtures shared by this crate's tests and, through the `testing`
//! feature, by downstream crates' tests.

use crate::catalog::HexagramCatalog;
use crate::divination::{Coin, CoinSource};
use crate::hexagram::{hexagram_glyph, FiveElement, Fortune, HexagramRef, TextPair};
use crate::trigram::{king_wen_sequence, Trigram, ALL_TRIGRAMS};

/// The bundled sample dataset (Qian, Kun, Tai, Pi).
pub const SAMPLE_DATASET_JSON: &str = include_str!("../../../data/hexagrams.sample.json");

/// Catalog built from [`SAMPLE_DATASET_JSON`].
pub fn sample_catalog() -> HexagramCatalog {
    HexagramCatalog::from_json(SAMPLE_DATASET_JSON).expect("sample dataset is valid")
}

/// A placeholder hexagram for the given trigram pair. Texts carry no domain
/// keywords, so keyword scans always fall through to their templates.
pub fn synthetic_hexagram(upper: Trigram, lower: Trigram) -> HexagramRef {
    let sequence = king_wen_sequence(upper, lower);
    HexagramRef {
        sequence,
        name: format!("{}{}", upper.chinese(), lower.chinese()),
        glyph: hexagram_glyph(sequence).map(String::from).unwrap_or_default(),
        pinyin: format!("{}-{}", upper.name(), lower.name()),
        upper,
        lower,
        judgment: TextPair::new(format!("卦辞{sequence}"), format!("Judgment of #{sequence}.")),
        commentary: TextPair::new(format!("象曰{sequence}"), format!("Image of #{sequence}.")),
        lines: std::array::from_fn(|i| {
            TextPair::new(
                format!("爻辞{sequence}-{}", i + 1),
                format!("Line {} of #{sequence}.", i + 1),
            )
        }),
        five_element: trigram_element(lower),
        fortune: if sequence % 2 == 1 {
            Fortune::Favorable
        } else {
            Fortune::Caution
        },
        nature: format!("{} over {}", upper.image(), lower.image()),
        body_part: "back".to_string(),
    }
}

/// All sixty-four synthetic hexagrams, so no lookup ever misses.
pub fn complete_catalog() -> HexagramCatalog {
    let hexagrams = ALL_TRIGRAMS
        .iter()
        .flat_map(|&upper| {
            ALL_TRIGRAMS
                .iter()
                .map(move |&lower| synthetic_hexagram(upper, lower))
        })
        .collect::<Vec<_>>();
    HexagramCatalog::new(hexagrams).expect("synthetic catalog is valid")
}

fn trigram_element(trigram: Trigram) -> FiveElement {
    match trigram {
        Trigram::Qian | Trigram::Dui => FiveElement::Metal,
        Trigram::Zhen | Trigram::Xun => FiveElement::Wood,
        Trigram::Kan => FiveElement::Water,
        Trigram::Li => FiveElement::Fire,
        Trigram::Gen | Trigram::Kun => FiveElement::Earth,
    }
}

/// A coin source that replays a fixed script, cycling when it runs out.
#[derive(Debug, Clone)]
pub struct ScriptedCoins {
    script: Vec<Coin>,
    next: usize,
}

impl ScriptedCoins {
    pub fn new(script: Vec<Coin>) -> Self {
        assert!(!script.is_empty(), "coin script must not be empty");
        Self { script, next: 0 }
    }

    /// Every toss lands heads.
    pub fn all_heads() -> Self {
        Self::new(vec![Coin::Heads])
    }

    /// Every toss lands tails.
    pub fn all_tails() -> Self {
        Self::new(vec![Coin::Tails])
    }

    /// Script producing lines with the given head counts, bottom to top.
    pub fn from_head_counts(counts: [u8; 6]) -> Self {
        let script = counts
            .iter()
            .flat_map(|&heads| (0..3u8).map(move |i| if i < heads { Coin::Heads } else { Coin::Tails }))
            .collect();
        Self::new(script)
    }
}

impl CoinSource for ScriptedCoins {
    fn toss(&mut self) -> Coin {
        let coin = self.script[self.next % self.script.len()];
        self.next += 1;
        coin
    }
}
