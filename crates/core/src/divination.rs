//! Coin-toss hexagram generation.
//!
//! Six lines are tossed bottom to top, three coins per line. The lines are
//! then split into trigrams and resolved against a [`HexagramStore`] into
//! the primary, changed and mutual hexagrams.
//!
//! When a trigram pair has no row in the store, the primary and mutual
//! hexagrams fall back to a uniformly random hexagram, and the changed
//! hexagram falls back to the primary. This silently yields a wrong reading
//! for incomplete datasets; each substitution is logged at `warn`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::catalog::HexagramStore;
use crate::error::CoreError;
use crate::hexagram::HexagramRef;
use crate::line::{Line, LineKind};
use crate::trigram::Trigram;

// ---------------------------------------------------------------------------
// Coins
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coin {
    Heads,
    Tails,
}

/// Anything that can toss a fair coin.
pub trait CoinSource {
    fn toss(&mut self) -> Coin;
}

/// Fair coins backed by a [`rand::Rng`].
#[derive(Debug)]
pub struct RandomCoins<R> {
    rng: R,
}

impl<R: Rng> RandomCoins<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> CoinSource for RandomCoins<R> {
    fn toss(&mut self) -> Coin {
        if self.rng.random_bool(0.5) {
            Coin::Heads
        } else {
            Coin::Tails
        }
    }
}

/// Toss three coins and turn the result into the line at `position`.
pub fn toss_line<C: CoinSource + ?Sized>(coins: &mut C, position: u8) -> Line {
    let mut heads = 0u8;
    for _ in 0..3 {
        if coins.toss() == Coin::Heads {
            heads += 1;
        }
    }
    match LineKind::from_heads(heads) {
        Some(kind) => kind.into_line(position),
        None => unreachable!("three coins cannot show {heads} heads"),
    }
}

/// Toss all six lines, position 1 first.
pub fn toss_hexagram<C: CoinSource + ?Sized>(coins: &mut C) -> [Line; 6] {
    std::array::from_fn(|i| toss_line(coins, i as u8 + 1))
}

// ---------------------------------------------------------------------------
// Trigram extraction
// ---------------------------------------------------------------------------

fn trigram_of(triplet: &[Line]) -> Trigram {
    Trigram::from_polarities(triplet[0].polarity, triplet[1].polarity, triplet[2].polarity)
}

/// Trigram formed by lines 1-3.
pub fn lower_trigram(lines: &[Line; 6]) -> Trigram {
    trigram_of(&lines[0..3])
}

/// Trigram formed by lines 4-6.
pub fn upper_trigram(lines: &[Line; 6]) -> Trigram {
    trigram_of(&lines[3..6])
}

/// `(upper, lower)` of the mutual hexagram: lines 3-5 over lines 2-4.
pub fn mutual_trigrams(lines: &[Line; 6]) -> (Trigram, Trigram) {
    (trigram_of(&lines[2..5]), trigram_of(&lines[1..4]))
}

/// Positions of the changing lines, ascending.
pub fn changing_positions(lines: &[Line; 6]) -> Vec<u8> {
    lines
        .iter()
        .filter(|line| line.changing)
        .map(|line| line.position)
        .collect()
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// A completed cast with its three derived hexagrams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivinationResult {
    pub primary: HexagramRef,
    pub changed: HexagramRef,
    pub mutual: HexagramRef,
    pub lines: [Line; 6],
    pub changing_lines: Vec<u8>,
}

impl DivinationResult {
    pub fn has_changing_lines(&self) -> bool {
        !self.changing_lines.is_empty()
    }

    /// Lowest changing position, if any.
    pub fn earliest_changing_line(&self) -> Option<u8> {
        self.changing_lines.iter().copied().min()
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Casts hexagrams against a reference store. Holds no state besides the
/// store handle, so one instance can serve any number of requests.
pub struct HexagramGenerator<S> {
    store: S,
}

impl<S: HexagramStore> HexagramGenerator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Cast with fair random coins.
    pub async fn cast(&self) -> Result<DivinationResult, CoreError> {
        let lines = toss_hexagram(&mut RandomCoins::new(rand::rng()));
        let mut rng = StdRng::from_os_rng();
        self.resolve_with(lines, &mut rng).await
    }

    /// Cast with caller-supplied coins and fallback randomness.
    pub async fn cast_with<C, R>(
        &self,
        coins: &mut C,
        rng: &mut R,
    ) -> Result<DivinationResult, CoreError>
    where
        C: CoinSource + ?Sized,
        R: Rng + Send,
    {
        let lines = toss_hexagram(coins);
        self.resolve_with(lines, rng).await
    }

    /// Derive the three hexagrams for six already-known lines.
    pub async fn resolve(&self, lines: [Line; 6]) -> Result<DivinationResult, CoreError> {
        let mut rng = StdRng::from_os_rng();
        self.resolve_with(lines, &mut rng).await
    }

    pub async fn resolve_with<R>(
        &self,
        lines: [Line; 6],
        rng: &mut R,
    ) -> Result<DivinationResult, CoreError>
    where
        R: Rng + Send,
    {
        if self.store.count().await? == 0 {
            return Err(CoreError::NoReferenceData);
        }

        let primary = self
            .lookup_or_random(upper_trigram(&lines), lower_trigram(&lines), "primary", rng)
            .await?;

        let changing_lines = changing_positions(&lines);
        let changed = if changing_lines.is_empty() {
            primary.clone()
        } else {
            let settled = lines.map(Line::settled);
            let (upper, lower) = (upper_trigram(&settled), lower_trigram(&settled));
            match self.store.find_by_trigrams(upper, lower).await? {
                Some(hexagram) => hexagram,
                None => {
                    tracing::warn!(
                        upper = %upper,
                        lower = %lower,
                        primary = primary.sequence,
                        "Changed hexagram missing from reference data, keeping primary",
                    );
                    primary.clone()
                }
            }
        };

        let (upper, lower) = mutual_trigrams(&lines);
        let mutual = self.lookup_or_random(upper, lower, "mutual", rng).await?;

        tracing::debug!(
            primary = primary.sequence,
            changed = changed.sequence,
            mutual = mutual.sequence,
            changing = ?changing_lines,
            "Hexagram cast resolved",
        );

        Ok(DivinationResult {
            primary,
            changed,
            mutual,
            lines,
            changing_lines,
        })
    }

    async fn lookup_or_random<R>(
        &self,
        upper: Trigram,
        lower: Trigram,
        role: &'static str,
        rng: &mut R,
    ) -> Result<HexagramRef, CoreError>
    where
        R: Rng + Send,
    {
        if let Some(hexagram) = self.store.find_by_trigrams(upper, lower).await? {
            return Ok(hexagram);
        }

        // TODO: replace with a hard error once the reference dataset is
        // guaranteed complete; until then a random hexagram stands in.
        let mut all = self.store.find_all().await?;
        if all.is_empty() {
            return Err(CoreError::NoReferenceData);
        }
        let index = rng.random_range(0..all.len());
        let fallback = all.swap_remove(index);
        tracing::warn!(
            role,
            upper = %upper,
            lower = %lower,
            fallback = fallback.sequence,
            "Trigram pair missing from reference data, substituting a random hexagram",
        );
        Ok(fallback)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::catalog::HexagramCatalog;
    use crate::line::LinePolarity;
    use crate::testing::{complete_catalog, sample_catalog, ScriptedCoins};

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn heads_count_drives_line_kind() {
        let mut coins = ScriptedCoins::from_head_counts([0, 1, 2, 3, 1, 2]);
        let lines = toss_hexagram(&mut coins);
        assert_eq!(lines[0].polarity, LinePolarity::Yin);
        assert!(lines[0].changing);
        assert_eq!(lines[1].polarity, LinePolarity::Yang);
        assert!(!lines[1].changing);
        assert_eq!(lines[2].polarity, LinePolarity::Yin);
        assert!(!lines[2].changing);
        assert_eq!(lines[3].polarity, LinePolarity::Yang);
        assert!(lines[3].changing);
        let positions: Vec<u8> = lines.iter().map(|l| l.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn trigrams_read_from_the_right_lines() {
        // Lines 1-3: yang, yin, yin (Zhen). Lines 4-6: yin, yang, yang (Xun).
        let mut coins = ScriptedCoins::from_head_counts([1, 2, 2, 2, 1, 1]);
        let lines = toss_hexagram(&mut coins);
        assert_eq!(lower_trigram(&lines), Trigram::Zhen);
        assert_eq!(upper_trigram(&lines), Trigram::Xun);
        // Mutual: lines 2-4 (yin, yin, yin) under lines 3-5 (yin, yin, yang).
        assert_eq!(mutual_trigrams(&lines), (Trigram::Gen, Trigram::Kun));
    }

    #[tokio::test]
    async fn all_heads_gives_six_old_yang_lines() {
        let generator = HexagramGenerator::new(sample_catalog());
        let result = generator
            .cast_with(&mut ScriptedCoins::all_heads(), &mut seeded())
            .await
            .unwrap();

        assert!(result
            .lines
            .iter()
            .all(|l| l.polarity == LinePolarity::Yang && l.changing));
        assert_eq!(result.changing_lines, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(result.primary.sequence, 1);
        assert_eq!(result.changed.sequence, 2);
        assert_eq!(result.mutual.sequence, 1);
    }

    #[tokio::test]
    async fn all_tails_gives_six_old_yin_lines_changing_to_the_opposite() {
        let generator = HexagramGenerator::new(sample_catalog());
        let result = generator
            .cast_with(&mut ScriptedCoins::all_tails(), &mut seeded())
            .await
            .unwrap();

        assert!(result
            .lines
            .iter()
            .all(|l| l.polarity == LinePolarity::Yin && l.changing));
        assert_eq!(result.primary.sequence, 2);
        assert_eq!(result.changed.sequence, 1);
        assert_eq!(result.changed.upper, result.primary.upper.inverted());
        assert_eq!(result.changed.lower, result.primary.lower.inverted());
    }

    #[tokio::test]
    async fn no_changing_lines_keeps_primary() {
        // Tai: lower Qian (all young yang), upper Kun (all young yin).
        let generator = HexagramGenerator::new(sample_catalog());
        let mut coins = ScriptedCoins::from_head_counts([1, 1, 1, 2, 2, 2]);
        let result = generator.cast_with(&mut coins, &mut seeded()).await.unwrap();

        assert_eq!(result.primary.sequence, 11);
        assert!(result.changing_lines.is_empty());
        assert_eq!(result.changed, result.primary);
    }

    #[tokio::test]
    async fn empty_store_is_an_error() {
        let generator = HexagramGenerator::new(HexagramCatalog::default());
        assert_matches!(generator.cast().await, Err(CoreError::NoReferenceData));
    }

    #[tokio::test]
    async fn missing_primary_falls_back_to_a_stored_hexagram() {
        // Zhen over Kan is #40, absent from the sample set.
        let catalog = sample_catalog();
        let generator = HexagramGenerator::new(catalog.clone());
        let mut coins = ScriptedCoins::from_head_counts([2, 1, 2, 1, 2, 2]);
        let result = generator.cast_with(&mut coins, &mut seeded()).await.unwrap();

        assert!(catalog.get(result.primary.sequence).is_some());
        assert!(catalog.get(result.mutual.sequence).is_some());
        assert!(result.changing_lines.is_empty());
        assert_eq!(result.changed, result.primary);
    }

    #[tokio::test]
    async fn missing_changed_falls_back_to_primary() {
        // Qian with only line 1 changing becomes #44, absent from the sample set.
        let generator = HexagramGenerator::new(sample_catalog());
        let mut coins = ScriptedCoins::from_head_counts([3, 1, 1, 1, 1, 1]);
        let result = generator.cast_with(&mut coins, &mut seeded()).await.unwrap();

        assert_eq!(result.primary.sequence, 1);
        assert_eq!(result.changing_lines, vec![1]);
        assert_eq!(result.changed.sequence, 1);
    }

    #[tokio::test]
    async fn complete_catalog_resolves_king_wen_sequence() {
        let generator = HexagramGenerator::new(complete_catalog());
        let mut coins = ScriptedCoins::from_head_counts([3, 1, 1, 1, 1, 1]);
        let result = generator.cast_with(&mut coins, &mut seeded()).await.unwrap();
        assert_eq!(result.changed.sequence, 44);
    }

    #[tokio::test]
    async fn random_casts_keep_changing_lines_consistent() {
        let generator = HexagramGenerator::new(complete_catalog());
        for _ in 0..200 {
            let result = generator.cast().await.unwrap();
            let expected: Vec<u8> = result
                .lines
                .iter()
                .filter(|l| l.changing)
                .map(|l| l.position)
                .collect();
            assert_eq!(result.changing_lines, expected);
            assert!(result.changing_lines.windows(2).all(|w| w[0] < w[1]));
            assert!(result.changing_lines.iter().all(|p| (1..=6).contains(p)));
            if result.changing_lines.is_empty() {
                assert_eq!(result.changed.sequence, result.primary.sequence);
            }
        }
    }

    #[tokio::test]
    async fn mutual_ignores_outer_lines() {
        let generator = HexagramGenerator::new(complete_catalog());
        let base = ScriptedCoins::from_head_counts([1, 2, 1, 2, 1, 2]);
        let reference = generator
            .cast_with(&mut base.clone(), &mut seeded())
            .await
            .unwrap();

        for (bottom, top) in [(0, 0), (3, 3), (2, 1), (0, 3)] {
            let mut coins = ScriptedCoins::from_head_counts([bottom, 2, 1, 2, 1, top]);
            let result = generator.cast_with(&mut coins, &mut seeded()).await.unwrap();
            assert_eq!(result.mutual.sequence, reference.mutual.sequence);
        }
    }
}
