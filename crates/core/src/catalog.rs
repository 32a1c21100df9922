//! The hexagram reference store seam and its in-memory implementation.
//!
//! [`HexagramStore`] is the read-only interface the generator consumes.
//! [`HexagramCatalog`] holds a validated dataset in memory; the PostgreSQL
//! implementation lives in `iching-db`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::hexagram::{parse_dataset_json, HexagramRef};
use crate::trigram::Trigram;

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Read-only access to the hexagram reference dataset.
#[async_trait]
pub trait HexagramStore: Send + Sync {
    async fn find_by_sequence(&self, sequence: u8) -> Result<Option<HexagramRef>, CoreError>;

    async fn find_by_trigrams(
        &self,
        upper: Trigram,
        lower: Trigram,
    ) -> Result<Option<HexagramRef>, CoreError>;

    /// Every hexagram in the store, ordered by sequence.
    async fn find_all(&self) -> Result<Vec<HexagramRef>, CoreError>;

    async fn count(&self) -> Result<usize, CoreError>;
}

#[async_trait]
impl<T: HexagramStore + ?Sized> HexagramStore for Arc<T> {
    async fn find_by_sequence(&self, sequence: u8) -> Result<Option<HexagramRef>, CoreError> {
        (**self).find_by_sequence(sequence).await
    }

    async fn find_by_trigrams(
        &self,
        upper: Trigram,
        lower: Trigram,
    ) -> Result<Option<HexagramRef>, CoreError> {
        (**self).find_by_trigrams(upper, lower).await
    }

    async fn find_all(&self) -> Result<Vec<HexagramRef>, CoreError> {
        (**self).find_all().await
    }

    async fn count(&self) -> Result<usize, CoreError> {
        (**self).count().await
    }
}

// ---------------------------------------------------------------------------
// In-memory catalog
// ---------------------------------------------------------------------------

/// A validated, immutable hexagram dataset held in memory.
#[derive(Debug, Clone, Default)]
pub struct HexagramCatalog {
    by_sequence: BTreeMap<u8, HexagramRef>,
    by_trigrams: HashMap<(Trigram, Trigram), u8>,
}

impl HexagramCatalog {
    /// Build a catalog from already-typed hexagrams. Sequence numbers and
    /// trigram pairs must be unique.
    pub fn new(hexagrams: impl IntoIterator<Item = HexagramRef>) -> Result<Self, CoreError> {
        let mut catalog = Self::default();
        for hexagram in hexagrams {
            let pair = (hexagram.upper, hexagram.lower);
            if catalog.by_trigrams.contains_key(&pair) {
                return Err(CoreError::Validation(format!(
                    "Duplicate trigram pair {}/{} at #{}",
                    pair.0, pair.1, hexagram.sequence
                )));
            }
            if catalog.by_sequence.contains_key(&hexagram.sequence) {
                return Err(CoreError::Validation(format!(
                    "Duplicate hexagram sequence #{}",
                    hexagram.sequence
                )));
            }
            catalog.by_trigrams.insert(pair, hexagram.sequence);
            catalog.by_sequence.insert(hexagram.sequence, hexagram);
        }
        Ok(catalog)
    }

    /// Parse, validate and index a JSON dataset.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Self::new(parse_dataset_json(json)?)
    }

    pub fn len(&self) -> usize {
        self.by_sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sequence.is_empty()
    }

    /// Hexagrams in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &HexagramRef> {
        self.by_sequence.values()
    }

    pub fn get(&self, sequence: u8) -> Option<&HexagramRef> {
        self.by_sequence.get(&sequence)
    }

    pub fn get_by_trigrams(&self, upper: Trigram, lower: Trigram) -> Option<&HexagramRef> {
        self.by_trigrams
            .get(&(upper, lower))
            .and_then(|seq| self.by_sequence.get(seq))
    }

    /// Trigram pairs with no hexagram in this catalog. Every pair listed
    /// here will hit the random fallback when cast.
    pub fn missing_pairs(&self) -> Vec<(Trigram, Trigram)> {
        use crate::trigram::ALL_TRIGRAMS;

        ALL_TRIGRAMS
            .iter()
            .flat_map(|&upper| ALL_TRIGRAMS.iter().map(move |&lower| (upper, lower)))
            .filter(|pair| !self.by_trigrams.contains_key(pair))
            .collect()
    }
}

#[async_trait]
impl HexagramStore for HexagramCatalog {
    async fn find_by_sequence(&self, sequence: u8) -> Result<Option<HexagramRef>, CoreError> {
        Ok(self.get(sequence).cloned())
    }

    async fn find_by_trigrams(
        &self,
        upper: Trigram,
        lower: Trigram,
    ) -> Result<Option<HexagramRef>, CoreError> {
        Ok(self.get_by_trigrams(upper, lower).cloned())
    }

    async fn find_all(&self) -> Result<Vec<HexagramRef>, CoreError> {
        Ok(self.by_sequence.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, CoreError> {
        Ok(self.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
