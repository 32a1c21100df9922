//! Hexagram reference row model.

use iching_core::error::CoreError;
use iching_core::hexagram::{HexagramRef, RawHexagram, TextPair};
use iching_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `hexagrams` table.
///
/// Tags are stored as text and only checked when the row is converted into
/// a [`HexagramRef`].
#[derive(Debug, Clone, FromRow)]
pub struct HexagramRow {
    pub sequence: i16,
    pub name: String,
    pub glyph: String,
    pub pinyin: String,
    pub upper_trigram: String,
    pub lower_trigram: String,
    pub judgment: serde_json::Value,
    pub commentary: serde_json::Value,
    pub lines: serde_json::Value,
    pub five_element: String,
    pub fortune: String,
    pub nature: String,
    pub body_part: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting or replacing a hexagram, keyed by sequence.
#[derive(Debug, Clone)]
pub struct UpsertHexagram {
    pub sequence: i16,
    pub name: String,
    pub glyph: String,
    pub pinyin: String,
    pub upper_trigram: String,
    pub lower_trigram: String,
    pub judgment: serde_json::Value,
    pub commentary: serde_json::Value,
    pub lines: serde_json::Value,
    pub five_element: String,
    pub fortune: String,
    pub nature: String,
    pub body_part: String,
}

impl From<&HexagramRef> for UpsertHexagram {
    fn from(hexagram: &HexagramRef) -> Self {
        Self {
            sequence: i16::from(hexagram.sequence),
            name: hexagram.name.clone(),
            glyph: hexagram.glyph.clone(),
            pinyin: hexagram.pinyin.clone(),
            upper_trigram: hexagram.upper.name().to_string(),
            lower_trigram: hexagram.lower.name().to_string(),
            judgment: text_pair_json(&hexagram.judgment),
            commentary: text_pair_json(&hexagram.commentary),
            lines: serde_json::Value::Array(hexagram.lines.iter().map(text_pair_json).collect()),
            five_element: hexagram.five_element.as_str().to_string(),
            fortune: hexagram.fortune.as_str().to_string(),
            nature: hexagram.nature.clone(),
            body_part: hexagram.body_part.clone(),
        }
    }
}

fn text_pair_json(pair: &TextPair) -> serde_json::Value {
    serde_json::json!({
        "original": pair.original,
        "translation": pair.translation,
    })
}

impl TryFrom<HexagramRow> for HexagramRef {
    type Error = CoreError;

    fn try_from(row: HexagramRow) -> Result<Self, Self::Error> {
        let sequence = row.sequence;
        let json_error = |field: &str, e: serde_json::Error| {
            CoreError::Validation(format!("Hexagram #{sequence}: malformed {field}: {e}"))
        };
        let raw = RawHexagram {
            sequence: i64::from(row.sequence),
            name: row.name,
            glyph: row.glyph,
            pinyin: row.pinyin,
            upper_trigram: row.upper_trigram,
            lower_trigram: row.lower_trigram,
            judgment: serde_json::from_value(row.judgment).map_err(|e| json_error("judgment", e))?,
            commentary: serde_json::from_value(row.commentary)
                .map_err(|e| json_error("commentary", e))?,
            lines: serde_json::from_value(row.lines).map_err(|e| json_error("lines", e))?,
            five_element: row.five_element,
            fortune: row.fortune,
            nature: row.nature,
            body_part: row.body_part,
        };
        HexagramRef::try_from(raw)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use iching_core::testing::sample_catalog;

    use super::*;

    fn row_from(upsert: UpsertHexagram) -> HexagramRow {
        HexagramRow {
            sequence: upsert.sequence,
            name: upsert.name,
            glyph: upsert.glyph,
            pinyin: upsert.pinyin,
            upper_trigram: upsert.upper_trigram,
            lower_trigram: upsert.lower_trigram,
            judgment: upsert.judgment,
            commentary: upsert.commentary,
            lines: upsert.lines,
            five_element: upsert.five_element,
            fortune: upsert.fortune,
            nature: upsert.nature,
            body_part: upsert.body_part,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn stored_columns_convert_back_to_the_same_hexagram() {
        let catalog = sample_catalog();
        let tai = catalog.get(11).unwrap();
        let row = row_from(UpsertHexagram::from(tai));
        assert_eq!(row.upper_trigram, "Kun");
        assert_eq!(row.fortune, "favorable");
        assert_eq!(HexagramRef::try_from(row).unwrap(), *tai);
    }

    #[test]
    fn malformed_lines_are_a_validation_error() {
        let catalog = sample_catalog();
        let mut row = row_from(UpsertHexagram::from(catalog.get(1).unwrap()));
        row.lines = serde_json::json!(["not a text pair"]);
        let err = HexagramRef::try_from(row).unwrap_err();
        assert!(err.to_string().contains("Hexagram #1: malformed lines"));
    }
}
