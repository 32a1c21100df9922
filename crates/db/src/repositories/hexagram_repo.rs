//! Repository for the `hexagrams` table.

use sqlx::PgPool;

use crate::models::hexagram::{HexagramRow, UpsertHexagram};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "sequence, name, glyph, pinyin, upper_trigram, lower_trigram, \
     judgment, commentary, lines, five_element, fortune, nature, body_part, \
     created_at, updated_at";

/// Provides read access and seeding for hexagram reference data.
pub struct HexagramRepo;

impl HexagramRepo {
    /// Insert a hexagram or replace the row with the same sequence.
    pub async fn upsert(pool: &PgPool, input: &UpsertHexagram) -> Result<HexagramRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO hexagrams (sequence, name, glyph, pinyin, upper_trigram, lower_trigram,
                                    judgment, commentary, lines, five_element, fortune, nature, body_part)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             ON CONFLICT (sequence) DO UPDATE SET
                name = EXCLUDED.name,
                glyph = EXCLUDED.glyph,
                pinyin = EXCLUDED.pinyin,
                upper_trigram = EXCLUDED.upper_trigram,
                lower_trigram = EXCLUDED.lower_trigram,
                judgment = EXCLUDED.judgment,
                commentary = EXCLUDED.commentary,
                lines = EXCLUDED.lines,
                five_element = EXCLUDED.five_element,
                fortune = EXCLUDED.fortune,
                nature = EXCLUDED.nature,
                body_part = EXCLUDED.body_part,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, HexagramRow>(&query)
            .bind(input.sequence)
            .bind(&input.name)
            .bind(&input.glyph)
            .bind(&input.pinyin)
            .bind(&input.upper_trigram)
            .bind(&input.lower_trigram)
            .bind(&input.judgment)
            .bind(&input.commentary)
            .bind(&input.lines)
            .bind(&input.five_element)
            .bind(&input.fortune)
            .bind(&input.nature)
            .bind(&input.body_part)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_sequence(
        pool: &PgPool,
        sequence: i16,
    ) -> Result<Option<HexagramRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM hexagrams WHERE sequence = $1");
        sqlx::query_as::<_, HexagramRow>(&query)
            .bind(sequence)
            .fetch_optional(pool)
            .await
    }

    /// Find the hexagram for a trigram pair, given as pinyin names.
    pub async fn find_by_trigrams(
        pool: &PgPool,
        upper: &str,
        lower: &str,
    ) -> Result<Option<HexagramRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM hexagrams WHERE upper_trigram = $1 AND lower_trigram = $2"
        );
        sqlx::query_as::<_, HexagramRow>(&query)
            .bind(upper)
            .bind(lower)
            .fetch_optional(pool)
            .await
    }

    /// List all hexagrams ordered by sequence.
    pub async fn list(pool: &PgPool) -> Result<Vec<HexagramRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM hexagrams ORDER BY sequence");
        sqlx::query_as::<_, HexagramRow>(&query).fetch_all(pool).await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hexagrams")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
