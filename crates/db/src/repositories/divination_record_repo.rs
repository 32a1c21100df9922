//! Repository for the `divination_records` table.

use iching_core::types::DbId;
use sqlx::PgPool;

use crate::models::divination_record::{
    CreateDivinationRecord, DivinationRecordRow, UpdateDivinationRecord,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, question, result, ai_interpretation, created_at, updated_at";

/// Create, owner-scoped read and patch for divination records.
pub struct DivinationRecordRepo;

impl DivinationRecordRepo {
    /// Insert a new record, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateDivinationRecord,
    ) -> Result<DivinationRecordRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO divination_records (user_id, question, result)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DivinationRecordRow>(&query)
            .bind(input.user_id)
            .bind(&input.question)
            .bind(&input.result)
            .fetch_one(pool)
            .await
    }

    /// Find a record by ID, only if it belongs to `owner_id`.
    pub async fn find_by_id_for_owner(
        pool: &PgPool,
        id: DbId,
        owner_id: DbId,
    ) -> Result<Option<DivinationRecordRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM divination_records WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, DivinationRecordRow>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Update a record. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateDivinationRecord,
    ) -> Result<Option<DivinationRecordRow>, sqlx::Error> {
        let query = format!(
            "UPDATE divination_records SET
                result = COALESCE($2, result),
                ai_interpretation = COALESCE($3, ai_interpretation),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DivinationRecordRow>(&query)
            .bind(id)
            .bind(&input.result)
            .bind(&input.ai_interpretation)
            .fetch_optional(pool)
            .await
    }
}
