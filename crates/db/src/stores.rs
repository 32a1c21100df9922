//! PostgreSQL implementations of the core store traits.
//!
//! Repositories speak `sqlx::Error`; these adapters translate into
//! [`CoreError`] at the trait boundary.

use async_trait::async_trait;
use iching_core::catalog::HexagramStore;
use iching_core::error::CoreError;
use iching_core::hexagram::HexagramRef;
use iching_core::record::{DivinationRecord, DivinationRecordStore, RecordPatch};
use iching_core::trigram::Trigram;
use iching_core::types::DbId;

use crate::models::divination_record::UpdateDivinationRecord;
use crate::repositories::{DivinationRecordRepo, HexagramRepo};
use crate::DbPool;

fn store_error(e: sqlx::Error) -> CoreError {
    tracing::error!(error = %e, "Database query failed");
    CoreError::Store(e.to_string())
}

fn decode_error(e: serde_json::Error) -> CoreError {
    tracing::error!(error = %e, "Stored divination record has malformed JSON");
    CoreError::Store(format!("Malformed stored JSON: {e}"))
}

// ---------------------------------------------------------------------------
// Hexagrams
// ---------------------------------------------------------------------------

/// [`HexagramStore`] over the `hexagrams` table. Rows are validated on read.
#[derive(Clone)]
pub struct PgHexagramStore {
    pool: DbPool,
}

impl PgHexagramStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HexagramStore for PgHexagramStore {
    async fn find_by_sequence(&self, sequence: u8) -> Result<Option<HexagramRef>, CoreError> {
        HexagramRepo::find_by_sequence(&self.pool, i16::from(sequence))
            .await
            .map_err(store_error)?
            .map(HexagramRef::try_from)
            .transpose()
    }

    async fn find_by_trigrams(
        &self,
        upper: Trigram,
        lower: Trigram,
    ) -> Result<Option<HexagramRef>, CoreError> {
        HexagramRepo::find_by_trigrams(&self.pool, upper.name(), lower.name())
            .await
            .map_err(store_error)?
            .map(HexagramRef::try_from)
            .transpose()
    }

    async fn find_all(&self) -> Result<Vec<HexagramRef>, CoreError> {
        HexagramRepo::list(&self.pool)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(HexagramRef::try_from)
            .collect()
    }

    async fn count(&self) -> Result<usize, CoreError> {
        let count = HexagramRepo::count(&self.pool).await.map_err(store_error)?;
        usize::try_from(count).map_err(|e| CoreError::Internal(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Divination records
// ---------------------------------------------------------------------------

/// [`DivinationRecordStore`] over the `divination_records` table.
#[derive(Clone)]
pub struct PgDivinationRecordStore {
    pool: DbPool,
}

impl PgDivinationRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DivinationRecordStore for PgDivinationRecordStore {
    async fn find_by_id(
        &self,
        id: DbId,
        owner_id: DbId,
    ) -> Result<Option<DivinationRecord>, CoreError> {
        DivinationRecordRepo::find_by_id_for_owner(&self.pool, id, owner_id)
            .await
            .map_err(store_error)?
            .map(|row| row.into_record().map_err(decode_error))
            .transpose()
    }

    async fn update(&self, id: DbId, patch: RecordPatch) -> Result<(), CoreError> {
        let input = UpdateDivinationRecord {
            result: patch
                .result
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .map_err(|e| CoreError::Internal(e.to_string()))?,
            ai_interpretation: patch
                .ai_interpretation
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .map_err(|e| CoreError::Internal(e.to_string()))?,
        };
        DivinationRecordRepo::update(&self.pool, id, &input)
            .await
            .map_err(store_error)?
            .ok_or(CoreError::NotFound {
                entity: "divination_record",
                id,
            })?;
        tracing::debug!(record_id = id, "Divination record updated");
        Ok(())
    }
}
