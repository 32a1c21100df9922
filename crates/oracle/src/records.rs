//! In-process divination record store for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use iching_core::divination::DivinationResult;
use iching_core::error::CoreError;
use iching_core::record::{DivinationRecord, DivinationRecordStore, RecordPatch};
use iching_core::types::DbId;

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<DbId, DivinationRecord>>,
    next_id: AtomicI64,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new record for `user_id` and return it.
    pub fn create(
        &self,
        user_id: DbId,
        question: Option<String>,
        result: DivinationResult,
    ) -> Result<DivinationRecord, CoreError> {
        let now = Utc::now();
        let record = DivinationRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            question,
            result,
            ai_interpretation: None,
            created_at: now,
            updated_at: now,
        };
        self.records
            .write()
            .map_err(|e| CoreError::Internal(e.to_string()))?
            .insert(record.id, record.clone());
        Ok(record)
    }

    /// Unscoped read, regardless of owner.
    pub fn get(&self, id: DbId) -> Option<DivinationRecord> {
        self.records
            .read()
            .ok()
            .and_then(|records| records.get(&id).cloned())
    }
}

#[async_trait]
impl DivinationRecordStore for InMemoryRecordStore {
    async fn find_by_id(
        &self,
        id: DbId,
        owner_id: DbId,
    ) -> Result<Option<DivinationRecord>, CoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        Ok(records
            .get(&id)
            .filter(|record| record.user_id == owner_id)
            .cloned())
    }

    async fn update(&self, id: DbId, patch: RecordPatch) -> Result<(), CoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        let record = records.get_mut(&id).ok_or(CoreError::NotFound {
            entity: "divination_record",
            id,
        })?;
        if let Some(result) = patch.result {
            record.result = result;
        }
        if let Some(interpretation) = patch.ai_interpretation {
            record.ai_interpretation = Some(interpretation);
        }
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use iching_core::divination::HexagramGenerator;
    use iching_core::testing::{sample_catalog, ScriptedCoins};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    async fn result() -> DivinationResult {
        HexagramGenerator::new(sample_catalog())
            .cast_with(&mut ScriptedCoins::from_head_counts([1, 1, 1, 1, 1, 1]), &mut StdRng::seed_from_u64(3))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reads_are_scoped_to_the_owner() {
        let store = InMemoryRecordStore::new();
        let record = store.create(7, None, result().await).unwrap();
        assert!(store.find_by_id(record.id, 7).await.unwrap().is_some());
        assert!(store.find_by_id(record.id, 8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_of_unknown_record_fails() {
        let store = InMemoryRecordStore::new();
        let err = store.update(99, RecordPatch::default()).await.unwrap_err();
        assert_matches!(err, CoreError::NotFound { id: 99, .. });
    }
}
