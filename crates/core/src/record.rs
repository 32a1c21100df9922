//! Divination records and the AI interpretation attached to them.
//!
//! Records are owned by the CRUD layer; this core only reads them and
//! patches the cast result and the AI interpretation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::divination::DivinationResult;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// AI interpretation
// ---------------------------------------------------------------------------

/// Long-form reading produced by the external language model.
///
/// Once attached to a record it is returned verbatim on every later
/// request for that record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiInterpretation {
    pub summary: String,
    pub detailed_analysis: String,
    pub advice: String,
    pub model_id: String,
    /// SHA-256 hex digest of the prompt that produced this reading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_digest: Option<String>,
    pub created_at: Timestamp,
    /// `true` when the value was copied from the shared response cache
    /// rather than generated for this record.
    #[serde(default)]
    pub served_from_cache: bool,
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivinationRecord {
    pub id: DbId,
    pub user_id: DbId,
    pub question: Option<String>,
    pub result: DivinationResult,
    pub ai_interpretation: Option<AiInterpretation>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Fields this core is allowed to change on a record. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub result: Option<DivinationResult>,
    pub ai_interpretation: Option<AiInterpretation>,
}

impl RecordPatch {
    pub fn ai_interpretation(interpretation: AiInterpretation) -> Self {
        Self {
            ai_interpretation: Some(interpretation),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_none() && self.ai_interpretation.is_none()
    }
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Persistence for divination records, scoped by owner on read.
#[async_trait]
pub trait DivinationRecordStore: Send + Sync {
    /// Load record `id` only if it belongs to `owner_id`.
    async fn find_by_id(
        &self,
        id: DbId,
        owner_id: DbId,
    ) -> Result<Option<DivinationRecord>, CoreError>;

    /// Apply `patch` to record `id`. Fails with [`CoreError::NotFound`] when
    /// the record does not exist.
    async fn update(&self, id: DbId, patch: RecordPatch) -> Result<(), CoreError>;
}

#[async_trait]
impl<T: DivinationRecordStore + ?Sized> DivinationRecordStore for Arc<T> {
    async fn find_by_id(
        &self,
        id: DbId,
        owner_id: DbId,
    ) -> Result<Option<DivinationRecord>, CoreError> {
        (**self).find_by_id(id, owner_id).await
    }

    async fn update(&self, id: DbId, patch: RecordPatch) -> Result<(), CoreError> {
        (**self).update(id, patch).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn interpretation() -> AiInterpretation {
        AiInterpretation {
            summary: "s".into(),
            detailed_analysis: "d".into(),
            advice: "a".into(),
            model_id: "test-model".into(),
            prompt_digest: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            served_from_cache: false,
        }
    }

    #[test]
    fn interpretation_json_round_trips_exactly() {
        let original = interpretation();
        let json = serde_json::to_string(&original).unwrap();
        assert!(!json.contains("prompt_digest"));
        let back: AiInterpretation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
        assert_eq!(serde_json::to_string(&back).unwrap(), json);
    }

    #[test]
    fn patch_constructor_sets_only_ai_field() {
        let patch = RecordPatch::ai_interpretation(interpretation());
        assert!(patch.result.is_none());
        assert!(!patch.is_empty());
        assert!(RecordPatch::default().is_empty());
    }
}
