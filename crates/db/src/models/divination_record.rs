//! Divination record row model and DTOs.

use iching_core::divination::DivinationResult;
use iching_core::record::{AiInterpretation, DivinationRecord};
use iching_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `divination_records` table.
#[derive(Debug, Clone, FromRow)]
pub struct DivinationRecordRow {
    pub id: DbId,
    pub user_id: DbId,
    pub question: Option<String>,
    pub result: serde_json::Value,
    pub ai_interpretation: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DivinationRecordRow {
    /// Decode the JSONB columns into the domain record.
    pub fn into_record(self) -> Result<DivinationRecord, serde_json::Error> {
        let result: DivinationResult = serde_json::from_value(self.result)?;
        let ai_interpretation: Option<AiInterpretation> = self
            .ai_interpretation
            .map(serde_json::from_value)
            .transpose()?;
        Ok(DivinationRecord {
            id: self.id,
            user_id: self.user_id,
            question: self.question,
            result,
            ai_interpretation,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DTO for creating a record from a fresh cast.
#[derive(Debug, Clone)]
pub struct CreateDivinationRecord {
    pub user_id: DbId,
    pub question: Option<String>,
    pub result: serde_json::Value,
}

impl CreateDivinationRecord {
    pub fn new(
        user_id: DbId,
        question: Option<String>,
        result: &DivinationResult,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            user_id,
            question,
            result: serde_json::to_value(result)?,
        })
    }
}

/// DTO for patching a record. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateDivinationRecord {
    pub result: Option<serde_json::Value>,
    pub ai_interpretation: Option<serde_json::Value>,
}
