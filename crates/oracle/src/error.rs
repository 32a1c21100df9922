use iching_core::error::CoreError;
use iching_core::types::DbId;

use crate::coordination::CoordinationError;

/// Failures of the external language-model call.
///
/// Messages never contain the bearer credential; upstream bodies are
/// truncated before they get here.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model call timed out after {after_secs}s")]
    Timeout { after_secs: u64 },

    #[error("Model endpoint rejected the credentials (HTTP {status})")]
    AuthFailed { status: u16 },

    #[error("Model endpoint is rate limiting requests (HTTP {status})")]
    RateLimited { status: u16 },

    #[error("Model call failed: {0}")]
    Generic(String),
}

impl ModelError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "EXTERNAL_MODEL_TIMEOUT",
            Self::AuthFailed { .. } => "EXTERNAL_MODEL_AUTH_FAILED",
            Self::RateLimited { .. } => "EXTERNAL_MODEL_RATE_LIMITED",
            Self::Generic(_) => "EXTERNAL_MODEL_GENERIC",
        }
    }
}

/// Errors returned by the AI interpretation orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("AI interpretation quota of {limit} per hour exceeded; retry in {retry_after_secs}s")]
    RateLimited { limit: u32, retry_after_secs: u64 },

    #[error("Divination record {record_id} not found")]
    RecordNotFound { record_id: DbId },

    #[error("AI interpretation for record {record_id} is already being generated")]
    GenerationInProgress {
        record_id: DbId,
        retry_after_secs: u64,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OracleError {
    /// Stable upper-snake code for API responses and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            Self::GenerationInProgress { .. } => "GENERATION_IN_PROGRESS",
            Self::Model(err) => err.code(),
            Self::Coordination(_) => "COORDINATION_UNAVAILABLE",
            Self::Core(CoreError::NoReferenceData) => "NO_REFERENCE_DATA",
            Self::Core(CoreError::NotFound { .. }) => "RECORD_NOT_FOUND",
            Self::Core(_) | Self::Serialization(_) => "INTERNAL_ERROR",
        }
    }

    /// The caller can fix or retry the request itself (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::RecordNotFound { .. }
                | Self::GenerationInProgress { .. }
        )
    }

    /// An upstream dependency failed (503).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Model(_) | Self::Coordination(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_errors_keep_distinct_codes() {
        let codes = [
            OracleError::from(ModelError::Timeout { after_secs: 60 }).code(),
            OracleError::from(ModelError::AuthFailed { status: 401 }).code(),
            OracleError::from(ModelError::RateLimited { status: 429 }).code(),
            OracleError::from(ModelError::Generic("boom".into())).code(),
        ];
        assert_eq!(
            codes,
            [
                "EXTERNAL_MODEL_TIMEOUT",
                "EXTERNAL_MODEL_AUTH_FAILED",
                "EXTERNAL_MODEL_RATE_LIMITED",
                "EXTERNAL_MODEL_GENERIC",
            ]
        );
    }

    #[test]
    fn classification() {
        let limited = OracleError::RateLimited {
            limit: 10,
            retry_after_secs: 5,
        };
        assert!(limited.is_client_error());
        assert!(!limited.is_unavailable());

        let model = OracleError::from(ModelError::Timeout { after_secs: 1 });
        assert!(model.is_unavailable());
        assert!(!model.is_client_error());

        assert_eq!(
            OracleError::from(CoreError::NoReferenceData).code(),
            "NO_REFERENCE_DATA"
        );
    }
}
