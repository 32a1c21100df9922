use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The hexagram reference store holds no rows, so nothing can be cast.
    #[error("Hexagram reference data is empty")]
    NoReferenceData,

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A collaborator store (database, catalog file) failed.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
