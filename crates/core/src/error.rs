use crate::signing::DenyReason;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Access denied: {0}")]
    AccessDenied(DenyReason),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing photo.
    pub fn photo_not_found(photo_id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: "Photo",
            id: photo_id.to_string(),
        }
    }
}
