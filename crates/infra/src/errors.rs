use thiserror::Error;

use galley_core::{DomainError, ValidationErrors};

use crate::blob::BlobError;
use crate::store::StoreError;

/// Error returned by the application services (coordinator, inventory,
/// customers). The API layer maps each variant to a status code.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("not found")]
    NotFound,

    /// A stored recipe references an inventory item that no longer exists.
    #[error("integrity violated: {0}")]
    Integrity(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Blob(#[from] BlobError),
}

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(ValidationErrors::single(field, message))
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(errors) => Self::Validation(errors),
            DomainError::InvalidId(msg) => Self::validation("id", msg),
            DomainError::NotFound => Self::NotFound,
            DomainError::Integrity(msg) => Self::Integrity(msg),
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_kind() {
        assert!(matches!(ServiceError::from(DomainError::not_found()), ServiceError::NotFound));
        assert!(matches!(
            ServiceError::from(DomainError::integrity("gone")),
            ServiceError::Integrity(msg) if msg == "gone"
        ));
        match ServiceError::from(DomainError::invalid_id("bad uuid")) {
            ServiceError::Validation(errors) => assert_eq!(errors.fields()[0].field, "id"),
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn store_errors_convert_transparently() {
        let err: ServiceError = StoreError::Conflict("deadlock".to_string()).into();
        assert_eq!(err.to_string(), "storage conflict: deadlock");
    }
}
