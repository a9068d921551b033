use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not authenticated")]
    Unauthenticated,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found")]
    NotFound,
    #[error("an open contribution request already exists for this idea")]
    DuplicateRequest,
    #[error("conflict")]
    Conflict,
    #[error("dependency failed: {0}")]
    Dependency(String),
}
