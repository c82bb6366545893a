use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid short key: {0}")]
    InvalidShortKey(String),
}

/// Classified failures returned by a [`MappingStore`](crate::MappingStore).
///
/// The two conflict variants are the only ones the allocator recovers from.
/// Everything else is surfaced to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("short key already exists: {0}")]
    KeyConflict(String),
    #[error("original url already mapped: {0}")]
    UrlConflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("store is closed")]
    Closed,
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StoreError {
    /// Returns `true` for uniqueness violations on either column.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::KeyConflict(_) | StoreError::UrlConflict(_))
    }

    /// Returns `true` when the backend could not be reached in time.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Timeout(_) | StoreError::Closed
        )
    }
}

/// Errors surfaced by an [`Allocator`](crate::Allocator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("no unique short key found after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("short key not found: {0}")]
    NotFound(String),
    #[error("allocation cancelled")]
    Cancelled,
    #[error("invalid allocator settings: {0}")]
    InvalidSettings(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AllocationError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AllocationError::NotFound(_))
    }
}
