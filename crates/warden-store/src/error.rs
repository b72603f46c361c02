//! Store error types.

use std::time::Duration;
use thiserror::Error;

/// Errors raised at the persistence gateway.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backing store is unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A call exceeded its deadline.
    #[error("store call exceeded deadline of {0:?}")]
    Timeout(Duration),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backend rejected or failed the operation.
    #[error("store operation failed: {0}")]
    Backend(String),
}

impl StoreError {
    /// True when the store could not be reached at all, including
    /// calls abandoned at their deadline.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }

    /// True for uniqueness-constraint violations.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}
