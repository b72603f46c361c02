//! Authentication and session error types.

use thiserror::Error;
use warden_store::StoreError;

/// Error taxonomy surfaced by every public operation in this crate.
///
/// Raw [`StoreError`]s never escape; they are wrapped into the
/// operation-scoped variants below and remain reachable through
/// `source()` for diagnostics.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Storage unreachable, or a gateway call exceeded its deadline.
    #[error("service unavailable")]
    ServiceUnavailable(#[source] StoreError),

    /// Session or credential row absent for the requested key.
    #[error("resource not found")]
    ResourceNotFound,

    /// Unexpected storage failure while creating a row.
    #[error("create failed: {0}")]
    CreateFailed(#[source] StoreError),

    /// Unexpected storage failure while updating a row.
    #[error("update failed: {0}")]
    UpdateFailed(#[source] StoreError),

    /// Unexpected storage failure while closing a session.
    #[error("delete failed: {0}")]
    DeleteFailed(#[source] StoreError),

    /// Unexpected storage failure while reading.
    #[error("get failed: {0}")]
    GetFailed(#[source] StoreError),

    /// Presented token does not match the stored token.
    #[error("authorization failed")]
    AuthorizationFailed,

    /// Rejected locally, before any gateway call.
    #[error("bad request: {0}")]
    BadRequest(&'static str),
}

impl AuthError {
    /// True when the caller's credentials were rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, AuthError::AuthorizationFailed)
    }

    /// True when the requested row does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AuthError::ResourceNotFound)
    }

    /// True when the request was rejected before reaching storage.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, AuthError::BadRequest(_))
    }

    /// True when the failure is on the storage side.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            AuthError::ServiceUnavailable(_)
                | AuthError::CreateFailed(_)
                | AuthError::UpdateFailed(_)
                | AuthError::DeleteFailed(_)
                | AuthError::GetFailed(_)
        )
    }
}

/// Step during which a storage failure occurred.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Op {
    Create,
    Update,
    Delete,
    Get,
}

/// Wrap a gateway failure into the public taxonomy. Connectivity and
/// deadline failures map to [`AuthError::ServiceUnavailable`] no matter
/// which step raised them.
pub(crate) fn store_failure(op: Op, err: StoreError) -> AuthError {
    if err.is_unavailable() {
        return AuthError::ServiceUnavailable(err);
    }
    match op {
        Op::Create => AuthError::CreateFailed(err),
        Op::Update => AuthError::UpdateFailed(err),
        Op::Delete => AuthError::DeleteFailed(err),
        Op::Get => AuthError::GetFailed(err),
    }
}
