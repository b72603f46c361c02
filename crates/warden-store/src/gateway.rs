//! The persistence gateway contract.
//!
//! Pure CRUD mechanism; lifecycle policy lives in the auth crate.
//! Backends must enforce one session row per user and unique
//! usernames, and should implement `update_session_on_close` as an
//! atomic compare-and-clear where the storage supports it.

use crate::{SessionRecord, StoreError, UserRecord};
use warden_core::{SessionId, Timestamp, UserId};

/// CRUD port for session rows.
pub trait SessionGateway: Send + Sync {
    /// Insert a fresh, non-expired session row and return its id.
    ///
    /// Fails with [`StoreError::Conflict`] if a row for `user_id`
    /// already exists.
    fn insert_session(
        &self,
        user_id: UserId,
        last_login: Timestamp,
        expires_at: Timestamp,
        token: &[u8],
    ) -> Result<SessionId, StoreError>;

    /// Replace the token of the user's session, clear its expired flag
    /// and stamp the new login and expiry times. Returns the number of
    /// affected rows (0 when the user has no session row).
    fn update_session_on_refresh(
        &self,
        user_id: UserId,
        token: &[u8],
        last_login: Timestamp,
        expires_at: Timestamp,
    ) -> Result<u64, StoreError>;

    /// Clear the token and set the expired flag of a session, but only
    /// where the stored token matches `match_token`. Returns the number
    /// of affected rows (0 on token mismatch or missing row).
    fn update_session_on_close(
        &self,
        id: SessionId,
        match_token: &[u8],
    ) -> Result<u64, StoreError>;

    /// Look up the session owned by a user.
    fn select_session_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<SessionRecord>, StoreError>;

    /// Look up a session by its id.
    fn select_session_by_id(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError>;
}

/// CRUD port for user rows.
pub trait UserGateway: Send + Sync {
    /// Insert a user with a derived credential hash; returns the new id.
    ///
    /// Fails with [`StoreError::Conflict`] when the username is taken.
    fn insert_user(&self, username: &str, credential_hash: &[u8]) -> Result<UserId, StoreError>;

    /// Look up a user by id.
    fn select_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Look up a user by username.
    fn select_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Resolve a username to its id and stored credential hash.
    fn select_credential_hash(
        &self,
        username: &str,
    ) -> Result<Option<(UserId, Vec<u8>)>, StoreError>;
}
