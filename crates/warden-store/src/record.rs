//! Storage-facing row types.

use serde::{Deserialize, Serialize};
use warden_core::{SessionId, Timestamp, UserId};

/// A session row as the storage layer sees it.
///
/// Token bytes are raw here; the auth layer wraps them in its opaque
/// token type at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Row id.
    pub id: SessionId,
    /// Owning user. At most one row per user.
    pub user_id: UserId,
    /// When the session was created or last refreshed.
    pub last_login: Timestamp,
    /// When the session lapses.
    pub expires_at: Timestamp,
    /// Bearer secret; `None` once the session has been closed.
    pub token: Option<Vec<u8>>,
    /// Set when the session was closed.
    pub expired: bool,
}

/// A user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Row id.
    pub id: UserId,
    /// Login name; unique.
    pub username: String,
    /// Derived credential hash.
    pub credential_hash: Vec<u8>,
}
