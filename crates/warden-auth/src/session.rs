//! Session lifecycle.
//!
//! [`SessionStore`] owns the per-user session state machine: a user
//! goes `NONE -> ACTIVE`, lapses to `EXPIRED`, returns to `ACTIVE` via
//! refresh, and ends at `CLOSED` once the token is cleared. A closed
//! token never authorizes again; the next `create_or_get` for that
//! user mints a fresh one in the same row. Policy only; row access
//! goes through the gateway port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use warden_core::{Clock, SessionId, Timestamp, UserId};
use warden_store::{SessionGateway, SessionRecord, StoreError};

use crate::error::{store_failure, Op};
use crate::{AuthError, Token, TokenForge};

/// Length of the random secret behind a minted session token.
const SESSION_SECRET_LEN: usize = 16;

/// Session duration configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Seconds a session stays live after login or refresh.
    pub ttl_secs: i64,
}

impl SessionConfig {
    /// Default session duration: 24 hours.
    pub const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: Self::DEFAULT_TTL_SECS,
        }
    }
}

/// A user's authenticated period of access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Row id.
    pub id: SessionId,
    /// Owning user.
    pub user_id: UserId,
    /// When the session was created or last refreshed.
    pub last_login: Timestamp,
    /// When the session lapses.
    pub expires_at: Timestamp,
    /// Bearer secret; cleared once the session is closed.
    pub token: Option<Token>,
    /// Set when the session was closed.
    pub expired: bool,
}

impl Session {
    /// Whether this session counts as expired at `now`: either the
    /// stored flag is set or the expiry time has passed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expired || now >= self.expires_at
    }

    fn from_record(record: SessionRecord) -> Self {
        Session {
            id: record.id,
            user_id: record.user_id,
            last_login: record.last_login,
            expires_at: record.expires_at,
            token: record.token.map(Token::from_stored),
            expired: record.expired,
        }
    }
}

/// Owns the per-user session lifecycle.
///
/// Constructed once at process start and shared by reference; all
/// collaborators are injected.
pub struct SessionStore<G> {
    gateway: Arc<G>,
    forge: Arc<TokenForge>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl<G: SessionGateway> SessionStore<G> {
    pub fn new(
        gateway: Arc<G>,
        forge: Arc<TokenForge>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        Self {
            gateway,
            forge,
            clock,
            config,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Idempotent entry point.
    ///
    /// Returns the user's live session unchanged if one exists,
    /// refreshes an expired one with a fresh token, or inserts a new
    /// row. The read-modify-write is serialized per user, and losing a
    /// cross-process insert race falls back to the winner's row.
    pub fn create_or_get(&self, user_id: UserId) -> Result<Session, AuthError> {
        let slot = self.user_lock(user_id);
        let _serialized = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let existing = self
            .gateway
            .select_session_by_user_id(user_id)
            .map_err(|e| store_failure(Op::Get, e))?;

        let now = self.clock.now();
        match existing {
            Some(record) => {
                let session = Session::from_record(record);
                if session.is_expired(now) {
                    self.refresh(user_id, now)
                } else {
                    debug!(%user_id, session = %session.id, "reusing live session");
                    Ok(session)
                }
            }
            None => self.insert(user_id, now),
        }
    }

    /// Look up the session owned by a user.
    pub fn get_by_user_id(&self, user_id: UserId) -> Result<Session, AuthError> {
        let record = self
            .gateway
            .select_session_by_user_id(user_id)
            .map_err(|e| store_failure(Op::Get, e))?
            .ok_or(AuthError::ResourceNotFound)?;
        Ok(Session::from_record(record))
    }

    /// Look up a session by its id.
    pub fn get_by_id(&self, id: SessionId) -> Result<Session, AuthError> {
        let record = self
            .gateway
            .select_session_by_id(id)
            .map_err(|e| store_failure(Op::Get, e))?
            .ok_or(AuthError::ResourceNotFound)?;
        Ok(Session::from_record(record))
    }

    /// Close a session, authorized by its own bearer token.
    ///
    /// The presented token is compared in constant time; a mismatch
    /// mutates nothing. The storage-side compare-and-clear closes the
    /// window between the check and the write.
    pub fn close(&self, id: SessionId, presented: &[u8]) -> Result<Session, AuthError> {
        if presented.is_empty() {
            return Err(AuthError::BadRequest("empty session token"));
        }

        let current = self.get_by_id(id)?;
        let authorized = current
            .token
            .as_ref()
            .map(|t| t.matches(presented))
            .unwrap_or(false);
        if !authorized {
            warn!(session = %id, "close rejected: token mismatch");
            return Err(AuthError::AuthorizationFailed);
        }

        let affected = self
            .gateway
            .update_session_on_close(id, presented)
            .map_err(|e| store_failure(Op::Delete, e))?;
        if affected == 0 {
            // compare-and-clear lost a race after the read above
            return Err(AuthError::AuthorizationFailed);
        }

        let closed = self.get_by_id(id)?;
        info!(session = %id, user = %closed.user_id, "session closed");
        Ok(closed)
    }

    fn insert(&self, user_id: UserId, now: Timestamp) -> Result<Session, AuthError> {
        let token = self.mint(user_id)?;
        let expires_at = now + self.config.ttl_secs;

        match self
            .gateway
            .insert_session(user_id, now, expires_at, token.as_bytes())
        {
            Ok(id) => {
                info!(%user_id, session = %id, "session created");
                Ok(Session {
                    id,
                    user_id,
                    last_login: now,
                    expires_at,
                    token: Some(token),
                    expired: false,
                })
            }
            Err(StoreError::Conflict(_)) => {
                // a concurrent writer beat us to the row; use theirs
                debug!(%user_id, "lost session creation race");
                let record = self
                    .gateway
                    .select_session_by_user_id(user_id)
                    .map_err(|e| store_failure(Op::Get, e))?
                    .ok_or(AuthError::ResourceNotFound)?;
                let session = Session::from_record(record);
                if session.is_expired(now) {
                    self.refresh(user_id, now)
                } else {
                    Ok(session)
                }
            }
            Err(e) => {
                warn!(%user_id, error = %e, "session insert failed");
                Err(store_failure(Op::Create, e))
            }
        }
    }

    fn refresh(&self, user_id: UserId, now: Timestamp) -> Result<Session, AuthError> {
        let token = self.mint(user_id)?;
        let expires_at = now + self.config.ttl_secs;

        let affected = self
            .gateway
            .update_session_on_refresh(user_id, token.as_bytes(), now, expires_at)
            .map_err(|e| store_failure(Op::Update, e))?;
        if affected == 0 {
            return Err(AuthError::ResourceNotFound);
        }

        let refreshed = self.get_by_user_id(user_id)?;
        info!(%user_id, session = %refreshed.id, "session refreshed");
        Ok(refreshed)
    }

    /// Mint a fresh bearer secret for `user_id`.
    fn mint(&self, user_id: UserId) -> Result<Token, AuthError> {
        let mut secret = [0u8; SESSION_SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut secret);
        self.forge.mint(&secret, &user_salt(user_id))
    }

    fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(user_id).or_default())
    }
}

/// Salt for session token derivation: the user's row id in decimal.
fn user_salt(user_id: UserId) -> Vec<u8> {
    user_id.value().to_string().into_bytes()
}
