//! In-memory gateway backend.
//!
//! Reference implementation of the gateway ports with the same
//! constraints a relational schema would enforce: one session row per
//! user, unique usernames. Read and mutation counters let tests assert
//! call patterns such as "no second write occurred".

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;
use warden_core::{SessionId, Timestamp, UserId};

use crate::{SessionGateway, SessionRecord, StoreError, UserGateway, UserRecord};

#[derive(Default)]
struct Tables {
    sessions: HashMap<SessionId, SessionRecord>,
    session_by_user: HashMap<UserId, SessionId>,
    users: HashMap<UserId, UserRecord>,
    user_by_name: HashMap<String, UserId>,
    next_session_id: i64,
    next_user_id: i64,
}

/// In-memory backend for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryGateway {
    tables: Mutex<Tables>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of select calls served so far.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of mutating calls served so far.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionGateway for MemoryGateway {
    fn insert_session(
        &self,
        user_id: UserId,
        last_login: Timestamp,
        expires_at: Timestamp,
        token: &[u8],
    ) -> Result<SessionId, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables();

        if tables.session_by_user.contains_key(&user_id) {
            return Err(StoreError::Conflict(format!(
                "session row already exists for user {user_id}"
            )));
        }

        tables.next_session_id += 1;
        let id = SessionId::new(tables.next_session_id);
        tables.sessions.insert(
            id,
            SessionRecord {
                id,
                user_id,
                last_login,
                expires_at,
                token: Some(token.to_vec()),
                expired: false,
            },
        );
        tables.session_by_user.insert(user_id, id);
        debug!(%user_id, session = %id, "session row inserted");
        Ok(id)
    }

    fn update_session_on_refresh(
        &self,
        user_id: UserId,
        token: &[u8],
        last_login: Timestamp,
        expires_at: Timestamp,
    ) -> Result<u64, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables();

        let Some(id) = tables.session_by_user.get(&user_id).copied() else {
            return Ok(0);
        };
        let Some(record) = tables.sessions.get_mut(&id) else {
            return Ok(0);
        };

        record.token = Some(token.to_vec());
        record.expired = false;
        record.last_login = last_login;
        record.expires_at = expires_at;
        Ok(1)
    }

    fn update_session_on_close(
        &self,
        id: SessionId,
        match_token: &[u8],
    ) -> Result<u64, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables();

        let Some(record) = tables.sessions.get_mut(&id) else {
            return Ok(0);
        };
        if record.token.as_deref() != Some(match_token) {
            return Ok(0);
        }

        record.token = None;
        record.expired = true;
        Ok(1)
    }

    fn select_session_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<SessionRecord>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables();
        let id = tables.session_by_user.get(&user_id);
        Ok(id.and_then(|id| tables.sessions.get(id)).cloned())
    }

    fn select_session_by_id(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables().sessions.get(&id).cloned())
    }
}

impl UserGateway for MemoryGateway {
    fn insert_user(&self, username: &str, credential_hash: &[u8]) -> Result<UserId, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables();

        if tables.user_by_name.contains_key(username) {
            return Err(StoreError::Conflict(format!(
                "username {username:?} already taken"
            )));
        }

        tables.next_user_id += 1;
        let id = UserId::new(tables.next_user_id);
        tables.users.insert(
            id,
            UserRecord {
                id,
                username: username.to_owned(),
                credential_hash: credential_hash.to_vec(),
            },
        );
        tables.user_by_name.insert(username.to_owned(), id);
        debug!(%id, username, "user row inserted");
        Ok(id)
    }

    fn select_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables().users.get(&id).cloned())
    }

    fn select_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables();
        let id = tables.user_by_name.get(username);
        Ok(id.and_then(|id| tables.users.get(id)).cloned())
    }

    fn select_credential_hash(
        &self,
        username: &str,
    ) -> Result<Option<(UserId, Vec<u8>)>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables();
        let id = tables.user_by_name.get(username);
        Ok(id
            .and_then(|id| tables.users.get(id))
            .map(|u| (u.id, u.credential_hash.clone())))
    }
}
