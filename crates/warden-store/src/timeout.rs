//! Call deadlines for gateway implementations.
//!
//! A slow or wedged store must not block the calling thread forever.
//! [`BoundedGateway`] runs every call on a detached thread and waits
//! for at most the configured deadline; an overrun surfaces as
//! [`StoreError::Timeout`] and the abandoned call is left to finish on
//! its own. The cost is one short-lived thread per in-flight call.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::warn;
use warden_core::{SessionId, Timestamp, UserId};

use crate::{SessionGateway, SessionRecord, StoreError, UserGateway, UserRecord};

/// Deadline configuration for gateway calls.
#[derive(Debug, Clone)]
pub struct DeadlineConfig {
    /// Wall-clock budget for a single gateway call.
    pub call: Duration,
}

impl DeadlineConfig {
    /// Create a configuration with the given per-call budget.
    pub fn new(call: Duration) -> Self {
        Self { call }
    }
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            call: Duration::from_secs(5),
        }
    }
}

/// Wraps a gateway so every call observes a wall-clock deadline.
pub struct BoundedGateway<G> {
    inner: Arc<G>,
    deadline: DeadlineConfig,
}

impl<G> BoundedGateway<G> {
    /// Wrap `inner` with the given deadline configuration.
    pub fn new(inner: Arc<G>, deadline: DeadlineConfig) -> Self {
        Self { inner, deadline }
    }
}

impl<G: Send + Sync + 'static> BoundedGateway<G> {
    fn call<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&G) -> Result<T, StoreError> + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        let inner = Arc::clone(&self.inner);
        thread::spawn(move || {
            let _ = tx.send(f(&inner));
        });

        match rx.recv_timeout(self.deadline.call) {
            Ok(result) => result,
            Err(_) => {
                warn!(deadline = ?self.deadline.call, "gateway call abandoned at deadline");
                Err(StoreError::Timeout(self.deadline.call))
            }
        }
    }
}

impl<G: SessionGateway + 'static> SessionGateway for BoundedGateway<G> {
    fn insert_session(
        &self,
        user_id: UserId,
        last_login: Timestamp,
        expires_at: Timestamp,
        token: &[u8],
    ) -> Result<SessionId, StoreError> {
        let token = token.to_vec();
        self.call(move |g| g.insert_session(user_id, last_login, expires_at, &token))
    }

    fn update_session_on_refresh(
        &self,
        user_id: UserId,
        token: &[u8],
        last_login: Timestamp,
        expires_at: Timestamp,
    ) -> Result<u64, StoreError> {
        let token = token.to_vec();
        self.call(move |g| g.update_session_on_refresh(user_id, &token, last_login, expires_at))
    }

    fn update_session_on_close(
        &self,
        id: SessionId,
        match_token: &[u8],
    ) -> Result<u64, StoreError> {
        let match_token = match_token.to_vec();
        self.call(move |g| g.update_session_on_close(id, &match_token))
    }

    fn select_session_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<SessionRecord>, StoreError> {
        self.call(move |g| g.select_session_by_user_id(user_id))
    }

    fn select_session_by_id(&self, id: SessionId) -> Result<Option<SessionRecord>, StoreError> {
        self.call(move |g| g.select_session_by_id(id))
    }
}

impl<G: UserGateway + 'static> UserGateway for BoundedGateway<G> {
    fn insert_user(&self, username: &str, credential_hash: &[u8]) -> Result<UserId, StoreError> {
        let username = username.to_owned();
        let credential_hash = credential_hash.to_vec();
        self.call(move |g| g.insert_user(&username, &credential_hash))
    }

    fn select_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.call(move |g| g.select_user_by_id(id))
    }

    fn select_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let username = username.to_owned();
        self.call(move |g| g.select_user_by_username(&username))
    }

    fn select_credential_hash(
        &self,
        username: &str,
    ) -> Result<Option<(UserId, Vec<u8>)>, StoreError> {
        let username = username.to_owned();
        self.call(move |g| g.select_credential_hash(&username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryGateway;

    /// Gateway double that stalls on every session select.
    struct StallGateway {
        delay: Duration,
    }

    impl SessionGateway for StallGateway {
        fn insert_session(
            &self,
            _user_id: UserId,
            _last_login: Timestamp,
            _expires_at: Timestamp,
            _token: &[u8],
        ) -> Result<SessionId, StoreError> {
            thread::sleep(self.delay);
            Ok(SessionId::new(1))
        }

        fn update_session_on_refresh(
            &self,
            _user_id: UserId,
            _token: &[u8],
            _last_login: Timestamp,
            _expires_at: Timestamp,
        ) -> Result<u64, StoreError> {
            thread::sleep(self.delay);
            Ok(1)
        }

        fn update_session_on_close(
            &self,
            _id: SessionId,
            _match_token: &[u8],
        ) -> Result<u64, StoreError> {
            thread::sleep(self.delay);
            Ok(1)
        }

        fn select_session_by_user_id(
            &self,
            _user_id: UserId,
        ) -> Result<Option<SessionRecord>, StoreError> {
            thread::sleep(self.delay);
            Ok(None)
        }

        fn select_session_by_id(
            &self,
            _id: SessionId,
        ) -> Result<Option<SessionRecord>, StoreError> {
            thread::sleep(self.delay);
            Ok(None)
        }
    }

    #[test]
    fn test_deadline_trips_on_slow_store() {
        let slow = Arc::new(StallGateway {
            delay: Duration::from_millis(200),
        });
        let bounded = BoundedGateway::new(slow, DeadlineConfig::new(Duration::from_millis(20)));

        let result = bounded.select_session_by_user_id(UserId::new(1));
        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }

    #[test]
    fn test_fast_calls_pass_through() {
        let gw = Arc::new(MemoryGateway::new());
        let bounded = BoundedGateway::new(Arc::clone(&gw), DeadlineConfig::default());

        let user = UserId::new(1);
        let id = bounded.insert_session(user, 1, 2, b"tok").unwrap();
        let record = bounded.select_session_by_id(id).unwrap().unwrap();
        assert_eq!(record.user_id, user);
    }

    #[test]
    fn test_user_calls_pass_through() {
        let gw = Arc::new(MemoryGateway::new());
        let bounded = BoundedGateway::new(Arc::clone(&gw), DeadlineConfig::default());

        bounded.insert_user("ada", b"hash").unwrap();
        assert!(bounded.select_user_by_username("ada").unwrap().is_some());
        assert!(bounded.select_credential_hash("ada").unwrap().is_some());
    }
}
