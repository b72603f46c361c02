//! Admission decisions.
//!
//! [`AuthorizationGate`] resolves a caller's identity from one of two
//! mutually exclusive credential shapes and decides admission. Missing
//! credentials are detected locally, before any gateway call; callers
//! check [`AuthorizationGate::missing_credentials`] first and map it to
//! a bad-request outcome with zero side effects.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use warden_core::{Clock, SessionId};
use warden_store::{SessionGateway, UserGateway};

use crate::error::{store_failure, Op};
use crate::{AuthError, Token, TokenForge};

/// Caller-supplied credentials, one shape per request.
#[derive(Clone)]
pub enum Credentials {
    /// Username and password.
    Password { username: String, password: String },
    /// Session id plus the session's bearer token.
    Bearer {
        session_id: SessionId,
        token: Vec<u8>,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::Bearer { session_id, .. } => f
                .debug_struct("Bearer")
                .field("session_id", session_id)
                .finish_non_exhaustive(),
        }
    }
}

/// Decides admission for a single caller.
pub struct AuthorizationGate<G> {
    gateway: Arc<G>,
    forge: Arc<TokenForge>,
    clock: Arc<dyn Clock>,
    credentials: Credentials,
}

impl<G: SessionGateway + UserGateway> AuthorizationGate<G> {
    pub fn new(
        gateway: Arc<G>,
        forge: Arc<TokenForge>,
        clock: Arc<dyn Clock>,
        credentials: Credentials,
    ) -> Self {
        Self {
            gateway,
            forge,
            clock,
            credentials,
        }
    }

    /// True when required fields for the active credential shape are
    /// absent. Never touches the gateway.
    pub fn missing_credentials(&self) -> bool {
        match &self.credentials {
            Credentials::Password { username, password } => {
                username.trim().is_empty() || password.is_empty()
            }
            Credentials::Bearer { token, .. } => token.is_empty(),
        }
    }

    /// Decide admission.
    ///
    /// Unknown usernames and stale bearer tokens report unauthorized
    /// rather than erroring; only storage failures surface as errors.
    /// Missing credentials short-circuit to `Ok(false)` with zero
    /// gateway calls.
    pub fn is_authorized(&self) -> Result<bool, AuthError> {
        if self.missing_credentials() {
            return Ok(false);
        }

        match &self.credentials {
            Credentials::Password { username, password } => {
                self.check_password(username, password)
            }
            Credentials::Bearer { session_id, token } => self.check_bearer(*session_id, token),
        }
    }

    fn check_password(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let username = username.trim().to_lowercase();
        let resolved = self
            .gateway
            .select_credential_hash(&username)
            .map_err(|e| store_failure(Op::Get, e))?;

        let Some((user_id, stored)) = resolved else {
            debug!(%username, "unknown username; admission denied");
            return Ok(false);
        };

        let derived = self.forge.mint(password.as_bytes(), username.as_bytes())?;
        let admitted = derived.matches(&stored);
        if !admitted {
            debug!(%user_id, "credential mismatch; admission denied");
        }
        Ok(admitted)
    }

    /// A bearer token only admits while its session is live: the row
    /// must exist, must not have lapsed, and the presented bytes must
    /// match the stored token.
    fn check_bearer(&self, session_id: SessionId, token: &[u8]) -> Result<bool, AuthError> {
        let record = self
            .gateway
            .select_session_by_id(session_id)
            .map_err(|e| store_failure(Op::Get, e))?;

        let Some(record) = record else {
            debug!(session = %session_id, "unknown session; admission denied");
            return Ok(false);
        };
        if record.expired || self.clock.now() >= record.expires_at {
            return Ok(false);
        }
        let Some(stored) = record.token else {
            return Ok(false);
        };

        Ok(Token::from_stored(stored).matches(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ForgeConfig, SessionConfig, SessionStore, UserRegistry};
    use warden_core::{ManualClock, UserId};
    use warden_store::MemoryGateway;

    struct Fixture {
        gateway: Arc<MemoryGateway>,
        forge: Arc<TokenForge>,
        clock: Arc<ManualClock>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                gateway: Arc::new(MemoryGateway::new()),
                forge: Arc::new(TokenForge::new(ForgeConfig::default())),
                clock: Arc::new(ManualClock::at(1_000)),
            }
        }

        fn gate(&self, credentials: Credentials) -> AuthorizationGate<MemoryGateway> {
            AuthorizationGate::new(
                Arc::clone(&self.gateway),
                Arc::clone(&self.forge),
                Arc::clone(&self.clock) as Arc<dyn Clock>,
                credentials,
            )
        }

        fn registry(&self) -> UserRegistry<MemoryGateway> {
            UserRegistry::new(Arc::clone(&self.gateway), Arc::clone(&self.forge))
        }

        fn sessions(&self) -> SessionStore<MemoryGateway> {
            SessionStore::new(
                Arc::clone(&self.gateway),
                Arc::clone(&self.forge),
                Arc::clone(&self.clock) as Arc<dyn Clock>,
                SessionConfig::default(),
            )
        }
    }

    fn password_credentials(username: &str, password: &str) -> Credentials {
        Credentials::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_unknown_username_fails_closed() {
        let fx = Fixture::new();
        let gate = fx.gate(password_credentials("nobody", "whatever1"));

        assert!(!gate.missing_credentials());
        assert_eq!(gate.is_authorized().unwrap(), false);
    }

    #[test]
    fn test_missing_credentials_short_circuits() {
        let fx = Fixture::new();

        let gate = fx.gate(password_credentials("", "secret"));
        assert!(gate.missing_credentials());
        assert_eq!(gate.is_authorized().unwrap(), false);

        let gate = fx.gate(password_credentials("ada", ""));
        assert!(gate.missing_credentials());
        assert_eq!(gate.is_authorized().unwrap(), false);

        let gate = fx.gate(Credentials::Bearer {
            session_id: SessionId::new(1),
            token: Vec::new(),
        });
        assert!(gate.missing_credentials());
        assert_eq!(gate.is_authorized().unwrap(), false);

        assert_eq!(fx.gateway.reads(), 0, "no gateway call may happen");
    }

    #[test]
    fn test_password_admission_round_trip() {
        let fx = Fixture::new();
        fx.registry().register("ada", "correct-horse1").unwrap();

        let gate = fx.gate(password_credentials("ada", "correct-horse1"));
        assert_eq!(gate.is_authorized().unwrap(), true);

        let gate = fx.gate(password_credentials("ada", "wrong-horse1"));
        assert_eq!(gate.is_authorized().unwrap(), false);
    }

    #[test]
    fn test_password_admission_ignores_username_case() {
        let fx = Fixture::new();
        fx.registry().register("Ada", "correct-horse1").unwrap();

        let gate = fx.gate(password_credentials("ADA", "correct-horse1"));
        assert_eq!(gate.is_authorized().unwrap(), true);
    }

    #[test]
    fn test_bearer_admits_live_session_only() {
        let fx = Fixture::new();
        let sessions = fx.sessions();
        let session = sessions.create_or_get(UserId::new(7)).unwrap();
        let token = session.token.as_ref().unwrap().as_bytes().to_vec();

        let gate = fx.gate(Credentials::Bearer {
            session_id: session.id,
            token: token.clone(),
        });
        assert_eq!(gate.is_authorized().unwrap(), true);

        // wrong bytes are rejected
        let gate = fx.gate(Credentials::Bearer {
            session_id: session.id,
            token: vec![0u8; token.len()],
        });
        assert_eq!(gate.is_authorized().unwrap(), false);

        // unknown session is rejected
        let gate = fx.gate(Credentials::Bearer {
            session_id: SessionId::new(999),
            token: token.clone(),
        });
        assert_eq!(gate.is_authorized().unwrap(), false);
    }

    #[test]
    fn test_bearer_rejects_closed_session() {
        let fx = Fixture::new();
        let sessions = fx.sessions();
        let session = sessions.create_or_get(UserId::new(7)).unwrap();
        let token = session.token.as_ref().unwrap().as_bytes().to_vec();
        sessions.close(session.id, &token).unwrap();

        let gate = fx.gate(Credentials::Bearer {
            session_id: session.id,
            token,
        });
        assert_eq!(gate.is_authorized().unwrap(), false);
    }

    #[test]
    fn test_bearer_rejects_lapsed_session() {
        let fx = Fixture::new();
        let sessions = fx.sessions();
        let session = sessions.create_or_get(UserId::new(7)).unwrap();
        let token = session.token.as_ref().unwrap().as_bytes().to_vec();

        fx.clock.advance(SessionConfig::DEFAULT_TTL_SECS + 1);

        let gate = fx.gate(Credentials::Bearer {
            session_id: session.id,
            token,
        });
        assert_eq!(gate.is_authorized().unwrap(), false);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = password_credentials("ada", "super-secret");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("ada"));
        assert!(!rendered.contains("super-secret"));
    }
}
