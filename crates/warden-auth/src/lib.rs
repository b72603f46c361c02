//! Credential derivation and session lifecycle for warden.
//!
//! Provides the token forge (opaque secure tokens derived from user
//! secrets), the per-user session state machine, and the authorization
//! gate in front of them. Persistence goes through the ports in
//! `warden-store`; time goes through the injected clock from
//! `warden-core`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden_auth::{AuthorizationGate, Credentials, ForgeConfig, SessionConfig,
//!                   SessionStore, TokenForge, UserRegistry};
//! use warden_core::SystemClock;
//! use warden_store::{BoundedGateway, DeadlineConfig, MemoryGateway};
//!
//! // Wired once at process start; no hidden singletons.
//! let gateway = Arc::new(BoundedGateway::new(
//!     Arc::new(MemoryGateway::new()),
//!     DeadlineConfig::default(),
//! ));
//! let forge = Arc::new(TokenForge::new(ForgeConfig::default()));
//! let clock = Arc::new(SystemClock);
//!
//! let registry = UserRegistry::new(Arc::clone(&gateway), Arc::clone(&forge));
//! let sessions = SessionStore::new(
//!     Arc::clone(&gateway),
//!     Arc::clone(&forge),
//!     clock.clone(),
//!     SessionConfig::default(),
//! );
//!
//! let user = registry.register("ada", "correct-horse1")?;
//! let session = sessions.create_or_get(user.id)?;
//!
//! let gate = AuthorizationGate::new(gateway, forge, clock, Credentials::Bearer {
//!     session_id: session.id,
//!     token: session.token.as_ref().unwrap().as_bytes().to_vec(),
//! });
//! assert!(gate.is_authorized()?);
//! ```

mod error;
mod forge;
mod gate;
mod session;
mod token;
mod user;

pub use error::AuthError;
pub use forge::{ForgeConfig, TokenForge};
pub use gate::{AuthorizationGate, Credentials};
pub use session::{Session, SessionConfig, SessionStore};
pub use token::Token;
pub use user::{User, UserRegistry};
