//! User identities and registration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use warden_core::UserId;
use warden_store::{StoreError, UserGateway, UserRecord};

use crate::error::{store_failure, Op};
use crate::{AuthError, Token, TokenForge};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 128;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Row id.
    pub id: UserId,
    /// Login name, stored lowercase.
    pub username: String,
    /// Derived credential hash.
    pub credential_hash: Token,
}

impl User {
    fn from_record(record: UserRecord) -> Self {
        User {
            id: record.id,
            username: record.username,
            credential_hash: Token::from_stored(record.credential_hash),
        }
    }
}

/// Registration and lookup of users.
pub struct UserRegistry<G> {
    gateway: Arc<G>,
    forge: Arc<TokenForge>,
}

impl<G: UserGateway> UserRegistry<G> {
    pub fn new(gateway: Arc<G>, forge: Arc<TokenForge>) -> Self {
        Self { gateway, forge }
    }

    /// Register a new user.
    ///
    /// Username and password are validated locally before any gateway
    /// call; the credential hash is derived with the caller's username
    /// as the per-user salt, matching what the authorization gate
    /// recomputes at login.
    pub fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = normalize_username(username)?;
        validate_password(password)?;

        let hash = self.forge.mint(password.as_bytes(), username.as_bytes())?;
        let id = self
            .gateway
            .insert_user(&username, hash.as_bytes())
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::BadRequest("username already taken"),
                other => store_failure(Op::Create, other),
            })?;

        info!(%id, username = %username, "user registered");
        Ok(User {
            id,
            username,
            credential_hash: hash,
        })
    }

    /// Look up a user by id.
    pub fn find_by_id(&self, id: UserId) -> Result<User, AuthError> {
        let record = self
            .gateway
            .select_user_by_id(id)
            .map_err(|e| store_failure(Op::Get, e))?
            .ok_or(AuthError::ResourceNotFound)?;
        Ok(User::from_record(record))
    }

    /// Look up a user by username.
    pub fn find_by_username(&self, username: &str) -> Result<User, AuthError> {
        let username = username.trim().to_lowercase();
        let record = self
            .gateway
            .select_user_by_username(&username)
            .map_err(|e| store_failure(Op::Get, e))?
            .ok_or(AuthError::ResourceNotFound)?;
        Ok(User::from_record(record))
    }
}

/// Normalize and validate a username.
fn normalize_username(username: &str) -> Result<String, AuthError> {
    let username = username.trim();

    if username.len() < USERNAME_MIN {
        return Err(AuthError::BadRequest("username too short"));
    }
    if username.len() > USERNAME_MAX {
        return Err(AuthError::BadRequest("username too long"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AuthError::BadRequest("username has invalid characters"));
    }

    Ok(username.to_lowercase())
}

/// Reject passwords too weak to bother hashing.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < PASSWORD_MIN {
        return Err(AuthError::BadRequest("password too short"));
    }
    if password.len() > PASSWORD_MAX {
        return Err(AuthError::BadRequest("password too long"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ForgeConfig;
    use warden_store::MemoryGateway;

    fn registry() -> (UserRegistry<MemoryGateway>, Arc<MemoryGateway>) {
        let gateway = Arc::new(MemoryGateway::new());
        let forge = Arc::new(TokenForge::new(ForgeConfig::default()));
        (UserRegistry::new(Arc::clone(&gateway), forge), gateway)
    }

    #[test]
    fn test_register_and_find() {
        let (registry, _) = registry();
        let user = registry.register("Ada", "correct-horse1").unwrap();
        assert_eq!(user.username, "ada");

        let by_name = registry.find_by_username("ada").unwrap();
        assert_eq!(by_name.id, user.id);

        let by_id = registry.find_by_id(user.id).unwrap();
        assert_eq!(by_id.username, "ada");
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (registry, _) = registry();
        registry.register("ada", "correct-horse1").unwrap();

        let err = registry.register("ada", "other-horse1").unwrap_err();
        assert!(err.is_bad_request());
    }

    #[test]
    fn test_invalid_input_never_reaches_gateway() {
        let (registry, gateway) = registry();

        assert!(registry.register("ab", "correct-horse1").is_err());
        assert!(registry.register("a".repeat(40).as_str(), "pw12345678").is_err());
        assert!(registry.register("bad name", "correct-horse1").is_err());
        assert!(registry.register("ada", "short").is_err());
        assert!(registry
            .register("ada", "x".repeat(200).as_str())
            .is_err());

        assert_eq!(gateway.writes(), 0);
        assert_eq!(gateway.reads(), 0);
    }

    #[test]
    fn test_missing_user_reports_not_found() {
        let (registry, _) = registry();
        assert!(registry
            .find_by_username("nobody")
            .is_err_and(|e| e.is_not_found()));
        assert!(registry
            .find_by_id(UserId::new(42))
            .is_err_and(|e| e.is_not_found()));
    }

    #[test]
    fn test_credential_hash_matches_regenerated_token() {
        let (registry, _) = registry();
        let forge = TokenForge::new(ForgeConfig::default());

        let user = registry.register("ada", "correct-horse1").unwrap();
        let regenerated = forge.mint(b"correct-horse1", b"ada").unwrap();
        assert!(user.credential_hash.matches(regenerated.as_bytes()));
    }
}
