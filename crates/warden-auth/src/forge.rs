//! Token derivation.
//!
//! [`TokenForge`] turns human-supplied secrets into fixed-width opaque
//! tokens in three steps: interleave the secret with the salt, stretch
//! the key phrase into an AES key with PBKDF2, and encrypt the
//! interleaved buffer. Identical inputs always produce byte-identical
//! tokens; every failure path is a typed error, never an empty token.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockEncryptMut, KeyInit};
use aes::Aes128;
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use std::sync::{Condvar, Mutex, PoisonError};

use crate::{AuthError, Token};

/// Byte written when an index has no decimal-digit representation.
const POSITION_FALLBACK: u8 = 42;

/// AES-128 key length in bytes.
const KEY_LEN: usize = 16;

/// Forge configuration.
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    /// Phrase fed to the key-derivation step. Not secret; raises the
    /// cost of precomputing tokens for common passwords.
    pub key_phrase: String,
    /// Multiplier for the PBKDF2 iteration count.
    pub strength: u32,
    /// Upper bound on concurrent derivations.
    pub max_concurrent: usize,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            key_phrase: "warden.credentials".to_string(),
            strength: 3,
            max_concurrent: 4,
        }
    }
}

/// Derives opaque tokens from secrets.
///
/// Derivation is CPU-bound, so a counting gate caps how many run at
/// once; excess callers block until a permit frees up rather than
/// stacking up inside PBKDF2.
pub struct TokenForge {
    config: ForgeConfig,
    permits: PermitGate,
}

impl TokenForge {
    pub fn new(config: ForgeConfig) -> Self {
        let permits = PermitGate::new(config.max_concurrent.max(1));
        Self { config, permits }
    }

    /// The configuration this forge was built with.
    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    /// Derive a token from explicit inputs.
    ///
    /// Deterministic and sensitive to every input byte. Fails with
    /// [`AuthError::BadRequest`] on degenerate key material (empty key
    /// phrase or salt, zero strength) instead of degrading to an empty
    /// token.
    pub fn derive(
        &self,
        secret_phrase: &[u8],
        key_phrase: &str,
        salt: &[u8],
        strength: u32,
    ) -> Result<Token, AuthError> {
        let _permit = self.permits.acquire();

        let key = stretch_key(key_phrase, salt, strength)?;
        let plain = obfuscate(secret_phrase, salt);
        let cipher =
            ecb::Encryptor::<Aes128>::new((&key).into()).encrypt_padded_vec_mut::<Pkcs7>(&plain);

        Ok(Token::from_stored(cipher))
    }

    /// Derive a token with the forge's own key phrase and strength.
    pub fn mint(&self, secret_phrase: &[u8], salt: &[u8]) -> Result<Token, AuthError> {
        self.derive(
            secret_phrase,
            &self.config.key_phrase,
            salt,
            self.config.strength,
        )
    }
}

/// Stretch the key phrase into an AES-128 key.
///
/// The iteration count scales with every input:
/// `len(salt) * len(key_phrase) * strength`.
fn stretch_key(key_phrase: &str, salt: &[u8], strength: u32) -> Result<[u8; KEY_LEN], AuthError> {
    if key_phrase.is_empty() {
        return Err(AuthError::BadRequest("empty key phrase"));
    }
    if salt.is_empty() {
        return Err(AuthError::BadRequest("empty salt"));
    }
    if strength == 0 {
        return Err(AuthError::BadRequest("zero strength"));
    }

    let iterations = salt
        .len()
        .checked_mul(key_phrase.len())
        .and_then(|n| n.checked_mul(strength as usize))
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(AuthError::BadRequest("iteration count overflow"))?;

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha1>(key_phrase.as_bytes(), salt, iterations, &mut key);
    Ok(key)
}

/// Interleave two byte sequences into a buffer of twice the longer
/// length. The longer sequence occupies even positions; the shorter
/// occupies odd positions, padded past its end with the first decimal
/// digit of the index. Mixing only, no cryptographic strength on its
/// own.
fn obfuscate(token: &[u8], salt: &[u8]) -> Vec<u8> {
    let max = token.len().max(salt.len());
    let (long, short) = if token.len() == max {
        (token, salt)
    } else {
        (salt, token)
    };

    let mut out = vec![0u8; max * 2];
    for i in 0..max {
        let filler = short.get(i).copied().unwrap_or_else(|| position_byte(i));
        out[2 * i] = long[i];
        out[2 * i + 1] = filler;
    }
    out
}

/// First byte of the decimal representation of `position`.
fn position_byte(position: usize) -> u8 {
    position
        .to_string()
        .into_bytes()
        .first()
        .copied()
        .unwrap_or(POSITION_FALLBACK)
}

/// Counting gate bounding concurrent derivations.
struct PermitGate {
    available: Mutex<usize>,
    freed: Condvar,
}

impl PermitGate {
    fn new(permits: usize) -> Self {
        Self {
            available: Mutex::new(permits),
            freed: Condvar::new(),
        }
    }

    fn acquire(&self) -> Permit<'_> {
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        while *available == 0 {
            available = self
                .freed
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;
        Permit { gate: self }
    }

    fn release(&self) {
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        *available += 1;
        self.freed.notify_one();
    }
}

struct Permit<'a> {
    gate: &'a PermitGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
