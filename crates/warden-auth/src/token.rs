//! Opaque secure tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque byte sequence minted by the token forge.
///
/// Tokens double as hashed credentials and as session bearer secrets.
/// They are never built by hand and never compared byte-by-byte in the
/// open; [`Token::matches`] is the only equality operation.
#[derive(Clone, Serialize, Deserialize)]
pub struct Token(Vec<u8>);

impl Token {
    /// Wrap bytes produced by the forge or loaded from a gateway row.
    pub(crate) fn from_stored(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw bytes, for persistence and for handing to the caller.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length token.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compare candidate bytes against this token in constant time.
    pub fn matches(&self, candidate: &[u8]) -> bool {
        constant_time_compare(candidate, &self.0)
    }

    /// Short base64 prefix for logs. Never the full token.
    fn fingerprint(&self) -> String {
        let head = &self.0[..self.0.len().min(6)];
        URL_SAFE_NO_PAD.encode(head)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}..)", self.fingerprint())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..", self.fingerprint())
    }
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_equal_bytes() {
        let token = Token::from_stored(vec![1, 2, 3, 4]);
        assert!(token.matches(&[1, 2, 3, 4]));
    }

    #[test]
    fn test_rejects_differing_bytes() {
        let token = Token::from_stored(vec![1, 2, 3, 4]);
        assert!(!token.matches(&[1, 2, 3, 5]));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let token = Token::from_stored(vec![1, 2, 3, 4]);
        assert!(!token.matches(&[1, 2, 3]));
        assert!(!token.matches(&[]));
    }

    #[test]
    fn test_debug_never_prints_raw_bytes() {
        let token = Token::from_stored(vec![0xde, 0xad, 0xbe, 0xef, 0xca, 0xfe, 0xba, 0xbe]);
        let rendered = format!("{:?}", token);
        assert!(rendered.starts_with("Token("));
        assert!(!rendered.contains("222")); // 0xde as decimal
        assert!(rendered.len() < 20);
    }
}
