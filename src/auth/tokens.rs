//! Opaque bearer tokens
//!
//! Clients get 32 random bytes, URL-safe base64 encoded. Only the SHA-256
//! digest of that text is stored, so a leaked table cannot be replayed.

use crate::db::models::Token;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const SCOPE_AUTHENTICATION: &str = "authentication";

/// Create a new token for `user_id` that expires after `ttl`
pub fn generate_token(user_id: i64, ttl: Duration, scope: &str) -> Token {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let plaintext = URL_SAFE_NO_PAD.encode(bytes);

    Token {
        hash: hash_token(&plaintext).to_vec(),
        plaintext,
        user_id,
        expiry: Utc::now() + ttl,
        scope: scope.to_string(),
    }
}

pub fn hash_token(plaintext: &str) -> [u8; 32] {
    Sha256::digest(plaintext.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token() {
        let token = generate_token(5, Duration::hours(24), SCOPE_AUTHENTICATION);
        assert_eq!(token.plaintext.len(), 43);
        assert_eq!(token.hash, hash_token(&token.plaintext).to_vec());
        assert_eq!(token.user_id, 5);
        assert_eq!(token.scope, "authentication");
        assert!(token.expiry > Utc::now() + Duration::hours(23));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_token(1, Duration::hours(1), SCOPE_AUTHENTICATION);
        let b = generate_token(1, Duration::hours(1), SCOPE_AUTHENTICATION);
        assert_ne!(a.plaintext, b.plaintext);
        assert_ne!(a.hash, b.hash);
    }
}
