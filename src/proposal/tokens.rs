//! Share and edit token generation
//!
//! Tokens are random bytes from the OS generator encoded as URL-safe base64
//! without padding, so they can be pasted straight into a link.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Bytes behind a public share token (16 chars)
pub const SHARE_TOKEN_BYTES: usize = 12;

/// Bytes behind a secret edit token (24 chars)
pub const EDIT_TOKEN_BYTES: usize = 18;

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Public token used in `/p/{token}` links
pub fn generate_share_token() -> String {
    random_token(SHARE_TOKEN_BYTES)
}

/// Owner secret required for every content write
pub fn generate_edit_token() -> String {
    random_token(EDIT_TOKEN_BYTES)
}

/// Compare a presented token with the stored one.
///
/// Both sides are hashed first so the comparison runs over fixed-size digests.
pub fn tokens_match(presented: &str, stored: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(stored.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Cheap shape check before hitting storage
pub fn is_well_formed(token: &str) -> bool {
    (8..=64).contains(&token.len())
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
