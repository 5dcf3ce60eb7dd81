// web-server/src/utils/token.rs
use rand::{thread_rng, RngCore};

/// Number of random bytes in a sign-in nonce
pub const NONCE_BYTES: usize = 32;

/// Generate a hex-encoded nonce with 256 bits of entropy
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
