// web-server/src/auth/signature.rs
//! Recovery of the signing wallet from a `personal_sign` signature.
//!
//! Wallets sign `keccak256("\x19Ethereum Signed Message:\n" + len + message)` and
//! return `r || s || v` as 65 bytes of hex, with `v` either 0/1 or 27/28.

use alloy_primitives::{eip191_hash_message, keccak256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use thiserror::Error;

const SIGNATURE_LEN: usize = 65;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature is not 65 bytes of hex")]
    Malformed,

    #[error("unsupported recovery byte {0}")]
    RecoveryByte(u8),

    #[error("public key could not be recovered")]
    Unrecoverable,
}

/// Recover the lower-cased address that signed `message`
pub fn recover_signer(message: &str, signature: &str) -> Result<String, SignatureError> {
    let raw = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = hex::decode(raw).map_err(|_| SignatureError::Malformed)?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(SignatureError::Malformed);
    }

    let v = bytes[64];
    let mut parity = match v {
        0 | 27 => 0u8,
        1 | 28 => 1u8,
        other => return Err(SignatureError::RecoveryByte(other)),
    };

    let mut sig = Signature::from_slice(&bytes[..64]).map_err(|_| SignatureError::Malformed)?;
    // (r, n - s) recovers the same key with the opposite parity
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        parity ^= 1;
    }
    let recovery_id = RecoveryId::from_byte(parity).ok_or(SignatureError::RecoveryByte(v))?;

    let digest = eip191_hash_message(message.as_bytes());
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id)
        .map_err(|_| SignatureError::Unrecoverable)?;

    Ok(public_key_to_address(&key))
}

/// Lower-cased `0x` address of a secp256k1 public key
pub fn public_key_to_address(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    // skip the 0x04 SEC1 tag
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash.as_slice()[12..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sign_personal_message, test_signing_key};

    #[test]
    fn test_recovers_signer() {
        let key = test_signing_key(1);
        let expected = public_key_to_address(key.verifying_key());
        let signature = sign_personal_message(&key, "hello");

        assert_eq!(recover_signer("hello", &signature).unwrap(), expected);
    }

    #[test]
    fn test_known_key_address() {
        // private key 0x...01 is the generator point
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let key = k256::ecdsa::SigningKey::from_slice(&secret).unwrap();

        assert_eq!(
            public_key_to_address(key.verifying_key()),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_zero_one_recovery_byte_accepted() {
        let key = test_signing_key(2);
        let signature = sign_personal_message(&key, "hello");
        let mut bytes = hex::decode(&signature[2..]).unwrap();
        bytes[64] -= 27;

        let recovered = recover_signer("hello", &hex::encode(bytes)).unwrap();
        assert_eq!(recovered, public_key_to_address(key.verifying_key()));
    }

    #[test]
    fn test_different_message_recovers_other_address() {
        let key = test_signing_key(3);
        let signature = sign_personal_message(&key, "hello");

        let recovered = recover_signer("hello!", &signature).unwrap_or_default();
        assert_ne!(recovered, public_key_to_address(key.verifying_key()));
    }

    #[test]
    fn test_malformed_signatures() {
        assert_eq!(recover_signer("hello", "0x1234"), Err(SignatureError::Malformed));
        assert_eq!(recover_signer("hello", "not hex"), Err(SignatureError::Malformed));

        let key = test_signing_key(4);
        let signature = sign_personal_message(&key, "hello");
        let mut bytes = hex::decode(&signature[2..]).unwrap();
        bytes[64] = 5;
        assert_eq!(
            recover_signer("hello", &hex::encode(bytes)),
            Err(SignatureError::RecoveryByte(5))
        );
    }
}
