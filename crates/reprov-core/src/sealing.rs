//! Sealed-box encryption of secret values.
//!
//! GitHub Actions secrets must be uploaded encrypted under the repository's
//! X25519 public key using libsodium's `crypto_box_seal` construction
//! (ephemeral keypair + X25519 + XSalsa20-Poly1305). Only the recipient
//! public key is needed; every call produces a fresh ciphertext.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use crypto_box::aead::OsRng;
use crypto_box::PublicKey;

use crate::error::{ProvisionError, Result};

/// Length of an X25519 public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Bytes a sealed box adds on top of the plaintext (ephemeral key + MAC).
pub const SEAL_OVERHEAD: usize = 48;

/// Decode a base64 repository public key.
pub fn decode_public_key(key_b64: &str) -> Result<PublicKey> {
    let bytes = STANDARD
        .decode(key_b64.trim())
        .map_err(|e| ProvisionError::InvalidPublicKey(e.to_string()))?;
    let bytes: [u8; PUBLIC_KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
        ProvisionError::InvalidPublicKey(format!(
            "expected {PUBLIC_KEY_LEN} bytes, got {}",
            bytes.len()
        ))
    })?;
    Ok(PublicKey::from(bytes))
}

/// Seal `plaintext` for `public_key` and return the raw sealed box.
pub fn seal(public_key: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    public_key
        .seal(&mut OsRng, plaintext)
        .map_err(|e| ProvisionError::Sealing(e.to_string()))
}

/// Seal `secret_value` under the base64 `key_b64` and base64-encode the result,
/// which is the form the secrets endpoint expects in `encrypted_value`.
pub fn seal_secret(key_b64: &str, secret_value: &str) -> Result<String> {
    let public_key = decode_public_key(key_b64)?;
    let sealed = seal(&public_key, secret_value.as_bytes())?;
    Ok(STANDARD.encode(sealed))
}
