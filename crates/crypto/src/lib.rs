//! Credential Store: symmetric authenticated encryption for account
//! tokens at rest.
//!
//! A master key is derived once per process from the `ENCRYPTION_KEY`
//! password via PBKDF2-HMAC-SHA256 (fixed salt, 100,000 iterations),
//! then used to seal/open individual token values with AES-256-GCM. The
//! wire format is `base64(nonce || sealed_bytes)` — no separate framing,
//! since the nonce length is fixed and the AEAD tag is already appended
//! to the sealed bytes by `aes-gcm`.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use sha2::Sha256;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Deployment-wide constant. Not a secret in itself — it exists to
/// defeat precomputed rainbow tables across deployments, not to hide
/// the derivation from someone who already has the password. Operators
/// wanting per-deployment isolation rotate `ENCRYPTION_KEY` instead.
const PBKDF2_SALT: &[u8] = b"timeline-credential-store-v1";
const PBKDF2_ITERATIONS: u32 = 100_000;
const KEY_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid base64 ciphertext")]
    InvalidEncoding,
    #[error("ciphertext too short to contain a nonce")]
    Truncated,
    #[error("decryption failed (wrong key or corrupted ciphertext)")]
    DecryptionFailed,
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("payload was not valid JSON")]
    InvalidJson,
}

/// A derived 256-bit AES key. `Debug` is redacted; the bytes are wiped
/// on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterKey(REDACTED)")
    }
}

impl MasterKey {
    /// Derives a `MasterKey` from a password using PBKDF2-HMAC-SHA256
    /// with the fixed deployment salt and 100,000 iterations, per the
    /// credential store's key-derivation policy.
    #[must_use]
    pub fn derive_from_password(password: &str) -> Self {
        let mut key = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), PBKDF2_SALT, PBKDF2_ITERATIONS, &mut key);
        Self(key)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

/// Encrypts `plaintext` under `key`, returning `base64(nonce || sealed)`.
/// Each call uses a freshly generated random nonce, so encrypting the
/// same plaintext twice yields different ciphertexts.
pub fn encrypt_value(plaintext: &str, key: &MasterKey) -> Result<String, CryptoError> {
    let cipher = key.cipher();
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;
    let mut out = Vec::with_capacity(nonce.len() + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(BASE64.encode(out))
}

/// Inverse of `encrypt_value`.
pub fn decrypt_value(ciphertext: &str, key: &MasterKey) -> Result<SecretString, CryptoError> {
    let raw = BASE64.decode(ciphertext).map_err(|_| CryptoError::InvalidEncoding)?;
    if raw.len() < 12 {
        return Err(CryptoError::Truncated);
    }
    let (nonce_bytes, sealed) = raw.split_at(12);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = key.cipher();
    let plaintext = cipher
        .decrypt(nonce, sealed)
        .map_err(|_| CryptoError::DecryptionFailed)?;
    let s = String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)?;
    Ok(SecretString::new(s))
}

/// A thin wrapper bundling a derived key with JSON convenience methods,
/// for callers (the credential store's account-token path) that prefer
/// not to juggle `MasterKey` directly.
#[derive(Clone)]
pub struct PayloadEncryptor {
    key: MasterKey,
}

impl fmt::Debug for PayloadEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadEncryptor").finish_non_exhaustive()
    }
}

impl PayloadEncryptor {
    #[must_use]
    pub fn from_password(password: &str) -> Self {
        Self { key: MasterKey::derive_from_password(password) }
    }

    #[must_use]
    pub fn from_key(key: MasterKey) -> Self {
        Self { key }
    }

    pub fn encrypt_str(&self, plaintext: &str) -> Result<String, CryptoError> {
        encrypt_value(plaintext, &self.key)
    }

    pub fn decrypt_str(&self, ciphertext: &str) -> Result<SecretString, CryptoError> {
        decrypt_value(ciphertext, &self.key)
    }

    pub fn encrypt_json<T: Serialize>(&self, value: &T) -> Result<String, CryptoError> {
        let json = serde_json::to_string(value).map_err(|_| CryptoError::InvalidJson)?;
        self.encrypt_str(&json)
    }

    pub fn decrypt_json<T: DeserializeOwned>(&self, ciphertext: &str) -> Result<T, CryptoError> {
        let secret = self.decrypt_str(ciphertext)?;
        serde_json::from_str(secret.expose_secret()).map_err(|_| CryptoError::InvalidJson)
    }
}
