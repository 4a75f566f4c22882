//! Error types for the keyguard layer.

use serde::{Deserialize, Serialize};

use crate::models::CipherMode;

/// Result type alias for keyguard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while managing keys, cipher sessions and ceremonies.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", content = "message")]
pub enum Error {
    /// The secure store is unavailable or its contents are unreadable.
    #[error("Key store unavailable: {0}")]
    KeyStore(String),

    /// Key names identify entries in the store and cannot be empty.
    #[error("Key name must not be empty")]
    EmptyKeyName,

    /// The handle refers to a key that no longer exists in the store.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Biometric enrollment changed since the key was created.
    /// The key can never be used again and biometric login must be re-enabled.
    #[error("Key permanently invalidated - biometric enrollment changed")]
    KeyPermanentlyInvalidated,

    /// The initialization vector does not have the length the cipher requires.
    #[error("Invalid initialization vector: expected {expected} bytes, got {actual}")]
    InvalidIv { expected: usize, actual: usize },

    /// The cipher was used for an operation it was not initialized for.
    #[error("Cipher initialized for {actual}, cannot be used to {expected}")]
    WrongMode { expected: CipherMode, actual: CipherMode },

    /// Ciphertext, IV and key do not belong together (tampered or stale record).
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The AEAD transform refused to encrypt.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// A biometric ceremony is already prompting on this gate.
    #[error("A biometric ceremony is already in progress")]
    GateBusy,

    /// I/O error while reading or writing the key file.
    #[error("I/O error: {0}")]
    Io(String),

    /// Platform-specific internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
