//! The key store capability.

use crate::cipher::CipherSession;
use crate::error::Result;
use crate::key::KeyHandle;
use crate::models::KeyStoreStatus;

/// Secure storage for named keys, able to initialize cipher sessions over them.
///
/// Implementations never expose raw key bytes. Sessions they return are locked
/// until the [`BiometricGate`](crate::BiometricGate) approves them.
pub trait KeyStore: Send + Sync {
    /// Check whether the backend can be used right now.
    fn check_availability(&self) -> KeyStoreStatus;

    /// Return the key named `name`, generating it on first use.
    ///
    /// A key that has been invalidated by biometric re-enrollment is still
    /// returned; the invalidation surfaces when a cipher is initialized.
    fn get_or_create_key(&self, name: &str) -> Result<KeyHandle>;

    /// Initialize a session that encrypts under `key` with a fresh IV.
    fn cipher_for_encryption(&self, key: &KeyHandle) -> Result<CipherSession>;

    /// Initialize a session that decrypts under `key` with a stored IV.
    fn cipher_for_decryption(&self, key: &KeyHandle, iv: &[u8]) -> Result<CipherSession>;

    /// Remove the key named `name`. Succeeds if the key does not exist.
    fn delete_key(&self, name: &str) -> Result<()>;
}
