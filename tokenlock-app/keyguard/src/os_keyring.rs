//! Key store backed by the OS keyring.
//!
//! Key material is kept in platform-native keyrings:
//! - **macOS**: Keychain Access
//! - **Windows**: Credential Manager
//! - **Linux**: Secret Service API (GNOME Keyring, KWallet)
//!
//! Desktop keyrings cannot bind a key to biometric enrollment, so keys stored
//! here are never invalidated; the biometric gate still guards every use.

use keyring::Entry;
use tracing::{debug, error, info, warn};

use crate::cipher::CipherSession;
use crate::error::{Error, Result};
use crate::key::{KeyHandle, StoredKey};
use crate::models::{KeyPolicy, KeyStoreMethod, KeyStoreStatus};
use crate::store::KeyStore;

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "com.tokenlock.keystore";

/// Account probed by the availability check.
const PROBE_ACCOUNT: &str = "availability-probe";

/// Key store keeping one keyring entry per key name.
pub struct KeyringKeyStore {
    service: String,
}

impl KeyringKeyStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, name: &str) -> Result<Entry> {
        Entry::new(&self.service, name).map_err(|e| {
            error!("Failed to create keyring entry for {}: {}", name, e);
            Self::map_keyring_error(e)
        })
    }

    fn load(&self, name: &str) -> Result<Option<StoredKey>> {
        let entry = self.entry(name)?;
        let encoded = match entry.get_password() {
            Ok(encoded) => encoded,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => {
                error!("Failed to read key {} from keyring: {:?}", name, e);
                return Err(Self::map_keyring_error(e));
            }
        };

        let bytes = base64_decode(&encoded)
            .map_err(|e| Error::KeyStore(format!("Failed to decode key {}: {}", name, e)))?;
        let stored: StoredKey = serde_json::from_slice(&bytes)
            .map_err(|e| Error::KeyStore(format!("Key {} corrupted: {}", name, e)))?;
        Ok(Some(stored))
    }

    fn usable_key(&self, handle: &KeyHandle) -> Result<StoredKey> {
        let stored = self
            .load(&handle.name)?
            .ok_or_else(|| Error::KeyNotFound(handle.name.clone()))?;
        if stored.handle.generation != handle.generation {
            warn!("Key {} was recreated since this handle was issued", handle.name);
            return Err(Error::KeyPermanentlyInvalidated);
        }
        Ok(stored)
    }

    /// Get the appropriate storage method for the current platform.
    fn get_platform_method() -> KeyStoreMethod {
        #[cfg(target_os = "macos")]
        {
            KeyStoreMethod::MacOSKeychain
        }
        #[cfg(target_os = "windows")]
        {
            KeyStoreMethod::WindowsCredentialManager
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            KeyStoreMethod::LinuxSecretService
        }
    }

    /// Map keyring errors to our error type.
    fn map_keyring_error(err: keyring::Error) -> Error {
        match err {
            keyring::Error::NoEntry => Error::KeyStore("No keyring entry".into()),
            keyring::Error::Ambiguous(_) => {
                Error::KeyStore("Multiple keyring entries found".into())
            }
            keyring::Error::NoStorageAccess(e) => {
                Error::KeyStore(format!("Keyring access denied: {:?}", e))
            }
            keyring::Error::PlatformFailure(e) => {
                Error::KeyStore(format!("Keyring platform failure: {:?}", e))
            }
            keyring::Error::BadEncoding(e) => {
                Error::KeyStore(format!("Keyring encoding error: {:?}", e))
            }
            _ => Error::Internal(format!("Keyring error: {}", err)),
        }
    }
}

impl Default for KeyringKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for KeyringKeyStore {
    fn check_availability(&self) -> KeyStoreStatus {
        let entry = match Entry::new(&self.service, PROBE_ACCOUNT) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Keyring not available: {}", e);
                return KeyStoreStatus::unavailable(format!("OS keyring not available: {}", e));
            }
        };
        let method = Self::get_platform_method();
        match entry.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => {
                debug!("Keyring available, method: {:?}", method);
                KeyStoreStatus::available(method)
            }
            Err(e) => {
                warn!("Keyring not accessible: {:?}", e);
                KeyStoreStatus::unavailable(format!("OS keyring not accessible: {}", e))
            }
        }
    }

    fn get_or_create_key(&self, name: &str) -> Result<KeyHandle> {
        if name.is_empty() {
            return Err(Error::EmptyKeyName);
        }
        if let Some(stored) = self.load(name)? {
            debug!("Using existing keyring key {}", name);
            return Ok(stored.handle.clone());
        }

        let policy = KeyPolicy {
            user_authentication_required: true,
            invalidated_by_biometric_enrollment: false,
        };
        let stored = StoredKey::generate(name, policy, 0);
        let bytes = serde_json::to_vec(&stored)
            .map_err(|e| Error::Internal(format!("Failed to serialize key: {}", e)))?;
        let encoded = base64_encode(&bytes);

        self.entry(name)?.set_password(&encoded).map_err(|e| {
            error!("Failed to store key {} in keyring: {:?}", name, e);
            Self::map_keyring_error(e)
        })?;

        // Read back through a fresh Entry so we are not looking at a cached value
        match self.load(name)? {
            Some(readback) if readback.handle.generation == stored.handle.generation => {
                info!("Generated key {} in OS keyring", name);
                Ok(stored.handle.clone())
            }
            _ => {
                error!("Keyring verification failed for key {}", name);
                Err(Error::Internal(
                    "Keyring verification failed: data mismatch".into(),
                ))
            }
        }
    }

    fn cipher_for_encryption(&self, key: &KeyHandle) -> Result<CipherSession> {
        let stored = self.usable_key(key)?;
        Ok(CipherSession::for_encryption(
            stored.handle.clone(),
            stored.material.clone(),
        ))
    }

    fn cipher_for_decryption(&self, key: &KeyHandle, iv: &[u8]) -> Result<CipherSession> {
        let stored = self.usable_key(key)?;
        CipherSession::for_decryption(stored.handle.clone(), stored.material.clone(), iv)
    }

    fn delete_key(&self, name: &str) -> Result<()> {
        // delete_credential errors on a missing entry, but delete is idempotent
        match self.entry(name)?.delete_credential() {
            Ok(()) => {
                info!("Key {} deleted from OS keyring", name);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No key {} to delete (already gone)", name);
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete key {} from keyring: {:?}", name, e);
                Err(Self::map_keyring_error(e))
            }
        }
    }
}

/// Base64 encode bytes to string.
fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Base64 decode string to bytes.
fn base64_decode(encoded: &str) -> std::result::Result<Vec<u8>, String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_roundtrip_of_binary() {
        let data = [0u8, 255, 1, 128, 64];
        let encoded = base64_encode(&data);
        assert_eq!(base64_decode(&encoded).unwrap(), data);
        assert!(base64_decode("not base64!").is_err());
    }

    #[test]
    fn test_empty_name_rejected_before_touching_keyring() {
        let store = KeyringKeyStore::new();
        assert!(matches!(
            store.get_or_create_key(""),
            Err(Error::EmptyKeyName)
        ));
    }
}
