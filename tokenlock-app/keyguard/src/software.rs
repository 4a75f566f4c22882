//! Software key store.
//!
//! Keys live in memory and, when opened with a path, in an app-private JSON
//! file (`0600` on Unix) so they survive process restarts. The store tracks a
//! biometric enrollment epoch; keys whose policy binds them to enrollment are
//! permanently invalidated once the epoch moves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cipher::CipherSession;
use crate::error::{Error, Result};
use crate::key::{KeyHandle, StoredKey};
use crate::models::{KeyPolicy, KeyStoreMethod, KeyStoreStatus};
use crate::store::KeyStore;

/// Current key file format version.
const KEY_FILE_VERSION: u32 = 1;

/// Contents of the key file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyFile {
    version: u32,
    enrollment_epoch: u64,
    #[serde(default)]
    keys: HashMap<String, StoredKey>,
}

/// Key store backed by memory and an optional key file.
pub struct SoftwareKeyStore {
    path: Option<PathBuf>,
    policy: KeyPolicy,
    inner: Mutex<KeyFile>,
    unavailable: AtomicBool,
}

impl SoftwareKeyStore {
    /// Create a store that forgets its keys when dropped.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            policy: KeyPolicy::default(),
            inner: Mutex::new(KeyFile {
                version: KEY_FILE_VERSION,
                ..KeyFile::default()
            }),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Open (or lazily create) a store persisted at `path`.
    ///
    /// # Errors
    /// Returns `KeyStore` if the file exists but cannot be parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = if path.exists() {
            let content = std::fs::read(&path)?;
            let file: KeyFile = serde_json::from_slice(&content)
                .map_err(|e| Error::KeyStore(format!("Key file corrupted: {}", e)))?;
            if file.version != KEY_FILE_VERSION {
                return Err(Error::KeyStore(format!(
                    "Unsupported key file version {}",
                    file.version
                )));
            }
            debug!("Loaded {} keys from {:?}", file.keys.len(), path);
            file
        } else {
            debug!("No key file at {:?}, starting empty", path);
            KeyFile {
                version: KEY_FILE_VERSION,
                ..KeyFile::default()
            }
        };

        Ok(Self {
            path: Some(path),
            policy: KeyPolicy::default(),
            inner: Mutex::new(file),
            unavailable: AtomicBool::new(false),
        })
    }

    /// Use `policy` for keys generated from now on.
    pub fn with_policy(mut self, policy: KeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Simulate the user enrolling a new biometric.
    ///
    /// Every key bound to enrollment becomes permanently invalidated.
    pub fn simulate_enrollment_change(&self) -> Result<()> {
        let mut inner = self.lock()?;
        inner.enrollment_epoch += 1;
        self.persist(&inner)?;
        info!(
            "Biometric enrollment changed (epoch {})",
            inner.enrollment_epoch
        );
        Ok(())
    }

    /// Make every operation fail with `KeyStore` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, KeyFile>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::KeyStore("Secure store is unavailable".into()));
        }
        self.inner
            .lock()
            .map_err(|_| Error::KeyStore("Key store lock poisoned".into()))
    }

    /// Write the key file atomically (temp file, then rename).
    fn persist(&self, file: &KeyFile) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_vec(file)
            .map_err(|e| Error::KeyStore(format!("Failed to serialize keys: {}", e)))?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Resolve a handle to its stored key, enforcing generation and enrollment.
    fn usable_key<'a>(file: &'a KeyFile, handle: &KeyHandle) -> Result<&'a StoredKey> {
        let stored = file
            .keys
            .get(&handle.name)
            .ok_or_else(|| Error::KeyNotFound(handle.name.clone()))?;

        if stored.handle.generation != handle.generation {
            warn!("Key {} was recreated since this handle was issued", handle.name);
            return Err(Error::KeyPermanentlyInvalidated);
        }
        if stored.is_invalidated(file.enrollment_epoch) {
            warn!("Key {} invalidated by biometric enrollment change", handle.name);
            return Err(Error::KeyPermanentlyInvalidated);
        }
        Ok(stored)
    }
}

impl KeyStore for SoftwareKeyStore {
    fn check_availability(&self) -> KeyStoreStatus {
        match self.lock() {
            Ok(_) => KeyStoreStatus::available(KeyStoreMethod::Software),
            Err(e) => KeyStoreStatus::unavailable(e.to_string()),
        }
    }

    fn get_or_create_key(&self, name: &str) -> Result<KeyHandle> {
        if name.is_empty() {
            return Err(Error::EmptyKeyName);
        }

        let mut inner = self.lock()?;
        if let Some(stored) = inner.keys.get(name) {
            debug!("Using existing key {}", name);
            return Ok(stored.handle.clone());
        }

        let stored = StoredKey::generate(name, self.policy, inner.enrollment_epoch);
        let handle = stored.handle.clone();
        inner.keys.insert(name.to_string(), stored);

        if let Err(e) = self.persist(&inner) {
            inner.keys.remove(name);
            return Err(e);
        }

        info!("Generated key {} (generation {})", name, handle.generation);
        Ok(handle)
    }

    fn cipher_for_encryption(&self, key: &KeyHandle) -> Result<CipherSession> {
        let inner = self.lock()?;
        let stored = Self::usable_key(&inner, key)?;
        let session = CipherSession::for_encryption(stored.handle.clone(), stored.material.clone());
        debug!("Initialized encryption session {} for key {}", session.id(), key.name);
        Ok(session)
    }

    fn cipher_for_decryption(&self, key: &KeyHandle, iv: &[u8]) -> Result<CipherSession> {
        let inner = self.lock()?;
        let stored = Self::usable_key(&inner, key)?;
        let session =
            CipherSession::for_decryption(stored.handle.clone(), stored.material.clone(), iv)?;
        debug!("Initialized decryption session {} for key {}", session.id(), key.name);
        Ok(session)
    }

    fn delete_key(&self, name: &str) -> Result<()> {
        let mut inner = self.lock()?;
        match inner.keys.remove(name) {
            Some(stored) => {
                if let Err(e) = self.persist(&inner) {
                    inner.keys.insert(name.to_string(), stored);
                    return Err(e);
                }
                info!("Deleted key {}", name);
            }
            None => debug!("No key {} to delete (already gone)", name),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_returns_same_key() {
        let store = SoftwareKeyStore::in_memory();
        let first = store.get_or_create_key("login").unwrap();
        let second = store.get_or_create_key("login").unwrap();
        assert_eq!(first, second);

        let other = store.get_or_create_key("other").unwrap();
        assert_ne!(first.generation, other.generation);
    }

    #[test]
    fn test_empty_name_rejected() {
        let store = SoftwareKeyStore::in_memory();
        assert!(matches!(
            store.get_or_create_key(""),
            Err(Error::EmptyKeyName)
        ));
    }

    #[test]
    fn test_unavailable_store_fails() {
        let store = SoftwareKeyStore::in_memory();
        store.set_unavailable(true);
        assert!(matches!(
            store.get_or_create_key("login"),
            Err(Error::KeyStore(_))
        ));
        assert!(!store.check_availability().available);

        store.set_unavailable(false);
        assert!(store.get_or_create_key("login").is_ok());
        assert_eq!(
            store.check_availability().method,
            Some(KeyStoreMethod::Software)
        );
    }

    #[test]
    fn test_enrollment_change_invalidates_key() {
        let store = SoftwareKeyStore::in_memory();
        let key = store.get_or_create_key("login").unwrap();
        assert!(store.cipher_for_encryption(&key).is_ok());

        store.simulate_enrollment_change().unwrap();

        // The handle is still returned, only cipher init fails
        let key = store.get_or_create_key("login").unwrap();
        assert!(matches!(
            store.cipher_for_encryption(&key),
            Err(Error::KeyPermanentlyInvalidated)
        ));
        assert!(matches!(
            store.cipher_for_decryption(&key, &[0u8; 12]),
            Err(Error::KeyPermanentlyInvalidated)
        ));

        store.delete_key("login").unwrap();
        let fresh = store.get_or_create_key("login").unwrap();
        assert_ne!(fresh.generation, key.generation);
        assert!(store.cipher_for_encryption(&fresh).is_ok());
    }

    #[test]
    fn test_unbound_policy_survives_enrollment_change() {
        let store = SoftwareKeyStore::in_memory().with_policy(KeyPolicy {
            user_authentication_required: true,
            invalidated_by_biometric_enrollment: false,
        });
        let key = store.get_or_create_key("login").unwrap();
        store.simulate_enrollment_change().unwrap();
        assert!(store.cipher_for_encryption(&key).is_ok());
    }

    #[test]
    fn test_stale_handle_rejected() {
        let store = SoftwareKeyStore::in_memory();
        let old = store.get_or_create_key("login").unwrap();
        store.delete_key("login").unwrap();
        assert!(matches!(
            store.cipher_for_encryption(&old),
            Err(Error::KeyNotFound(_))
        ));

        store.get_or_create_key("login").unwrap();
        assert!(matches!(
            store.cipher_for_encryption(&old),
            Err(Error::KeyPermanentlyInvalidated)
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = SoftwareKeyStore::in_memory();
        store.delete_key("missing").unwrap();
        store.get_or_create_key("login").unwrap();
        store.delete_key("login").unwrap();
        store.delete_key("login").unwrap();
    }

    #[test]
    fn test_decryption_iv_length_checked() {
        let store = SoftwareKeyStore::in_memory();
        let key = store.get_or_create_key("login").unwrap();
        assert!(matches!(
            store.cipher_for_decryption(&key, &[0u8; 16]),
            Err(Error::InvalidIv {
                expected: 12,
                actual: 16
            })
        ));
        assert!(store.cipher_for_decryption(&key, &[0u8; 12]).is_ok());
    }

    #[test]
    fn test_keys_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystore.json");

        let generation = {
            let store = SoftwareKeyStore::open(&path).unwrap();
            store.get_or_create_key("login").unwrap().generation
        };

        let reopened = SoftwareKeyStore::open(&path).unwrap();
        let key = reopened.get_or_create_key("login").unwrap();
        assert_eq!(key.generation, generation);
    }

    #[test]
    fn test_enrollment_epoch_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystore.json");

        {
            let store = SoftwareKeyStore::open(&path).unwrap();
            store.get_or_create_key("login").unwrap();
            store.simulate_enrollment_change().unwrap();
        }

        let reopened = SoftwareKeyStore::open(&path).unwrap();
        let key = reopened.get_or_create_key("login").unwrap();
        assert!(matches!(
            reopened.cipher_for_encryption(&key),
            Err(Error::KeyPermanentlyInvalidated)
        ));
    }

    #[test]
    fn test_corrupted_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystore.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            SoftwareKeyStore::open(&path),
            Err(Error::KeyStore(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystore.json");
        let store = SoftwareKeyStore::open(&path).unwrap();
        store.get_or_create_key("login").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
