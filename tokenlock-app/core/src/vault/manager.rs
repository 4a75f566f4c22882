//! TokenVault - encrypts the session token under an unlocked cipher and owns
//! the persisted ciphertext record.
//!
//! The vault never sees key material. It receives an [`UnlockedCipher`] from
//! the biometric gate, runs exactly one transform with it and reads or writes
//! the [`CiphertextRecord`].

use chrono::Utc;
use tokenlock_keyguard::{CipherMode, UnlockedCipher};
use tracing::{debug, info, warn};

use crate::error::{Result, TokenLockError};
use crate::storage::SharedPrefs;
use crate::vault::storage::{delete_record, read_record, write_record, CiphertextRecord};

pub struct TokenVault {
    prefs: SharedPrefs,
    entry: String,
}

impl TokenVault {
    /// Create a vault storing its record under `entry` in `prefs`.
    pub fn new(prefs: SharedPrefs, entry: impl Into<String>) -> Self {
        Self {
            prefs,
            entry: entry.into(),
        }
    }

    /// Encrypt `plaintext` and persist the resulting record.
    ///
    /// Any previous record is replaced (last write wins).
    ///
    /// # Errors
    /// Returns `Encryption` if the cipher was initialized for decryption.
    pub fn encrypt(&self, plaintext: &str, cipher: UnlockedCipher) -> Result<CiphertextRecord> {
        if cipher.mode() != CipherMode::Encrypt {
            return Err(TokenLockError::Encryption(
                "Cipher was initialized for decryption".into(),
            ));
        }

        let initialization_vector = cipher.iv().to_vec();
        let key_generation = cipher.key().generation;
        let ciphertext = cipher.encrypt(plaintext.as_bytes())?;

        let record = CiphertextRecord {
            ciphertext,
            initialization_vector,
            key_generation,
            created_at: Utc::now(),
        };
        write_record(&self.prefs, &self.entry, &record)?;

        info!(
            "Stored {}-byte ciphertext record (key generation {})",
            record.ciphertext.len(),
            record.key_generation
        );
        Ok(record)
    }

    /// Decrypt `record` with a cipher bound to the record's IV.
    ///
    /// # Errors
    /// Returns `DecryptionFailed` if the cipher, IV and ciphertext do not belong
    /// together or the plaintext is not UTF-8.
    pub fn decrypt(&self, record: &CiphertextRecord, cipher: UnlockedCipher) -> Result<String> {
        if cipher.mode() != CipherMode::Decrypt {
            return Err(TokenLockError::Encryption(
                "Cipher was initialized for encryption".into(),
            ));
        }
        if cipher.iv() != record.initialization_vector.as_slice() {
            return Err(TokenLockError::DecryptionFailed(
                "Cipher IV does not match the stored record".into(),
            ));
        }

        let plaintext = cipher.decrypt(&record.ciphertext)?;
        let token = String::from_utf8(plaintext).map_err(|_| {
            TokenLockError::DecryptionFailed("Decrypted token is not valid UTF-8".into())
        })?;

        debug!("Decrypted ciphertext record");
        Ok(token)
    }

    /// Load the persisted record. No side effects.
    pub fn load_record(&self) -> Result<Option<CiphertextRecord>> {
        read_record(&self.prefs, &self.entry)
    }

    /// Whether a record exists, i.e. biometric login is enabled.
    ///
    /// An unparseable prefs file counts as an enabled but unreadable record.
    pub fn has_record(&self) -> Result<bool> {
        match self.prefs.contains(&self.entry) {
            Err(TokenLockError::Storage(reason)) => {
                warn!("Ciphertext record unreadable: {}", reason);
                Ok(true)
            }
            other => other,
        }
    }

    /// Delete the persisted record. Succeeds if there is none.
    pub fn clear_record(&self) -> Result<()> {
        delete_record(&self.prefs, &self.entry)?;
        info!("Cleared ciphertext record");
        Ok(())
    }
}
