//! Cipher sessions bound to a single key, mode and IV.
//!
//! A [`CipherSession`] is locked: it can only be turned into an
//! [`UnlockedCipher`] by the [`BiometricGate`](crate::BiometricGate) after a
//! successful ceremony. An unlocked cipher performs exactly one transform.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::key::{KeyHandle, KeyMaterial};
use crate::models::CipherMode;

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// Nonce size for AES-GCM (96 bits = 12 bytes)
pub const IV_SIZE: usize = 12;

/// A pending, single-use cipher operation awaiting biometric approval.
pub struct CipherSession {
    id: Uuid,
    key: KeyHandle,
    mode: CipherMode,
    iv: [u8; IV_SIZE],
    material: KeyMaterial,
}

impl CipherSession {
    /// Initialize a session for encryption with a freshly generated IV.
    pub(crate) fn for_encryption(key: KeyHandle, material: KeyMaterial) -> Self {
        let mut iv = [0u8; IV_SIZE];
        rand::rng().fill_bytes(&mut iv);
        Self {
            id: Uuid::new_v4(),
            key,
            mode: CipherMode::Encrypt,
            iv,
            material,
        }
    }

    /// Initialize a session for decryption bound to a stored IV.
    ///
    /// The IV must be exactly [`IV_SIZE`] bytes. It is never truncated or padded.
    pub(crate) fn for_decryption(key: KeyHandle, material: KeyMaterial, iv: &[u8]) -> Result<Self> {
        let iv: [u8; IV_SIZE] = iv.try_into().map_err(|_| Error::InvalidIv {
            expected: IV_SIZE,
            actual: iv.len(),
        })?;
        Ok(Self {
            id: Uuid::new_v4(),
            key,
            mode: CipherMode::Decrypt,
            iv,
            material,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &KeyHandle {
        &self.key
    }

    pub fn mode(&self) -> CipherMode {
        self.mode
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }
}

impl std::fmt::Debug for CipherSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherSession")
            .field("id", &self.id)
            .field("key", &self.key.name)
            .field("mode", &self.mode)
            .field("iv", &hex::encode(self.iv))
            .finish()
    }
}

/// A cipher session the user has physically approved.
///
/// Only the gate constructs this, from the exact session the platform confirmed.
#[derive(Debug)]
pub struct UnlockedCipher {
    session: CipherSession,
}

impl UnlockedCipher {
    pub(crate) fn new(session: CipherSession) -> Self {
        Self { session }
    }

    pub fn session_id(&self) -> Uuid {
        self.session.id
    }

    pub fn key(&self) -> &KeyHandle {
        &self.session.key
    }

    pub fn mode(&self) -> CipherMode {
        self.session.mode
    }

    pub fn iv(&self) -> &[u8] {
        &self.session.iv
    }

    /// Encrypt `plaintext`, consuming the cipher.
    ///
    /// Output is the ciphertext with the 16-byte auth tag appended.
    pub fn encrypt(self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.expect_mode(CipherMode::Encrypt)?;
        self.aead()?
            .encrypt(Nonce::from_slice(&self.session.iv), plaintext)
            .map_err(|e| Error::Encryption(e.to_string()))
    }

    /// Decrypt `ciphertext`, consuming the cipher.
    pub fn decrypt(self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.expect_mode(CipherMode::Decrypt)?;
        // Wrong key, wrong IV or tampered bytes all surface as a tag mismatch
        self.aead()?
            .decrypt(Nonce::from_slice(&self.session.iv), ciphertext)
            .map_err(|_| Error::Decryption("ciphertext does not match key and IV".into()))
    }

    fn expect_mode(&self, expected: CipherMode) -> Result<()> {
        if self.session.mode != expected {
            return Err(Error::WrongMode {
                expected,
                actual: self.session.mode,
            });
        }
        Ok(())
    }

    fn aead(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(self.session.material.as_bytes())
            .map_err(|e| Error::Internal(format!("Invalid key: {}", e)))
    }
}
