//! Key handles and the key material behind them.
//!
//! A [`KeyHandle`] is public metadata only. The material lives inside the store
//! and inside cipher sessions, and is never handed out to callers.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::KEY_SIZE;
use crate::models::KeyPolicy;

/// Reference to a named key in a [`KeyStore`](crate::KeyStore).
///
/// The `generation` changes every time the key is deleted and recreated, so a
/// handle obtained before a reset cannot open sessions on the new key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyHandle {
    pub name: String,
    pub generation: Uuid,
    pub policy: KeyPolicy,
    pub created_at: DateTime<Utc>,
}

/// 256-bit AES key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub(crate) struct KeyMaterial {
    #[serde(with = "hex::serde")]
    bytes: [u8; KEY_SIZE],
}

impl KeyMaterial {
    pub(crate) fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A key as the store keeps it: handle metadata, material and the biometric
/// enrollment epoch it was created under.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredKey {
    pub handle: KeyHandle,
    pub enrollment_epoch: u64,
    pub material: KeyMaterial,
}

impl StoredKey {
    pub(crate) fn generate(name: &str, policy: KeyPolicy, enrollment_epoch: u64) -> Self {
        Self {
            handle: KeyHandle {
                name: name.to_string(),
                generation: Uuid::new_v4(),
                policy,
                created_at: Utc::now(),
            },
            enrollment_epoch,
            material: KeyMaterial::generate(),
        }
    }

    /// Whether a biometric re-enrollment has made this key unusable.
    pub(crate) fn is_invalidated(&self, current_epoch: u64) -> bool {
        self.handle.policy.invalidated_by_biometric_enrollment
            && self.enrollment_epoch != current_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_material_debug_is_redacted() {
        let material = KeyMaterial::generate();
        let debug = format!("{:?}", material);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(&hex::encode(material.as_bytes())));
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = StoredKey::generate("k", KeyPolicy::default(), 0);
        let b = StoredKey::generate("k", KeyPolicy::default(), 0);
        assert_ne!(a.material.as_bytes(), b.material.as_bytes());
        assert_ne!(a.handle.generation, b.handle.generation);
    }

    #[test]
    fn test_invalidation_follows_policy() {
        let bound = StoredKey::generate("k", KeyPolicy::default(), 1);
        assert!(!bound.is_invalidated(1));
        assert!(bound.is_invalidated(2));

        let unbound = StoredKey::generate(
            "k",
            KeyPolicy {
                user_authentication_required: true,
                invalidated_by_biometric_enrollment: false,
            },
            1,
        );
        assert!(!unbound.is_invalidated(2));
    }
}
