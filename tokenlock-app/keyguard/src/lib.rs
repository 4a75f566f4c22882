//! Biometric-gated key storage for TokenLock.
//!
//! - [`KeyStore`] owns named keys and initializes locked [`CipherSession`]s.
//! - [`BiometricGate`] runs a [`BiometricPrompt`] ceremony and hands the
//!   approved [`UnlockedCipher`] to a continuation.
//!
//! Backends: [`SoftwareKeyStore`] (memory or app-private key file) and, with the
//! `os-keyring` feature, `KeyringKeyStore`.

pub use models::*;

mod cipher;
mod error;
mod gate;
mod key;
#[cfg(feature = "os-keyring")]
mod os_keyring;
mod models;
mod prompt;
mod software;
mod store;

pub use cipher::{CipherSession, UnlockedCipher, IV_SIZE, KEY_SIZE};
pub use error::{Error, Result};
pub use gate::{BiometricGate, GateOutcome, GateState};
pub use key::KeyHandle;
#[cfg(feature = "os-keyring")]
pub use os_keyring::KeyringKeyStore;
pub use prompt::{
    AuthConfirmation, BiometricPrompt, CeremonyResult, CryptoObject, ScriptedPrompt,
    ScriptedResponse,
};
pub use software::SoftwareKeyStore;
pub use store::KeyStore;
