//! Data types shared by key stores, prompts and the gate.

use serde::{Deserialize, Serialize};

/// Result of asking the platform whether a biometric ceremony can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BiometricAvailability {
    /// Hardware present and at least one biometric enrolled.
    Available,
    /// The device has no biometric sensor.
    NoHardware,
    /// Hardware present but the user has not enrolled a biometric.
    NotEnrolled,
    /// Hardware temporarily unavailable (locked out, busy, security update pending).
    Unavailable,
}

impl BiometricAvailability {
    pub fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

impl std::fmt::Display for BiometricAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::NoHardware => write!(f, "no-hardware"),
            Self::NotEnrolled => write!(f, "not-enrolled"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// The backend holding key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyStoreMethod {
    /// App-private key file (or memory) guarded by the biometric gate.
    Software,
    /// macOS Keychain.
    MacOSKeychain,
    /// Windows Credential Manager.
    WindowsCredentialManager,
    /// Linux Secret Service API (GNOME Keyring, KWallet, etc.)
    LinuxSecretService,
}

/// Status of key store availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStoreStatus {
    /// Whether the store can be used.
    pub available: bool,
    /// The backend in use (if available).
    pub method: Option<KeyStoreMethod>,
    /// Why the store is unavailable (if not available).
    pub unavailable_reason: Option<String>,
}

impl KeyStoreStatus {
    /// Create a status indicating the store is available.
    pub fn available(method: KeyStoreMethod) -> Self {
        Self {
            available: true,
            method: Some(method),
            unavailable_reason: None,
        }
    }

    /// Create a status indicating the store is unavailable.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            method: None,
            unavailable_reason: Some(reason.into()),
        }
    }
}

/// Usage policy attached to a key when it is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPolicy {
    /// Every cipher operation must pass a biometric ceremony.
    pub user_authentication_required: bool,
    /// Enrolling a new biometric permanently invalidates the key.
    pub invalidated_by_biometric_enrollment: bool,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            user_authentication_required: true,
            invalidated_by_biometric_enrollment: true,
        }
    }
}

/// Direction a cipher session was initialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CipherMode {
    Encrypt,
    Decrypt,
}

impl std::fmt::Display for CipherMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encrypt => write!(f, "encrypt"),
            Self::Decrypt => write!(f, "decrypt"),
        }
    }
}

/// Texts shown by the platform biometric prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptInfo {
    pub title: String,
    pub subtitle: String,
    /// Label of the button that cancels the ceremony.
    pub negative_button_text: String,
}

impl Default for PromptInfo {
    fn default() -> Self {
        Self {
            title: "Biometric login".to_string(),
            subtitle: "Log in using your biometric credential".to_string(),
            negative_button_text: "Use account password".to_string(),
        }
    }
}
