use serde::Serialize;
use thiserror::Error;

use tokenlock_keyguard::BiometricAvailability;

/// What the user should do after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    TryAgain,
    ReEnableBiometricLogin,
    LoginWithPassword,
    FixInput,
    None,
}

#[derive(Error, Debug)]
pub enum TokenLockError {
    #[error("Key store error: {0}")]
    KeyStore(String),

    #[error("Biometric enrollment changed - please re-enable biometric login")]
    KeyInvalidated,

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("A biometric ceremony is already in progress")]
    GateBusy,

    #[error("Biometric authentication unavailable: {0}")]
    BiometricUnavailable(BiometricAvailability),

    #[error("Biometric login is not enabled")]
    BiometricLoginNotEnabled,

    #[error("Username is required")]
    UsernameRequired,

    #[error("Password is required")]
    PasswordRequired,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TokenLockError {
    /// Error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Self::KeyStore(_) => "KEY_STORE_ERROR",
            Self::KeyInvalidated => "KEY_INVALIDATED",
            Self::DecryptionFailed(_) => "DECRYPTION_FAILED",
            Self::Encryption(_) => "ENCRYPTION_ERROR",
            Self::GateBusy => "GATE_BUSY",
            Self::BiometricUnavailable(_) => "BIOMETRIC_UNAVAILABLE",
            Self::BiometricLoginNotEnabled => "BIOMETRIC_NOT_ENABLED",
            Self::UsernameRequired => "USERNAME_REQUIRED",
            Self::PasswordRequired => "PASSWORD_REQUIRED",
            Self::PasswordTooShort(_) => "PASSWORD_TOO_SHORT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    pub fn recovery(&self) -> Recovery {
        match self {
            Self::KeyStore(_) | Self::Storage(_) | Self::Io(_) => Recovery::TryAgain,
            Self::KeyInvalidated | Self::DecryptionFailed(_) => Recovery::ReEnableBiometricLogin,
            Self::BiometricUnavailable(_) | Self::BiometricLoginNotEnabled => {
                Recovery::LoginWithPassword
            }
            Self::UsernameRequired | Self::PasswordRequired | Self::PasswordTooShort(_) => {
                Recovery::FixInput
            }
            Self::Encryption(_) | Self::GateBusy | Self::Config(_) | Self::Serialization(_) => {
                Recovery::None
            }
        }
    }
}

impl From<tokenlock_keyguard::Error> for TokenLockError {
    fn from(err: tokenlock_keyguard::Error) -> Self {
        use tokenlock_keyguard::Error as KeyguardError;

        match err {
            KeyguardError::KeyPermanentlyInvalidated => Self::KeyInvalidated,
            KeyguardError::InvalidIv { .. } | KeyguardError::Decryption(_) => {
                Self::DecryptionFailed(err.to_string())
            }
            KeyguardError::GateBusy => Self::GateBusy,
            KeyguardError::WrongMode { .. } | KeyguardError::Encryption(_) => {
                Self::Encryption(err.to_string())
            }
            KeyguardError::KeyStore(_)
            | KeyguardError::EmptyKeyName
            | KeyguardError::KeyNotFound(_)
            | KeyguardError::Io(_)
            | KeyguardError::Internal(_) => Self::KeyStore(err.to_string()),
        }
    }
}

// ============================================================================
// Serialization for the UI collaborator
// ============================================================================

impl Serialize for TokenLockError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("TokenLockError", 3)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.serialize_field("recovery", &self.recovery())?;
        state.end()
    }
}

pub type Result<T> = std::result::Result<T, TokenLockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyguard_error_mapping() {
        let err: TokenLockError = tokenlock_keyguard::Error::KeyPermanentlyInvalidated.into();
        assert!(matches!(err, TokenLockError::KeyInvalidated));
        assert_eq!(err.recovery(), Recovery::ReEnableBiometricLogin);

        let err: TokenLockError = tokenlock_keyguard::Error::InvalidIv {
            expected: 12,
            actual: 3,
        }
        .into();
        assert!(matches!(err, TokenLockError::DecryptionFailed(_)));

        let err: TokenLockError = tokenlock_keyguard::Error::KeyStore("down".into()).into();
        assert_eq!(err.recovery(), Recovery::TryAgain);

        let err: TokenLockError = tokenlock_keyguard::Error::GateBusy.into();
        assert!(matches!(err, TokenLockError::GateBusy));
    }

    #[test]
    fn test_error_serialization() {
        let json = serde_json::to_string(&TokenLockError::PasswordRequired).unwrap();
        assert!(json.contains("PASSWORD_REQUIRED"));
        assert!(json.contains("Password is required"));
        assert!(json.contains("fix_input"));
    }
}
