//! Biometric login status reported to the UI.

use serde::{Deserialize, Serialize};
use tokenlock_keyguard::BiometricAvailability;

/// Everything the UI needs to choose between the biometric and password flows.
///
/// - `enabled` means a ciphertext record exists for the current key
/// - `signed_in` means the session already holds a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricStatus {
    pub availability: BiometricAvailability,
    pub enabled: bool,
    pub signed_in: bool,
}

impl BiometricStatus {
    /// Whether the UI should offer "use biometrics" on launch.
    pub fn can_attempt_biometric_login(&self) -> bool {
        self.availability.is_available() && self.enabled && !self.signed_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_attempt_biometric_login() {
        let status = BiometricStatus {
            availability: BiometricAvailability::Available,
            enabled: true,
            signed_in: false,
        };
        assert!(status.can_attempt_biometric_login());

        assert!(!BiometricStatus {
            signed_in: true,
            ..status
        }
        .can_attempt_biometric_login());
        assert!(!BiometricStatus {
            enabled: false,
            ..status
        }
        .can_attempt_biometric_login());
        assert!(!BiometricStatus {
            availability: BiometricAvailability::NotEnrolled,
            ..status
        }
        .can_attempt_biometric_login());
    }
}
