//! The persisted ciphertext record.
//!
//! This module provides:
//! - `CiphertextRecord`: the ciphertext of the session token plus the IV it was
//!   encrypted under
//! - Functions to read/write the record entry in the preferences file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TokenLockError};
use crate::storage::SharedPrefs;

/// Ciphertext and initialization vector of the encrypted session token.
///
/// Byte fields are hex-encoded on disk. `key_generation` names the key
/// generation the record was written under; a record from any other
/// generation can never be decrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CiphertextRecord {
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub initialization_vector: Vec<u8>,
    pub key_generation: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Read the record entry. Returns `None` when biometric login is not enabled.
///
/// A record that cannot be parsed, or a prefs file that cannot be parsed at
/// all, is a `DecryptionFailed`: the user re-enables biometric login, which
/// rewrites the file.
pub fn read_record(prefs: &SharedPrefs, entry: &str) -> Result<Option<CiphertextRecord>> {
    prefs.get(entry).map_err(|e| match e {
        TokenLockError::Serialization(e) => {
            TokenLockError::DecryptionFailed(format!("Ciphertext record corrupted: {}", e))
        }
        TokenLockError::Storage(reason) => TokenLockError::DecryptionFailed(reason),
        other => other,
    })
}

/// Write the record entry, replacing any previous record.
pub fn write_record(prefs: &SharedPrefs, entry: &str, record: &CiphertextRecord) -> Result<()> {
    prefs.put(entry, record)
}

/// Delete the record entry.
pub fn delete_record(prefs: &SharedPrefs, entry: &str) -> Result<()> {
    prefs.remove(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CiphertextRecord {
        CiphertextRecord {
            ciphertext: vec![0xde, 0xad, 0xbe, 0xef],
            initialization_vector: vec![7u8; 12],
            key_generation: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_is_hex_encoded() {
        let json = serde_json::to_string(&record()).unwrap();
        assert!(json.contains(r#""ciphertext":"deadbeef""#));
        assert!(json.contains(r#""initializationVector":"070707070707070707070707""#));
    }

    #[test]
    fn test_write_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = SharedPrefs::new(dir.path(), "biometric_prefs");

        assert_eq!(read_record(&prefs, "ciphertext_wrapper").unwrap(), None);

        let record = record();
        write_record(&prefs, "ciphertext_wrapper", &record).unwrap();
        assert_eq!(
            read_record(&prefs, "ciphertext_wrapper").unwrap(),
            Some(record)
        );

        delete_record(&prefs, "ciphertext_wrapper").unwrap();
        assert_eq!(read_record(&prefs, "ciphertext_wrapper").unwrap(), None);
    }

    #[test]
    fn test_malformed_record_is_decryption_failure() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = SharedPrefs::new(dir.path(), "biometric_prefs");
        prefs
            .put("ciphertext_wrapper", &serde_json::json!({"ciphertext": "zz"}))
            .unwrap();
        assert!(matches!(
            read_record(&prefs, "ciphertext_wrapper"),
            Err(TokenLockError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_unparseable_prefs_file_is_decryption_failure() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = SharedPrefs::new(dir.path(), "biometric_prefs");
        std::fs::write(prefs.path(), b"{truncated").unwrap();

        let err = read_record(&prefs, "ciphertext_wrapper").unwrap_err();
        assert!(matches!(err, TokenLockError::DecryptionFailed(_)));

        // Rewriting the record recovers the file
        let record = record();
        write_record(&prefs, "ciphertext_wrapper", &record).unwrap();
        assert_eq!(
            read_record(&prefs, "ciphertext_wrapper").unwrap(),
            Some(record)
        );
    }
}
