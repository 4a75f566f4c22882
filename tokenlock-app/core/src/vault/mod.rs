//! Encrypted token storage.
//!
//! The session token is encrypted with AES-256-GCM under a biometric-bound key
//! and persisted as a [`CiphertextRecord`] in the app-private preferences file.
//! The presence of that record is what "biometric login is enabled" means.

pub mod auth;
pub mod manager;
pub mod storage;

pub use auth::BiometricStatus;
pub use manager::TokenVault;
pub use storage::CiphertextRecord;
