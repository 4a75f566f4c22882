//! The platform biometric ceremony, seen from Rust.
//!
//! A [`BiometricPrompt`] shows the ceremony for a [`CryptoObject`] and resolves
//! once the user is done. On a match the platform answers with an
//! [`AuthConfirmation`] naming the session it unlocked.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::cipher::CipherSession;
use crate::models::{BiometricAvailability, CipherMode, PromptInfo};

/// What the platform is asked to unlock. Carries no key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoObject {
    pub session_id: Uuid,
    pub key_name: String,
    pub mode: CipherMode,
}

impl CryptoObject {
    pub fn for_session(session: &CipherSession) -> Self {
        Self {
            session_id: session.id(),
            key_name: session.key().name.clone(),
            mode: session.mode(),
        }
    }
}

/// Proof from the platform that a specific session was physically unlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfirmation {
    pub session_id: Uuid,
}

/// Terminal result of one platform ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CeremonyResult {
    Succeeded(AuthConfirmation),
    /// Too many non-matching attempts, lockout or a platform error.
    Failed(String),
    /// The user dismissed the prompt or pressed the negative button.
    Cancelled,
}

/// A platform biometric ceremony.
#[async_trait]
pub trait BiometricPrompt: Send + Sync {
    /// Whether a ceremony can currently be shown.
    fn availability(&self) -> BiometricAvailability;

    /// Show the ceremony for `crypto` and wait for the user.
    ///
    /// This may take an unbounded amount of time.
    async fn authenticate(&self, info: &PromptInfo, crypto: &CryptoObject) -> CeremonyResult;
}

/// One queued answer for a [`ScriptedPrompt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedResponse {
    /// The biometric matches.
    Approve,
    /// The ceremony fails with the given reason.
    Reject(String),
    /// The user cancels.
    Cancel,
}

/// A prompt that answers from a queue instead of a sensor.
///
/// Used in tests and demos. An empty queue behaves like the user cancelling.
pub struct ScriptedPrompt {
    availability: Mutex<BiometricAvailability>,
    responses: Mutex<VecDeque<ScriptedResponse>>,
    calls: AtomicUsize,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self {
            availability: Mutex::new(BiometricAvailability::Available),
            responses: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue the answer for a future ceremony.
    pub fn push(&self, response: ScriptedResponse) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }

    pub fn set_availability(&self, availability: BiometricAvailability) {
        if let Ok(mut current) = self.availability.lock() {
            *current = availability;
        }
    }

    /// Number of ceremonies shown so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BiometricPrompt for ScriptedPrompt {
    fn availability(&self) -> BiometricAvailability {
        self.availability
            .lock()
            .map(|a| *a)
            .unwrap_or(BiometricAvailability::Unavailable)
    }

    async fn authenticate(&self, info: &PromptInfo, crypto: &CryptoObject) -> CeremonyResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self
            .responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front());
        debug!(
            "Scripted prompt '{}' for session {}: {:?}",
            info.title, crypto.session_id, response
        );

        match response {
            Some(ScriptedResponse::Approve) => CeremonyResult::Succeeded(AuthConfirmation {
                session_id: crypto.session_id,
            }),
            Some(ScriptedResponse::Reject(reason)) => CeremonyResult::Failed(reason),
            Some(ScriptedResponse::Cancel) | None => CeremonyResult::Cancelled,
        }
    }
}
