//! BiometricGate - runs one biometric ceremony around one cipher session.
//!
//! The gate moves `Idle → Prompting → {Succeeded, Failed, Cancelled} → Idle`.
//! Only one ceremony may be prompting at a time; a second call is rejected
//! with [`Error::GateBusy`] and leaves the first ceremony untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cipher::{CipherSession, UnlockedCipher};
use crate::error::{Error, Result};
use crate::models::{BiometricAvailability, PromptInfo};
use crate::prompt::{BiometricPrompt, CeremonyResult, CryptoObject};

/// Whether a ceremony is currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum GateState {
    Idle,
    Prompting,
}

/// Terminal outcome of a gated operation.
///
/// `Succeeded` carries whatever the continuation returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "camelCase")]
pub enum GateOutcome<T> {
    Succeeded(T),
    Failed(String),
    Cancelled,
}

impl<T> GateOutcome<T> {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> GateOutcome<U> {
        match self {
            Self::Succeeded(value) => GateOutcome::Succeeded(f(value)),
            Self::Failed(reason) => GateOutcome::Failed(reason),
            Self::Cancelled => GateOutcome::Cancelled,
        }
    }
}

impl<T, E> GateOutcome<std::result::Result<T, E>> {
    /// Move an error produced by the continuation out of the outcome.
    pub fn transpose(self) -> std::result::Result<GateOutcome<T>, E> {
        match self {
            Self::Succeeded(Ok(value)) => Ok(GateOutcome::Succeeded(value)),
            Self::Succeeded(Err(e)) => Err(e),
            Self::Failed(reason) => Ok(GateOutcome::Failed(reason)),
            Self::Cancelled => Ok(GateOutcome::Cancelled),
        }
    }
}

/// Resets the gate to `Idle` when the ceremony ends or its future is dropped.
struct PromptingGuard<'a>(&'a AtomicBool);

impl Drop for PromptingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Wraps a [`BiometricPrompt`] around pending cipher sessions.
pub struct BiometricGate {
    prompt: Arc<dyn BiometricPrompt>,
    info: PromptInfo,
    prompting: AtomicBool,
}

impl BiometricGate {
    pub fn new(prompt: Arc<dyn BiometricPrompt>, info: PromptInfo) -> Self {
        Self {
            prompt,
            info,
            prompting: AtomicBool::new(false),
        }
    }

    /// Ask the platform whether a ceremony can be shown.
    pub fn availability(&self) -> BiometricAvailability {
        self.prompt.availability()
    }

    pub fn state(&self) -> GateState {
        if self.prompting.load(Ordering::Acquire) {
            GateState::Prompting
        } else {
            GateState::Idle
        }
    }

    pub fn prompt_info(&self) -> &PromptInfo {
        &self.info
    }

    /// Run the ceremony for `session` and, on a match, hand the unlocked cipher
    /// to `on_success`.
    ///
    /// `on_success` runs at most once and never after a failed or cancelled
    /// ceremony. The session is consumed either way.
    ///
    /// # Errors
    /// Returns [`Error::GateBusy`] if another ceremony is prompting.
    pub async fn authenticate<F, T>(&self, session: CipherSession, on_success: F) -> Result<GateOutcome<T>>
    where
        F: FnOnce(UnlockedCipher) -> T + Send,
        T: Send,
    {
        if self
            .prompting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(
                "Rejected ceremony for session {}: another ceremony is prompting",
                session.id()
            );
            return Err(Error::GateBusy);
        }
        let guard = PromptingGuard(&self.prompting);

        let crypto = CryptoObject::for_session(&session);
        debug!(
            "Prompting for {} with key {} (session {})",
            crypto.mode, crypto.key_name, crypto.session_id
        );

        let result = self.prompt.authenticate(&self.info, &crypto).await;
        drop(guard);

        match result {
            CeremonyResult::Succeeded(confirmation) => {
                // The platform must confirm the very session we asked it to unlock
                if confirmation.session_id != session.id() {
                    warn!(
                        "Confirmation for session {} does not match pending session {}",
                        confirmation.session_id,
                        session.id()
                    );
                    return Ok(GateOutcome::Failed(
                        "confirmation does not match the pending cipher".into(),
                    ));
                }
                info!("Biometric ceremony succeeded for session {}", session.id());
                Ok(GateOutcome::Succeeded(on_success(UnlockedCipher::new(session))))
            }
            CeremonyResult::Failed(reason) => {
                info!("Biometric ceremony failed: {}", reason);
                Ok(GateOutcome::Failed(reason))
            }
            CeremonyResult::Cancelled => {
                info!("Biometric ceremony cancelled by user");
                Ok(GateOutcome::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tokio::sync::Notify;
    use uuid::Uuid;

    use super::*;
    use crate::prompt::{AuthConfirmation, ScriptedPrompt, ScriptedResponse};
    use crate::software::SoftwareKeyStore;
    use crate::store::KeyStore;

    fn encryption_session(store: &SoftwareKeyStore) -> CipherSession {
        let key = store.get_or_create_key("login").unwrap();
        store.cipher_for_encryption(&key).unwrap()
    }

    fn scripted(responses: &[ScriptedResponse]) -> Arc<ScriptedPrompt> {
        let prompt = Arc::new(ScriptedPrompt::new());
        for response in responses {
            prompt.push(response.clone());
        }
        prompt
    }

    /// Waits until the test releases it, then approves.
    struct HeldPrompt {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl BiometricPrompt for HeldPrompt {
        fn availability(&self) -> BiometricAvailability {
            BiometricAvailability::Available
        }

        async fn authenticate(&self, _info: &PromptInfo, crypto: &CryptoObject) -> CeremonyResult {
            self.entered.notify_one();
            self.release.notified().await;
            CeremonyResult::Succeeded(AuthConfirmation {
                session_id: crypto.session_id,
            })
        }
    }

    /// Confirms a session other than the one it was shown.
    struct SubstitutingPrompt;

    #[async_trait]
    impl BiometricPrompt for SubstitutingPrompt {
        fn availability(&self) -> BiometricAvailability {
            BiometricAvailability::Available
        }

        async fn authenticate(&self, _info: &PromptInfo, _crypto: &CryptoObject) -> CeremonyResult {
            CeremonyResult::Succeeded(AuthConfirmation {
                session_id: Uuid::new_v4(),
            })
        }
    }

    #[tokio::test]
    async fn test_success_invokes_continuation_once() {
        let store = SoftwareKeyStore::in_memory();
        let gate = BiometricGate::new(scripted(&[ScriptedResponse::Approve]), PromptInfo::default());
        let calls = AtomicUsize::new(0);

        let session = encryption_session(&store);
        let session_id = session.id();
        let outcome = gate
            .authenticate(session, |cipher| {
                calls.fetch_add(1, Ordering::SeqCst);
                cipher.session_id()
            })
            .await
            .unwrap();

        assert_eq!(outcome, GateOutcome::Succeeded(session_id));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[tokio::test]
    async fn test_cancel_and_failure_skip_continuation() {
        let store = SoftwareKeyStore::in_memory();
        let gate = BiometricGate::new(
            scripted(&[
                ScriptedResponse::Cancel,
                ScriptedResponse::Reject("too many attempts".into()),
            ]),
            PromptInfo::default(),
        );
        let calls = AtomicUsize::new(0);

        let outcome = gate
            .authenticate(encryption_session(&store), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        assert_eq!(outcome, GateOutcome::Cancelled);

        let outcome = gate
            .authenticate(encryption_session(&store), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        assert_eq!(outcome, GateOutcome::Failed("too many attempts".into()));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[tokio::test]
    async fn test_substituted_confirmation_fails() {
        let store = SoftwareKeyStore::in_memory();
        let gate = BiometricGate::new(Arc::new(SubstitutingPrompt), PromptInfo::default());
        let calls = AtomicUsize::new(0);

        let outcome = gate
            .authenticate(encryption_session(&store), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert!(matches!(outcome, GateOutcome::Failed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_call_while_prompting_is_busy() {
        let store = SoftwareKeyStore::in_memory();
        let prompt = Arc::new(HeldPrompt {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let gate = Arc::new(BiometricGate::new(prompt.clone(), PromptInfo::default()));

        let first_session = encryption_session(&store);
        let first_id = first_session.id();
        let first = tokio::spawn({
            let gate = gate.clone();
            async move {
                gate.authenticate(first_session, |cipher| cipher.session_id())
                    .await
            }
        });

        prompt.entered.notified().await;
        assert_eq!(gate.state(), GateState::Prompting);

        let second = gate
            .authenticate(encryption_session(&store), |cipher| cipher.session_id())
            .await;
        assert!(matches!(second, Err(Error::GateBusy)));
        assert_eq!(gate.state(), GateState::Prompting);

        prompt.release.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome, GateOutcome::Succeeded(first_id));
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[tokio::test]
    async fn test_dropped_ceremony_returns_to_idle() {
        let store = SoftwareKeyStore::in_memory();
        let prompt = Arc::new(HeldPrompt {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let gate = Arc::new(BiometricGate::new(prompt.clone(), PromptInfo::default()));

        let session = encryption_session(&store);
        let pending = tokio::spawn({
            let gate = gate.clone();
            async move { gate.authenticate(session, |_| ()).await }
        });

        prompt.entered.notified().await;
        pending.abort();
        let _ = pending.await;

        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn test_outcome_transpose() {
        let ok: GateOutcome<std::result::Result<u8, String>> = GateOutcome::Succeeded(Ok(1));
        assert_eq!(ok.transpose(), Ok(GateOutcome::Succeeded(1)));

        let err: GateOutcome<std::result::Result<u8, String>> =
            GateOutcome::Succeeded(Err("bad".into()));
        assert_eq!(err.transpose(), Err("bad".to_string()));

        let cancelled: GateOutcome<std::result::Result<u8, String>> = GateOutcome::Cancelled;
        assert_eq!(cancelled.transpose(), Ok(GateOutcome::Cancelled));
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&GateOutcome::Succeeded("abc123")).unwrap();
        assert_eq!(json, r#"{"status":"succeeded","value":"abc123"}"#);
        let json = serde_json::to_string(&GateOutcome::<String>::Cancelled).unwrap();
        assert_eq!(json, r#"{"status":"cancelled"}"#);
    }
}
