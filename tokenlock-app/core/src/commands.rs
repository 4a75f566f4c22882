//! Operations the UI collaborator calls.
//!
//! Every flow is user-triggered and nothing is retried. When a key turns out
//! to be permanently invalidated, the stale record and key are removed and
//! `enable_biometric_login` starts a fresh key generation.

use tokenlock_keyguard::{GateOutcome, KeyHandle};
use tracing::{debug, info, warn};

use crate::error::{Result, TokenLockError};
use crate::security::{authenticate_password, validate_login_form, LoginFormState};
use crate::session::SessionToken;
use crate::state::AppState;
use crate::vault::BiometricStatus;

/// Report availability, whether biometric login is enabled and whether the
/// session is already signed in.
pub async fn biometric_status(state: &AppState) -> Result<BiometricStatus> {
    Ok(BiometricStatus {
        availability: state.gate.availability(),
        enabled: state.vault.has_record()?,
        signed_in: state.session.is_signed_in().await,
    })
}

/// Validate the login form as the user types.
pub fn check_login_form(state: &AppState, username: &str, password: &str) -> LoginFormState {
    validate_login_form(username, password, state.settings.min_password_length)
}

/// Log in with username and password. Never touches the key store.
///
/// On failure the session is left unchanged.
pub async fn login_with_password(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<SessionToken> {
    let token = authenticate_password(username, password, state.settings.min_password_length)?;

    state.session.set_username(username.trim()).await;
    state.session.set(token.clone()).await;

    info!("User {} logged in with password", username.trim());
    Ok(token)
}

/// Encrypt `token` under biometric approval and persist the record.
///
/// A previous record is overwritten. Returns the ceremony's terminal event.
///
/// If the key was invalidated by a biometric enrollment change, the stale
/// record and key are removed and this call continues with a fresh key
/// generation. The user sees a single prompt.
pub async fn enable_biometric_login(state: &AppState, token: &str) -> Result<GateOutcome<()>> {
    ensure_biometrics_available(state)?;

    let key = get_key(state)?;
    let session = match state.key_store.cipher_for_encryption(&key) {
        Ok(session) => session,
        Err(e) => match handle_cipher_error(state, e.into()) {
            TokenLockError::KeyInvalidated => {
                info!("Enabling biometric login with a fresh key generation");
                let key = get_key(state)?;
                state.key_store.cipher_for_encryption(&key)?
            }
            err => return Err(err),
        },
    };

    let outcome = state
        .gate
        .authenticate(session, |cipher| state.vault.encrypt(token, cipher))
        .await?
        .transpose()?
        .map(|_record| ());

    if outcome.is_succeeded() {
        info!("Biometric login enabled");
    }
    Ok(outcome)
}

/// Decrypt the stored token under biometric approval and sign in with it.
///
/// Returns the session token without prompting when already signed in.
pub async fn attempt_biometric_login(state: &AppState) -> Result<GateOutcome<SessionToken>> {
    if let Some(token) = state.session.get().await {
        debug!("Already signed in, skipping biometric prompt");
        return Ok(GateOutcome::Succeeded(token));
    }

    let record = state
        .vault
        .load_record()?
        .ok_or(TokenLockError::BiometricLoginNotEnabled)?;

    ensure_biometrics_available(state)?;

    let key = get_key(state)?;
    if key.generation != record.key_generation {
        warn!("Ciphertext record belongs to a previous key generation");
        return Err(handle_cipher_error(state, TokenLockError::KeyInvalidated));
    }

    let session = match state
        .key_store
        .cipher_for_decryption(&key, &record.initialization_vector)
    {
        Ok(session) => session,
        Err(e) => return Err(handle_cipher_error(state, e.into())),
    };

    let outcome = state
        .gate
        .authenticate(session, |cipher| state.vault.decrypt(&record, cipher))
        .await?
        .transpose()?
        .map(SessionToken::new);

    if let GateOutcome::Succeeded(token) = &outcome {
        state.session.set(token.clone()).await;
        info!("Logged in with biometrics");
    }
    Ok(outcome)
}

/// Turn biometric login off: remove the record and the key.
pub async fn disable_biometric_login(state: &AppState) -> Result<()> {
    state.vault.clear_record()?;
    state.key_store.delete_key(&state.settings.key_name)?;
    info!("Biometric login disabled");
    Ok(())
}

fn ensure_biometrics_available(state: &AppState) -> Result<()> {
    let availability = state.gate.availability();
    if !availability.is_available() {
        info!("Biometric authentication unavailable: {}", availability);
        return Err(TokenLockError::BiometricUnavailable(availability));
    }
    Ok(())
}

fn get_key(state: &AppState) -> Result<KeyHandle> {
    Ok(state.key_store.get_or_create_key(&state.settings.key_name)?)
}

/// Surface a cipher-initialization error, clearing stale state if the key is
/// permanently invalidated.
fn handle_cipher_error(state: &AppState, err: TokenLockError) -> TokenLockError {
    if matches!(err, TokenLockError::KeyInvalidated) {
        warn!("Key invalidated, clearing biometric login state");
        if let Err(e) = state.vault.clear_record() {
            warn!("Failed to clear stale ciphertext record: {}", e);
        }
        if let Err(e) = state.key_store.delete_key(&state.settings.key_name) {
            warn!("Failed to delete invalidated key: {}", e);
        }
    }
    err
}
