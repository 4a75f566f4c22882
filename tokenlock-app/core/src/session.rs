//! In-memory session state.
//!
//! Holds the signed-in user's token for the lifetime of the process. Nothing
//! here is persisted: a restart starts with an empty session. The state is
//! created once at startup and shared through [`AppState`](crate::state::AppState).

use std::sync::Arc;

use serde::{Serialize, Serializer};
use tokio::sync::RwLock;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The plaintext session token, zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log the actual token
        f.debug_tuple("SessionToken").field(&"[REDACTED]").finish()
    }
}

/// Handed to the UI collaborator, which needs the token itself.
impl Serialize for SessionToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Default)]
struct Session {
    username: Option<String>,
    token: Option<SessionToken>,
}

/// Process-scoped holder of the session token.
///
/// Operations are issued from a single foreground flow; the lock only makes
/// the state shareable, it does not order concurrent writers.
#[derive(Clone, Default)]
pub struct SessionState {
    inner: Arc<RwLock<Session>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<SessionToken> {
        self.inner.read().await.token.clone()
    }

    pub async fn set(&self, token: SessionToken) {
        self.inner.write().await.token = Some(token);
        debug!("Session token updated");
    }

    pub async fn username(&self) -> Option<String> {
        self.inner.read().await.username.clone()
    }

    pub async fn set_username(&self, username: impl Into<String>) {
        self.inner.write().await.username = Some(username.into());
    }

    pub async fn is_signed_in(&self) -> bool {
        self.inner.read().await.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_starts_empty() {
        let session = SessionState::new();
        assert_eq!(session.get().await, None);
        assert_eq!(session.username().await, None);
        assert!(!session.is_signed_in().await);
    }

    #[tokio::test]
    async fn test_set_is_visible_through_clones() {
        let session = SessionState::new();
        let shared = session.clone();

        session.set(SessionToken::new("abc123")).await;
        session.set_username("alice").await;

        assert_eq!(shared.get().await, Some(SessionToken::new("abc123")));
        assert_eq!(shared.username().await.as_deref(), Some("alice"));
        assert!(shared.is_signed_in().await);
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = SessionToken::new("abc123");
        assert!(!format!("{:?}", token).contains("abc123"));
        assert_eq!(serde_json::to_string(&token).unwrap(), r#""abc123""#);
    }
}
