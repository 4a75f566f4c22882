//! TokenLock: biometric-gated access to a locally encrypted session token.
//!
//! The UI collaborator drives everything through [`commands`]:
//! - `enable_biometric_login` encrypts a token under biometric approval
//! - `attempt_biometric_login` decrypts it again and signs the session in
//! - `login_with_password` is the password fallback and never touches keys

pub mod commands;
pub mod error;
pub mod security;
pub mod session;
pub mod state;
pub mod storage;
pub mod vault;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{Recovery, Result, TokenLockError};
pub use session::{SessionState, SessionToken};
pub use state::AppState;
pub use tokenlock_keyguard as keyguard;

/// Initialize tracing. `RUST_LOG` overrides the default filter.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tokenlock_app=debug,tokenlock_keyguard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
