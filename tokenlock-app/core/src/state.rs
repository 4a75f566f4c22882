use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokenlock_keyguard::{BiometricGate, BiometricPrompt, KeyStore};
use tracing::info;

use crate::error::Result;
use crate::session::SessionState;
use crate::storage::{init_data_dir, load_settings, AppSettings, SharedPrefs};
use crate::vault::TokenVault;

/// Process-scoped state shared by every command.
///
/// Created once at startup, dropped at exit. The session inside it is never
/// written to disk.
pub struct AppState {
    pub data_dir: PathBuf,
    pub settings: AppSettings,
    pub key_store: Arc<dyn KeyStore>,
    pub gate: BiometricGate,
    pub vault: TokenVault,
    pub session: SessionState,
}

impl AppState {
    pub fn new(
        data_dir: PathBuf,
        settings: AppSettings,
        key_store: Arc<dyn KeyStore>,
        prompt: Arc<dyn BiometricPrompt>,
    ) -> Self {
        let prefs = SharedPrefs::new(&data_dir, &settings.prefs_file_name);
        let vault = TokenVault::new(prefs, settings.ciphertext_entry.clone());
        let gate = BiometricGate::new(prompt, settings.prompt.clone());

        Self {
            data_dir,
            settings,
            key_store,
            gate,
            vault,
            session: SessionState::new(),
        }
    }

    /// Initialize the data directory, load settings and open the default key
    /// store for this build.
    pub fn open(data_dir: &Path, prompt: Arc<dyn BiometricPrompt>) -> Result<Self> {
        let data_dir = init_data_dir(data_dir)?;
        let settings = load_settings(&data_dir)?;
        let key_store = default_key_store(&data_dir)?;

        info!("Opened app state at {:?}", data_dir);
        Ok(Self::new(data_dir, settings, key_store, prompt))
    }
}

#[cfg(not(feature = "os-keyring"))]
fn default_key_store(data_dir: &Path) -> Result<Arc<dyn KeyStore>> {
    let path = crate::storage::get_keystore_path(data_dir);
    Ok(Arc::new(tokenlock_keyguard::SoftwareKeyStore::open(path)?))
}

#[cfg(feature = "os-keyring")]
fn default_key_store(_data_dir: &Path) -> Result<Arc<dyn KeyStore>> {
    Ok(Arc::new(tokenlock_keyguard::KeyringKeyStore::new()))
}
