mod config;
mod prefs;

use std::path::{Path, PathBuf};

use crate::error::{Result, TokenLockError};

pub use config::{load_settings, save_settings, AppSettings};
pub use prefs::SharedPrefs;

/// File name of the software key store inside the data directory.
pub const KEYSTORE_FILE_NAME: &str = "keystore.json";

/// Create the data directory if needed. Must run before any storage operation.
pub fn init_data_dir(data_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir).map_err(|e| {
        TokenLockError::Storage(format!(
            "Could not create data directory {:?}: {}",
            data_dir, e
        ))
    })?;
    Ok(data_dir.to_path_buf())
}

pub fn get_keystore_path(data_dir: &Path) -> PathBuf {
    data_dir.join(KEYSTORE_FILE_NAME)
}
