use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use tokenlock_keyguard::PromptInfo;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Name of the biometric-bound key in the key store.
    pub key_name: String,
    /// Preferences file holding the ciphertext record (without extension).
    pub prefs_file_name: String,
    /// Entry name of the ciphertext record inside the preferences file.
    pub ciphertext_entry: String,
    pub min_password_length: usize,
    pub prompt: PromptInfo,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            key_name: "biometric_sample_encryption_key".to_string(),
            prefs_file_name: "biometric_prefs".to_string(),
            ciphertext_entry: "ciphertext_wrapper".to_string(),
            min_password_length: 4,
            prompt: PromptInfo::default(),
        }
    }
}

fn get_settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

pub fn load_settings(data_dir: &Path) -> Result<AppSettings> {
    let path = get_settings_path(data_dir);

    if !path.exists() {
        return Ok(AppSettings::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let settings: AppSettings = serde_json::from_str(&content)?;
    Ok(settings)
}

pub fn save_settings(data_dir: &Path, settings: &AppSettings) -> Result<()> {
    let path = get_settings_path(data_dir);
    let content = serde_json::to_string_pretty(settings)?;

    // Write atomically (write to temp file, then rename)
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, &path)?;
    Ok(())
}
