//! App-private key-value preferences file.
//!
//! A small JSON object on disk, one value per entry name. Every write replaces
//! the whole file atomically (temp file, then rename) and the file is kept at
//! `0600` on Unix. A file that no longer parses is reported as `Storage` on
//! reads and replaced by the next write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, TokenLockError};

/// A file-backed preferences store.
#[derive(Debug, Clone)]
pub struct SharedPrefs {
    path: PathBuf,
}

impl SharedPrefs {
    /// Preferences stored in `<data_dir>/<file_name>.json`.
    pub fn new(data_dir: &Path, file_name: &str) -> Self {
        Self {
            path: data_dir.join(format!("{}.json", file_name)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the entry `key`. Returns `None` if the file or entry is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut entries = self.read_all()?;
        match entries.remove(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.read_all()?.contains_key(key))
    }

    /// Write the entry `key`, replacing any previous value.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let (mut entries, _) = self.read_for_update()?;
        entries.insert(key.to_string(), serde_json::to_value(value)?);
        self.write_all(&entries)?;
        debug!("Stored prefs entry {} in {:?}", key, self.path);
        Ok(())
    }

    /// Remove the entry `key`. Succeeds if it does not exist.
    pub fn remove(&self, key: &str) -> Result<()> {
        let (mut entries, replaced) = self.read_for_update()?;
        if entries.remove(key).is_some() || replaced {
            self.write_all(&entries)?;
            debug!("Removed prefs entry {} from {:?}", key, self.path);
        }
        Ok(())
    }

    fn read_all(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read(&self.path)?;
        serde_json::from_slice(&content).map_err(|e| {
            TokenLockError::Storage(format!("Failed to parse prefs file {:?}: {}", self.path, e))
        })
    }

    /// Entries to start a write from. An unparseable file is discarded, and
    /// the flag tells the caller it must be rewritten.
    fn read_for_update(&self) -> Result<(BTreeMap<String, serde_json::Value>, bool)> {
        match self.read_all() {
            Ok(entries) => Ok((entries, false)),
            Err(TokenLockError::Storage(reason)) => {
                warn!("Replacing unreadable prefs file: {}", reason);
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, serde_json::Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_vec_pretty(entries)?;

        // Write atomically (write to temp file, then rename)
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &self.path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}
