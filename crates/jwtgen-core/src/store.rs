//! Persisted settings.
//!
//! The UI caches exactly one value between runs: the last entered Web API key.
//! Access goes through [`SettingsStore`] so the controller never touches the
//! filesystem directly.
//!
//! [`FileStore`] keeps values in `<base>/state.json` with restricted
//! permissions (0600). Values are plain strings, no schema versioning.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::paths;

/// Storage key for the cached Web API key.
pub const API_KEY_STORAGE_KEY: &str = "jwt-generator-apiKey";

/// Narrow key/value persistence interface.
pub trait SettingsStore {
    /// Reads a value. Returns `None` when the key was never written.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn persist(&mut self, key: &str, value: &str) -> Result<()>;
}

/// JSON file backed store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store at the default location (`<JWTGEN_HOME>/state.json`).
    pub fn open_default() -> Self {
        Self::at(paths::state_path())
    }

    /// Creates a store backed by a specific file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state from {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse state from {}", self.path.display()))
    }

    /// Writes the whole map to a sibling temp file, then renames it over
    /// the state file so readers never see a partial write.
    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(values).context("Failed to serialize state")?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&tmp_path)
            .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
        file.write_all(contents.as_bytes())
            .and_then(|()| file.sync_all())
            .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }
}

impl SettingsStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn persist(&mut self, key: &str, value: &str) -> Result<()> {
        // Unknown keys written by other versions are carried over untouched.
        // A file that cannot be read back is replaced rather than blocking
        // every later write.
        let mut values = self.read_all().unwrap_or_else(|err| {
            tracing::warn!(
                error = %format_args!("{err:#}"),
                path = %self.path.display(),
                "discarding unreadable state file"
            );
            BTreeMap::new()
        });
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)?;
        tracing::debug!(key, path = %self.path.display(), "persisted setting");
        Ok(())
    }
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with one value.
    pub fn with_value(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.values.insert(key.to_string(), value.to_string());
        store
    }

    /// Returns the stored value without going through the trait.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn persist(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_missing_file_loads_nothing() {
        let dir = tempdir().unwrap();
        let store = FileStore::at(dir.path().join("state.json"));

        assert_eq!(store.load(API_KEY_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_persist_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let mut store = FileStore::at(&path);

        store.persist(API_KEY_STORAGE_KEY, "AIzaFAKE123").unwrap();

        assert!(path.exists());
        let reopened = FileStore::at(&path);
        assert_eq!(
            reopened.load(API_KEY_STORAGE_KEY).unwrap().as_deref(),
            Some("AIzaFAKE123")
        );
    }

    #[test]
    fn test_persist_overwrites_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = FileStore::at(&path);

        store.persist(API_KEY_STORAGE_KEY, "first").unwrap();
        store.persist(API_KEY_STORAGE_KEY, "second").unwrap();
        let once = fs::read_to_string(&path).unwrap();
        store.persist(API_KEY_STORAGE_KEY, "second").unwrap();
        let twice = fs::read_to_string(&path).unwrap();

        assert_eq!(once, twice);
        assert_eq!(
            store.load(API_KEY_STORAGE_KEY).unwrap().as_deref(),
            Some("second")
        );
    }

    #[test]
    fn test_empty_string_is_stored_verbatim() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::at(dir.path().join("state.json"));

        store.persist(API_KEY_STORAGE_KEY, "").unwrap();

        assert_eq!(store.load(API_KEY_STORAGE_KEY).unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_other_keys_are_preserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"other": "value"}"#).unwrap();
        let mut store = FileStore::at(&path);

        store.persist(API_KEY_STORAGE_KEY, "key").unwrap();

        assert_eq!(store.load("other").unwrap().as_deref(), Some("value"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();
        let store = FileStore::at(&path);

        assert!(store.load(API_KEY_STORAGE_KEY).is_err());
    }

    #[test]
    fn test_persist_replaces_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"jwt-generator-apiKey": "AIz"#).unwrap();
        let mut store = FileStore::at(&path);

        store.persist(API_KEY_STORAGE_KEY, "AIzaFAKE123").unwrap();

        assert_eq!(
            store.load(API_KEY_STORAGE_KEY).unwrap().as_deref(),
            Some("AIzaFAKE123")
        );
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_state_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = FileStore::at(&path);
        store.persist(API_KEY_STORAGE_KEY, "key").unwrap();
        store.persist(API_KEY_STORAGE_KEY, "key2").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::with_value(API_KEY_STORAGE_KEY, "a");
        assert_eq!(store.get(API_KEY_STORAGE_KEY), Some("a"));

        store.persist(API_KEY_STORAGE_KEY, "b").unwrap();
        assert_eq!(store.load(API_KEY_STORAGE_KEY).unwrap().as_deref(), Some("b"));
    }
}
