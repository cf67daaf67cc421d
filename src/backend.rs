// Backend locator: owns the base URL every request is built from, plus
// the small key-value store that keeps a custom URL across runs.

use crate::error::Result;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:2233";
pub const BACKEND_URL_KEY: &str = "meme-generator-backend-url";

/// Persistent key-value storage, the terminal counterpart of browser
/// local storage.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile storage, lost when the process exits.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Storage backed by a JSON object file. The file is read once on open
/// and rewritten on every change.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            if data.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&data)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
            }
        } else {
            BTreeMap::new()
        };
        Ok(FileStorage {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// `<config dir>/meme-generator/storage.json`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("meme-generator").join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

/// Single source of truth for where the service lives.
pub struct BackendLocator {
    current: RwLock<String>,
    storage: Box<dyn Storage>,
}

impl BackendLocator {
    /// Start from the persisted override when one exists, else the default.
    pub fn new(storage: impl Storage + 'static) -> Self {
        let current = storage
            .get(BACKEND_URL_KEY)
            .map(|url| normalize(&url).to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        BackendLocator {
            current: RwLock::new(current),
            storage: Box::new(storage),
        }
    }

    pub fn backend_url(&self) -> String {
        self.current.read().clone()
    }

    pub fn default_url(&self) -> &'static str {
        DEFAULT_BACKEND_URL
    }

    /// Switch backends. Blank input or the default URL clears the override;
    /// anything else is normalized and persisted. The in-memory value is
    /// updated even if writing to storage fails.
    pub fn set_backend_url(&self, url: &str) -> Result<()> {
        let trimmed = normalize(url);
        let custom = !trimmed.is_empty() && trimmed != DEFAULT_BACKEND_URL;
        let next = if custom { trimmed } else { DEFAULT_BACKEND_URL };

        *self.current.write() = next.to_string();
        info!(backend = next, custom, "backend url changed");

        if custom {
            self.storage.set(BACKEND_URL_KEY, next)
        } else {
            self.storage.remove(BACKEND_URL_KEY)
        }
    }

    pub fn is_custom_backend(&self) -> bool {
        *self.current.read() != DEFAULT_BACKEND_URL
    }

    /// `base + path`; `path` is expected to start with `/`.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.current.read(), path)
    }
}

fn normalize(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemeError;
    use std::sync::Arc;

    // Shares its map with the locator so tests can inspect what was persisted.
    #[derive(Clone, Default)]
    struct SharedStorage(Arc<MemoryStorage>);

    impl Storage for SharedStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.0.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<()> {
            self.0.remove(key)
        }
    }

    struct ReadOnlyStorage;

    impl Storage for ReadOnlyStorage {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into())
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[test]
    fn starts_on_default_without_override() {
        let locator = BackendLocator::new(MemoryStorage::new());
        assert_eq!(locator.backend_url(), DEFAULT_BACKEND_URL);
        assert!(!locator.is_custom_backend());
    }

    #[test]
    fn starts_on_persisted_override() {
        let storage = MemoryStorage::new();
        storage.set(BACKEND_URL_KEY, "https://memes.example").unwrap();
        let locator = BackendLocator::new(storage);
        assert_eq!(locator.backend_url(), "https://memes.example");
        assert!(locator.is_custom_backend());
    }

    #[test]
    fn persisted_override_is_normalized() {
        let storage = MemoryStorage::new();
        storage.set(BACKEND_URL_KEY, " http://x.test/ ").unwrap();
        let locator = BackendLocator::new(storage);
        assert_eq!(locator.backend_url(), "http://x.test");
        assert_eq!(locator.url("/image/abc"), "http://x.test/image/abc");

        let storage = MemoryStorage::new();
        storage.set(BACKEND_URL_KEY, " // ").unwrap();
        let locator = BackendLocator::new(storage);
        assert_eq!(locator.backend_url(), DEFAULT_BACKEND_URL);
    }

    #[test]
    fn failed_write_still_switches_backend() {
        let locator = BackendLocator::new(ReadOnlyStorage);
        let err = locator.set_backend_url("http://offline.test/").unwrap_err();
        assert!(matches!(err, MemeError::Io(_)));
        assert_eq!(locator.backend_url(), "http://offline.test");
        assert!(locator.is_custom_backend());

        assert!(locator.set_backend_url("").is_err());
        assert_eq!(locator.backend_url(), locator.default_url());
    }

    #[test]
    fn empty_persisted_value_is_ignored() {
        let storage = MemoryStorage::new();
        storage.set(BACKEND_URL_KEY, "").unwrap();
        let locator = BackendLocator::new(storage);
        assert_eq!(locator.backend_url(), DEFAULT_BACKEND_URL);
    }

    #[test]
    fn trailing_slash_is_stripped_and_persisted() {
        let storage = SharedStorage::default();
        let locator = BackendLocator::new(storage.clone());
        locator.set_backend_url("http://example.com/").unwrap();
        assert_eq!(locator.backend_url(), "http://example.com");
        assert_eq!(
            storage.get(BACKEND_URL_KEY).as_deref(),
            Some("http://example.com")
        );
        assert!(locator.is_custom_backend());
    }

    #[test]
    fn whitespace_and_repeated_slashes_are_stripped() {
        let locator = BackendLocator::new(MemoryStorage::new());
        locator.set_backend_url("  http://example.com///  ").unwrap();
        assert_eq!(locator.backend_url(), "http://example.com");
    }

    #[test]
    fn setting_default_clears_override() {
        let storage = SharedStorage::default();
        let locator = BackendLocator::new(storage.clone());
        locator.set_backend_url("http://other:9000").unwrap();
        locator.set_backend_url("http://localhost:2233/").unwrap();
        assert_eq!(locator.backend_url(), DEFAULT_BACKEND_URL);
        assert!(!locator.is_custom_backend());
        assert!(storage.get(BACKEND_URL_KEY).is_none());
    }

    #[test]
    fn blank_input_resets_to_default() {
        let storage = SharedStorage::default();
        let locator = BackendLocator::new(storage.clone());
        locator.set_backend_url("http://other:9000").unwrap();
        locator.set_backend_url("   ").unwrap();
        assert_eq!(locator.backend_url(), DEFAULT_BACKEND_URL);
        assert!(storage.get(BACKEND_URL_KEY).is_none());
    }

    #[test]
    fn setting_same_value_twice_is_stable() {
        let storage = SharedStorage::default();
        let locator = BackendLocator::new(storage.clone());
        locator.set_backend_url("http://a.test").unwrap();
        locator.set_backend_url("http://a.test").unwrap();
        assert_eq!(locator.backend_url(), "http://a.test");
        assert_eq!(storage.get(BACKEND_URL_KEY).as_deref(), Some("http://a.test"));
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let locator = BackendLocator::new(FileStorage::open(&path).unwrap());
        locator.set_backend_url("http://persisted.test/").unwrap();
        drop(locator);

        let reopened = BackendLocator::new(FileStorage::open(&path).unwrap());
        assert_eq!(reopened.backend_url(), "http://persisted.test");

        reopened.set_backend_url("").unwrap();
        let storage = FileStorage::open(&path).unwrap();
        assert!(storage.get(BACKEND_URL_KEY).is_none());
    }

    #[test]
    fn corrupt_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"meme-generator-backend-url": 5}"#).unwrap();
        let err = FileStorage::open(&path).err().unwrap();
        assert!(matches!(err, MemeError::Io(ref e) if e.kind() == io::ErrorKind::InvalidData));
    }
}
