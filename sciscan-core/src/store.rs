//! String key-value storage backing the history cache.
//!
//! `FileStore` keeps one file per key inside a directory and replaces it with
//! a write-to-`.tmp`-then-rename so a crash never leaves a half-written value.
//! `MemoryStore` is the volatile backend used by tests and ephemeral sessions.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Minimal synchronous string store keyed by name.
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`. A missing key is `Ok(None)`.
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    /// Replace the value under `key` in one write.
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created lazily on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`. Characters outside `[A-Za-z0-9_-]` map to `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_stem}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        atomic_write(&self.path_for(key), value.as_bytes())
    }
}

/// Write to a `.tmp` sibling, then rename over the target.
///
/// Creates parent directories if they don't exist.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)
}

/// Process-local store; contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value, e.g. to simulate state left by an earlier run.
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self
            .values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        (**self).set(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.get("sciscan_history").unwrap(), None);
    }

    #[test]
    fn test_file_store_set_then_get() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("history"));
        store.set("sciscan_history", "[]").unwrap();
        assert_eq!(store.get("sciscan_history").unwrap().as_deref(), Some("[]"));

        store.set("sciscan_history", "[1]").unwrap();
        assert_eq!(store.get("sciscan_history").unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_file_store_leaves_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store.set("k", "v").unwrap();

        let path = store.path_for("k");
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_path_for_sanitizes_key() {
        let store = FileStore::new("/data");
        assert_eq!(
            store.path_for("../etc/passwd"),
            PathBuf::from("/data/___etc_passwd.json")
        );
    }

    #[test]
    fn test_file_store_write_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let store = FileStore::new(&blocker);
        assert!(store.set("k", "v").is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::with_value("a", "1");
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").unwrap(), None);
        store.set("b", "2").unwrap();
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }
}
