//! Key-value persistence for small session blobs
//!
//! The session layer stores a handful of opaque string entries (token,
//! expiry, device id). It does not care where they live, only that a group
//! of entries is written all-or-nothing.
//!
//! - [`MemoryStore`]: process-local, for tests and ephemeral sessions
//! - [`FileStore`]: one JSON object on disk, replaced atomically via rename
//!
//! # Example
//!
//! ```rust
//! use dietlog_core::storage::{KeyValueStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.put_all(&[("token", "abc"), ("device", "d-1")]).unwrap();
//! assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));
//! ```

use crate::error::{Error, Result, ResultExt};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Blob store the credential layer depends on
pub trait KeyValueStore: Send + Sync {
    /// Read one entry
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write every entry or none of them
    fn put_all(&self, entries: &[(&str, &str)]) -> Result<()>;

    /// Remove the given keys; missing keys are ignored
    fn remove_all(&self, keys: &[&str]) -> Result<()>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self
            .entries
            .read()
            .map_err(|_| Error::lock_poisoned("memory store"))?;
        Ok(guard.get(key).cloned())
    }

    fn put_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut guard = self
            .entries
            .write()
            .map_err(|_| Error::lock_poisoned("memory store"))?;
        for (key, value) in entries {
            guard.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let mut guard = self
            .entries
            .write()
            .map_err(|_| Error::lock_poisoned("memory store"))?;
        for key in keys {
            guard.remove(*key);
        }
        Ok(())
    }
}

/// File-backed store with an in-memory mirror
///
/// Every mutation rewrites the whole file through a temporary sibling and a
/// rename, so readers of the file never see a partial write. The mirror is
/// only updated after the rename succeeds.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    mirror: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) a store at `path`.
    ///
    /// A missing file is an empty store. An unreadable one is an error so
    /// callers can decide whether to discard it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(Error::from)
                .context(format!("Reading {}", path.display()))?;
            serde_json::from_str(&content)
                .map_err(|e| Error::storage_corrupted(&path).with_source(e))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            mirror: RwLock::new(entries),
        })
    }

    /// Default location under the platform data directory
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from(".dietlog"))
            .join("dietlog")
            .join("credentials.json")
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
                // best effort, the file itself is still owner-only
                let _ = restrict(parent, 0o700);
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(entries)?;
        {
            let mut options = fs::OpenOptions::new();
            options.create(true).truncate(true).write(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            let mut file = options.open(&tmp)?;
            // a leftover temp file keeps its old mode through open()
            restrict(&tmp, 0o600)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
            .map_err(Error::from)
            .context(format!("Replacing {}", self.path.display()))
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut guard = self
            .mirror
            .write()
            .map_err(|_| Error::lock_poisoned("file store"))?;
        let mut next = guard.clone();
        apply(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }
}

/// Limit `path` to its owner
#[cfg(unix)]
fn restrict(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn restrict(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self
            .mirror
            .read()
            .map_err(|_| Error::lock_poisoned("file store"))?;
        Ok(guard.get(key).cloned())
    }

    fn put_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        self.mutate(|map| {
            for (key, value) in entries {
                map.insert((*key).to_string(), (*value).to_string());
            }
        })
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        self.mutate(|map| {
            for key in keys {
                map.remove(*key);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.put_all(&[("a", "1"), ("b", "2")]).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.remove_all(&["a", "missing"]).unwrap();
        assert!(store.get("a").unwrap().is_none());
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::open(&path).unwrap();
        store.put_all(&[("token", "abc"), ("device", "d-1")]).unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("device").unwrap().as_deref(), Some("d-1"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_remove() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        let store = FileStore::open(&path).unwrap();
        store.put_all(&[("token", "abc")]).unwrap();
        store.remove_all(&["token"]).unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert!(reopened.get("token").unwrap().is_none());
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let err = FileStore::open(&path).unwrap_err();
        assert_eq!(err.code, ErrorCode::StorageCorrupted);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let parent = dir.path().join("dietlog");
        let path = parent.join("session.json");

        // a stale world-readable temp file must not leak its mode
        fs::create_dir(&parent).unwrap();
        fs::write(path.with_extension("json.tmp"), "").unwrap();
        fs::set_permissions(
            path.with_extension("json.tmp"),
            fs::Permissions::from_mode(0o644),
        )
        .unwrap();

        let store = FileStore::open(&path).unwrap();
        store.put_all(&[("token", "secret")]).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_created_parent_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let parent = dir.path().join("fresh");
        let store = FileStore::open(parent.join("session.json")).unwrap();
        store.put_all(&[("token", "secret")]).unwrap();

        let mode = fs::metadata(&parent).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn test_failed_write_keeps_mirror() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::open(&path).unwrap();
        store.put_all(&[("token", "old")]).unwrap();

        // a directory in place of the file makes the rename fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(store.put_all(&[("token", "new")]).is_err());
        assert_eq!(store.get("token").unwrap().as_deref(), Some("old"));
    }
}
