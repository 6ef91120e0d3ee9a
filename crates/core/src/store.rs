//! Credential persistence
//!
//! The session keeps an in-memory copy of the credential, but a
//! [`CredentialStore`] is the source of truth that survives restarts.
//! Backends only need get/set/clear; anything durable works.

use crate::{Credential, CoreError, CoreResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored credential, `None` when nobody is logged in
    async fn get(&self) -> CoreResult<Option<Credential>>;

    /// Replace the stored credential
    async fn set(&self, credential: &Credential) -> CoreResult<()>;

    /// Remove any stored credential
    async fn clear(&self) -> CoreResult<()>;
}

/// Process-local store, used in tests and for throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `credential`
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> CoreResult<Option<Credential>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn set(&self, credential: &Credential) -> CoreResult<()> {
        *self.slot.lock().await = Some(credential.clone());
        Ok(())
    }

    async fn clear(&self) -> CoreResult<()> {
        *self.slot.lock().await = None;
        Ok(())
    }
}

/// JSON file on disk holding a single credential
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes writers so a clear cannot interleave with a rename.
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store `credentials.json` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join("credentials.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self) -> CoreResult<Option<Credential>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, credential: &Credential) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_vec_pretty(credential)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            CoreError::io_error(format!(
                "failed to move credentials into {}: {e}",
                self.path.display()
            ))
        })?;

        debug!(path = %self.path.display(), "Persisted credentials");
        Ok(())
    }

    async fn clear(&self) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed stored credentials");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::User;
    use tempfile::TempDir;

    fn sample() -> Credential {
        Credential::new("access-1")
            .with_refresh("refresh-1")
            .with_user(User::new(3, "lena"))
    }

    #[tokio::test]
    async fn test_memory_store_lifecycle() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get().await.unwrap(), None);

        store.set(&sample()).await.unwrap();
        assert_eq!(store.get().await.unwrap(), Some(sample()));

        store.clear().await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_survives_new_instance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        FileCredentialStore::new(&path).set(&sample()).await.unwrap();

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.get().await.unwrap(), Some(sample()));
        assert!(!reopened.temp_path().exists());
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::in_dir(dir.path());

        assert_eq!(store.get().await.unwrap(), None);
        // clearing twice is fine
        store.clear().await.unwrap();
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::in_dir(dir.path());

        store.set(&sample()).await.unwrap();
        assert!(store.path().exists());

        store.clear().await.unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::in_dir(dir.path());
        std::fs::write(store.path(), b"not json").unwrap();

        let err = store.get().await.unwrap_err();
        assert!(matches!(err, CoreError::Serialization { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::in_dir(dir.path());
        store.set(&sample()).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
