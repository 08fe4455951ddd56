//! Temporary staging for uploaded images.
//!
//! Uploads are written to a staging directory before they're sent upstream and
//! removed again afterwards. The directory depends on where we're deployed: a
//! local checkout can use `./uploads`, a serverless host only lets us write
//! under `/tmp`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::MemeError;

/// Somewhere to park an upload while the upstream job runs.
#[async_trait]
pub trait UploadStorage: Send + Sync + std::fmt::Debug {
    /// Creates the backing location. Safe to call repeatedly.
    async fn prepare(&self) -> Result<(), MemeError>;
    /// Stores `bytes` under `name`, returning where it went.
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, MemeError>;
    /// Reads a stored upload back.
    async fn read(&self, path: &Path) -> Result<Vec<u8>, MemeError>;
    /// Deletes a stored upload.
    async fn remove(&self, path: &Path) -> std::io::Result<()>;
    /// Where uploads are kept, for diagnostics.
    fn location(&self) -> &Path;
}

/// Uploads kept as plain files in a directory.
#[derive(Clone, Debug)]
pub struct DiskStorage {
    dir: PathBuf,
}

impl DiskStorage {
    /// Storage rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl UploadStorage for DiskStorage {
    async fn prepare(&self) -> Result<(), MemeError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|err| {
            MemeError::LocalIo(format!(
                "Failed to create upload directory {}: {}",
                self.dir.display(),
                err
            ))
        })
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, MemeError> {
        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes).await.map_err(|err| {
            MemeError::LocalIo(format!(
                "Failed to save file to {}: {}",
                self.dir.display(),
                err
            ))
        })?;
        Ok(path)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, MemeError> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn remove(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    fn location(&self) -> &Path {
        &self.dir
    }
}

/// A staged upload. Removal is attempted once, either through [`StoredUpload::release`]
/// or in the background if the guard is dropped first.
#[derive(Debug)]
pub struct StoredUpload {
    storage: Arc<dyn UploadStorage>,
    path: PathBuf,
    released: bool,
}

impl StoredUpload {
    /// Prepares the storage and writes the upload into it.
    pub async fn stage(
        storage: Arc<dyn UploadStorage>,
        name: &str,
        bytes: &[u8],
    ) -> Result<Self, MemeError> {
        storage.prepare().await?;
        let path = storage.write(name, bytes).await?;
        debug!("Staged upload at {}", path.display());
        Ok(Self {
            storage,
            path,
            released: false,
        })
    }

    /// Where the upload was written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the staged bytes back.
    pub async fn read(&self) -> Result<Vec<u8>, MemeError> {
        self.storage.read(&self.path).await
    }

    /// Removes the upload. Failures are logged, never returned.
    pub async fn release(mut self) {
        self.released = true;
        if let Err(err) = self.storage.remove(&self.path).await {
            warn!("Failed to remove upload {}: {}", self.path.display(), err);
        }
    }
}

impl Drop for StoredUpload {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let storage = self.storage.clone();
        let path = std::mem::take(&mut self.path);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = storage.remove(&path).await {
                        warn!("Failed to remove upload {}: {}", path.display(), err);
                    }
                });
            }
            Err(_) => warn!("No runtime to remove upload {}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stage_read_release() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage: Arc<dyn UploadStorage> =
            Arc::new(DiskStorage::new(dir.path().join("nested").join("uploads")));

        let upload = StoredUpload::stage(storage, "abc_cat.png", b"not really a png")
            .await
            .expect("stage upload");
        let path = upload.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(upload.read().await.expect("read"), b"not really a png");

        upload.release().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn prepare_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = DiskStorage::new(dir.path().join("uploads"));
        storage.prepare().await.expect("first prepare");
        storage.prepare().await.expect("second prepare");
    }

    #[tokio::test]
    async fn release_ignores_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage: Arc<dyn UploadStorage> = Arc::new(DiskStorage::new(dir.path()));
        let upload = StoredUpload::stage(storage, "gone.jpg", b"x")
            .await
            .expect("stage upload");
        tokio::fs::remove_file(upload.path())
            .await
            .expect("remove behind its back");
        upload.release().await;
    }

    #[tokio::test]
    async fn dropped_guard_still_cleans_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage: Arc<dyn UploadStorage> = Arc::new(DiskStorage::new(dir.path()));
        let upload = StoredUpload::stage(storage, "dropped.gif", b"x")
            .await
            .expect("stage upload");
        let path = upload.path().to_path_buf();
        drop(upload);

        for _ in 0..50 {
            if !path.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(!path.exists());
    }
}
