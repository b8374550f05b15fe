//! Overlay asset registry.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use vcomp_models::{AssetRef, AssetResolver};

use crate::error::{StorageError, StorageResult};

/// Stores reusable overlay assets (images, clips) under opaque references.
#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
}

impl AssetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store `data` and return the reference to use in an overlay's `content`.
    ///
    /// The extension of `original_name` is kept when it is plain
    /// alphanumeric, so FFmpeg can still sniff the format from the name.
    pub async fn register(&self, data: &[u8], original_name: Option<&str>) -> StorageResult<AssetRef> {
        let extension = original_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str());
        let reference = AssetRef::generate(extension);

        fs::create_dir_all(&self.dir).await?;

        let target = self.dir.join(reference.as_str());
        let tmp = self.dir.join(format!(".{}.tmp", reference.as_str()));
        fs::write(&tmp, data).await?;
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StorageError::write_failed(format!(
                "Failed to store asset {}: {}",
                target.display(),
                e
            )));
        }

        info!(asset = %reference, bytes = data.len(), "Registered overlay asset");
        Ok(reference)
    }

    /// Path of a registered asset, if the reference is well-formed and present.
    pub fn path_of(&self, reference: &str) -> Option<PathBuf> {
        let reference = AssetRef(reference.to_string());
        if !reference.is_path_safe() {
            return None;
        }
        let path = self.dir.join(reference.as_str());
        path.is_file().then_some(path)
    }
}

impl AssetResolver for AssetStore {
    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        self.path_of(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_register_and_resolve() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path().join("overlays"));

        let reference = store.register(b"PNGDATA", Some("Logo.PNG")).await.unwrap();
        assert!(reference.as_str().ends_with(".png"));

        let path = store.resolve(reference.as_str()).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"PNGDATA");
    }

    #[tokio::test]
    async fn test_register_without_extension() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path());

        let reference = store.register(b"x", None).await.unwrap();
        assert!(!reference.as_str().contains('.'));
        assert!(store.resolve(reference.as_str()).is_some());
    }

    #[test]
    fn test_resolve_rejects_traversal_and_missing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("secret"), b"s").unwrap();
        let store = AssetStore::new(dir.path().join("overlays"));

        assert!(store.resolve("../secret").is_none());
        assert!(store.resolve("/etc/passwd").is_none());
        assert!(store.resolve("").is_none());
        assert!(store.resolve("missing.png").is_none());
    }
}
