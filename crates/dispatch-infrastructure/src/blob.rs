//! Durable object storage (part of C9's result-publishing path): a
//! filesystem-backed `BlobStore` for local and single-node deployments.
//!
//! The original platform uploads to Azure Blob Storage or S3 via `fsspec`
//! (`job_runner/runner.py::upload_result_to_azure` /
//! `upload_result_to_s3`), selecting a backend from configuration at
//! startup with a fallback between them. This workspace carries no cloud
//! SDK in its dependency stack, so the local/dev surface is a plain
//! directory tree addressed the same way: `{root}/{container}/{name}`,
//! returning a `file://` location.

use dispatch_domain::error::{Error, Result};
use dispatch_domain::ports::BlobStore;
use std::path::{Path, PathBuf};
use tracing::info;

/// `BlobStore` backed by a directory on local disk.
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    /// `root` is created on first use if it doesn't already exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, container: &str, name: &str) -> PathBuf {
        self.root.join(container).join(name)
    }
}

#[async_trait::async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, container: &str, name: &str, bytes: Vec<u8>) -> Result<String> {
        let path = self.object_path(container, name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::persistence_with_source(format!("failed to create blob directory {}", parent.display()), e))?;
        }

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| Error::persistence_with_source(format!("failed to write blob {}", path.display()), e))?;

        let location = format!("file://{}", absolute_display(&path));
        info!(container, name, bytes = bytes.len(), location, "blob stored");
        Ok(location)
    }
}

fn absolute_display(path: &Path) -> String {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf()).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_bytes_under_container_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());

        let location = store.put("execution-results", "req-1.json", b"{\"ok\":true}".to_vec()).await.unwrap();

        assert!(location.starts_with("file://"));
        let written = std::fs::read_to_string(dir.path().join("execution-results").join("req-1.json")).unwrap();
        assert_eq!(written, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn put_creates_missing_container_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path().join("nested").join("root"));

        let result = store.put("c", "n.json", b"{}".to_vec()).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn put_overwrites_an_existing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());

        store.put("c", "n.json", b"first".to_vec()).await.unwrap();
        store.put("c", "n.json", b"second".to_vec()).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("c").join("n.json")).unwrap();
        assert_eq!(written, "second");
    }
}
