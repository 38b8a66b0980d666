//! Local filesystem file store.
//!
//! Every document gets its own randomly named directory under the root so
//! that two renders producing `report.pdf` never collide, while the served URL
//! still ends in the human-readable file name. Metadata is written next to the
//! document as a hidden JSON sidecar.

use super::{FileStore, NewFile, StoredFile, size_kb};
use crate::error::{ErrorKind, Result};
use crate::path::{relative_to, validate_filename};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;
use tracing::instrument;

/// Directory-backed [`FileStore`].
///
/// # Examples
///
/// ```no_run
/// use pressroom_storage::store::{FileStore, LocalFileStore};
///
/// # async fn example() -> pressroom_storage::error::Result<()> {
/// let store = LocalFileStore::new("/srv/app/files", "/files/serve/")?;
/// let path = store.allocate_path("report.pdf").await?;
/// assert!(path.ends_with("report.pdf"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
    serve_route: String,
}

impl LocalFileStore {
    /// Opens (creating if needed) a store rooted at the absolute path `root`.
    pub fn new(root: impl AsRef<Path>, serve_route: impl Into<String>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Use non-async here; it only happens once at startup.
            std::fs::create_dir_all(&root).map_err(ErrorKind::from)?;
        }
        Ok(Self { root, serve_route: serve_route.into() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sidecar(location: &Path) -> Option<PathBuf> {
        let name = location.file_name()?.to_str()?;
        Some(location.with_file_name(format!(".{name}.json")))
    }

    /// Reads back the metadata recorded for `location`.
    pub async fn metadata(&self, location: &Path) -> Result<StoredFile> {
        let sidecar = Self::sidecar(location).ok_or_else(|| ErrorKind::InvalidPath(location.to_path_buf()))?;
        if !sidecar.exists() {
            exn::bail!(ErrorKind::NotFound(location.to_path_buf()));
        }
        let raw = fs::read(&sidecar).await.map_err(ErrorKind::from)?;
        serde_json::from_slice(&raw).or_raise(|| ErrorKind::Metadata)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    fn staging_dir(&self) -> &Path {
        &self.root
    }

    fn serve_route(&self) -> &str {
        &self.serve_route
    }

    #[instrument(skip(self))]
    async fn allocate_path(&self, suggested_name: &str) -> Result<PathBuf> {
        let filename = validate_filename(suggested_name)?;
        // `keep` stops tempfile from deleting the reserved directory on drop.
        let dir = tempfile::Builder::new().prefix("doc-").tempdir_in(&self.root).map_err(ErrorKind::from)?.keep();
        Ok(dir.join(filename))
    }

    #[instrument(skip_all, fields(location = %file.location.display(), size = file.size_bytes))]
    async fn persist(&self, file: NewFile) -> Result<StoredFile> {
        if !file.location.exists() {
            exn::bail!(ErrorKind::NotFound(file.location));
        }
        let id = relative_to(&self.root, &file.location)?;
        let stored = StoredFile {
            id,
            filename: file.filename,
            owner: file.owner,
            size_kb: size_kb(file.size_bytes),
            mime_super: file.mime_super,
            mime_sub: file.mime_sub,
            min_role_read: file.min_role_read,
            uploaded_at: OffsetDateTime::now_utc(),
            location: file.location,
        };
        let sidecar =
            Self::sidecar(&stored.location).ok_or_else(|| ErrorKind::InvalidPath(stored.location.clone()))?;
        let json = serde_json::to_vec_pretty(&stored).or_raise(|| ErrorKind::Metadata)?;
        fs::write(&sidecar, json).await.map_err(ErrorKind::from)?;
        tracing::info!(id = %stored.id, owner = ?stored.owner, role = stored.min_role_read, "Stored document");
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn discard(&self, location: &Path) -> Result<()> {
        relative_to(&self.root, location)?;
        match fs::remove_file(location).await {
            Ok(()) => {},
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
            Err(err) => exn::bail!(ErrorKind::from(err)),
        }
        // Only the per-document directory; never the root itself.
        if let Some(dir) = location.parent().filter(|dir| *dir != self.root) {
            fs::remove_dir(dir).await.map_err(ErrorKind::from)?;
        }
        tracing::debug!("Discarded reserved document location");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path(), "/files/serve/").unwrap();
        (dir, store)
    }

    #[test]
    fn test_rejects_relative_root() {
        let err = LocalFileStore::new("relative/files", "/files/serve/").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_allocate_path_is_unique_and_keeps_name() {
        let (_dir, store) = store();
        let a = store.allocate_path("report.pdf").await.unwrap();
        let b = store.allocate_path("report.pdf").await.unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with("report.pdf"));
        assert!(a.starts_with(store.root()));
        assert!(a.parent().unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_allocate_path_rejects_traversal() {
        let (_dir, store) = store();
        let err = store.allocate_path("../../etc/passwd").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidFilename(_)));
    }

    #[tokio::test]
    async fn test_persist_records_metadata_and_serve_path() {
        let (_dir, store) = store();
        let location = store.allocate_path("report-42.pdf").await.unwrap();
        std::fs::write(&location, vec![0u8; 2048]).unwrap();

        let stored = store
            .persist(NewFile {
                location: location.clone(),
                filename: "report-42.pdf".to_string(),
                owner: Some(7),
                size_bytes: 2048,
                mime_super: "application".to_string(),
                mime_sub: "pdf".to_string(),
                min_role_read: 40,
            })
            .await
            .unwrap();
        assert_eq!(stored.size_kb, 2);
        assert!(stored.id.ends_with("/report-42.pdf"));
        assert_eq!(store.serve_path(&stored).unwrap(), format!("/files/serve/{}", stored.id));

        let reread = store.metadata(&location).await.unwrap();
        assert_eq!(reread, stored);
    }

    #[tokio::test]
    async fn test_persist_missing_file() {
        let (_dir, store) = store();
        let location = store.root().join("never-written.pdf");
        let err = store
            .persist(NewFile {
                location,
                filename: "never-written.pdf".to_string(),
                owner: None,
                size_bytes: 0,
                mime_super: "application".to_string(),
                mime_sub: "pdf".to_string(),
                min_role_read: 100,
            })
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_discard_removes_file_and_reserved_directory() {
        let (_dir, store) = store();
        let location = store.allocate_path("broken.pdf").await.unwrap();
        std::fs::write(&location, b"partial").unwrap();
        store.discard(&location).await.unwrap();
        assert!(!location.exists());
        assert!(!location.parent().unwrap().exists());
        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn test_discard_outside_root() {
        let (_dir, store) = store();
        let err = store.discard(Path::new("/etc/passwd")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }
}
