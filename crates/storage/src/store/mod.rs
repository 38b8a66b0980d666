//! Host file store interface.
//!
//! Persisted documents are handed to the host's file subsystem, which decides
//! where they live, remembers who may read them and serves them over HTTP.
//! [`FileStore`] is the narrow slice of that subsystem the render pipeline
//! needs; [`LocalFileStore`] implements it on a plain directory.

mod local;

pub use self::local::LocalFileStore;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use url::Url;

/// Metadata for a document about to be registered with the store.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Path previously returned by [`FileStore::allocate_path`].
    pub location: PathBuf,
    pub filename: String,
    pub owner: Option<u64>,
    pub size_bytes: u64,
    pub mime_super: String,
    pub mime_sub: String,
    pub min_role_read: u32,
}

/// A document the store has taken ownership of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Identifier used in the serve route (a root-relative path).
    pub id: String,
    pub location: PathBuf,
    pub filename: String,
    pub owner: Option<u64>,
    pub size_kb: u64,
    pub mime_super: String,
    pub mime_sub: String,
    pub min_role_read: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Directory the host serves at its file route; staged snapshots go here.
    fn staging_dir(&self) -> &Path;

    /// The route under which [`StoredFile::id`]s and staged files are served,
    /// e.g. `/files/serve/`.
    fn serve_route(&self) -> &str;

    /// Reserves a fresh, unique location for a file named `suggested_name`.
    ///
    /// Returns [`InvalidFilename`](crate::error::ErrorKind::InvalidFilename)
    /// if the name isn't a single plain path segment.
    async fn allocate_path(&self, suggested_name: &str) -> Result<PathBuf>;

    /// Records metadata for a file already written to its allocated location.
    async fn persist(&self, file: NewFile) -> Result<StoredFile>;

    /// Gives back a location from [`allocate_path`](Self::allocate_path) that
    /// will never be persisted, removing anything written to it.
    async fn discard(&self, location: &Path) -> Result<()>;

    /// Path (without origin) at which the host serves `file`, percent-encoded
    /// so names with spaces, `#` or `?` survive as a link.
    fn serve_path(&self, file: &StoredFile) -> Result<String> {
        encode_path(self.serve_route(), &file.id)
    }
}

/// Joins `route` and a `/`-separated `id`, encoding each segment.
pub(crate) fn encode_path(route: &str, id: &str) -> Result<String> {
    let failed = || ErrorKind::Address(format!("{route} {id}"));
    // Only the path of this URL is used.
    let mut url = Url::parse("http://localhost/").or_raise(failed)?;
    url.path_segments_mut()
        .map_err(|()| failed())?
        .clear()
        .extend(route.split('/').chain(id.split('/')).filter(|segment| !segment.is_empty()));
    Ok(url.path().to_string())
}

/// Converts a byte count to whole kibibytes, rounding to nearest.
pub(crate) fn size_kb(bytes: u64) -> u64 {
    (bytes + 512) / 1024
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0)]
    #[case(511, 0)]
    #[case(512, 1)]
    #[case(1024, 1)]
    #[case(1535, 1)]
    #[case(1536, 2)]
    fn test_size_kb_rounds(#[case] bytes: u64, #[case] expected: u64) {
        assert_eq!(size_kb(bytes), expected);
    }

    #[rstest]
    #[case("/files/serve/", "doc-1/report-42.pdf", "/files/serve/doc-1/report-42.pdf")]
    #[case("/files/serve/", "doc-1/invoice #42.pdf", "/files/serve/doc-1/invoice%20%2342.pdf")]
    #[case("/files/serve", "doc-1/what?.png", "/files/serve/doc-1/what%3F.png")]
    #[case("/files/serve/", "doc-1/100%.pdf", "/files/serve/doc-1/100%25.pdf")]
    fn test_serve_path_encodes_segments(#[case] route: &str, #[case] id: &str, #[case] expected: &str) {
        assert_eq!(encode_path(route, id).unwrap(), expected);
    }
}
