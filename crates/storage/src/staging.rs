//! Ephemeral staging of composed HTML.
//!
//! The headless browser can only see what the host serves over HTTP, so the
//! composed document is written into the host's served directory under a
//! unique name and addressed through the host's file-serving route. The
//! resulting [`StagedResource`] owns the file: [`release`](StagedResource::release)
//! deletes it and reports failures, and dropping an unreleased resource deletes
//! it silently. Either way the file never outlives the render call that staged it.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::instrument;
use url::Url;

const PREFIX: &str = "pressroom-";
const SUFFIX: &str = ".html";

/// Writes HTML snapshots into a served directory.
#[derive(Debug, Clone)]
pub struct Stager {
    dir: PathBuf,
    serve_route: String,
}

impl Stager {
    /// `dir` must be the directory served by the host at `serve_route`.
    pub fn new(dir: impl Into<PathBuf>, serve_route: impl AsRef<str>) -> Self {
        let route = serve_route.as_ref().trim().trim_matches('/');
        let serve_route = if route.is_empty() { String::new() } else { format!("{route}/") };
        Self { dir: dir.into(), serve_route }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `html` to a fresh file and computes the URL it will be served at,
    /// relative to `base` (an origin, optionally with a path prefix).
    #[instrument(skip_all, fields(base = %base, bytes = html.len()))]
    pub fn stage(&self, html: &str, base: &Url) -> Result<StagedResource> {
        let mut file = tempfile::Builder::new()
            .prefix(PREFIX)
            .suffix(SUFFIX)
            .tempfile_in(&self.dir)
            .map_err(ErrorKind::from)?;
        file.write_all(html.as_bytes()).map_err(ErrorKind::from)?;
        file.flush().map_err(ErrorKind::from)?;
        let basename = file
            .path()
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_raise(|| ErrorKind::InvalidPath(file.path().to_path_buf()))?
            .to_string();
        let url = self.address(base, &basename)?;
        tracing::debug!(path = %file.path().display(), url = %url, "Staged HTML snapshot");
        Ok(StagedResource { file, url })
    }

    fn address(&self, base: &Url, basename: &str) -> Result<Url> {
        let mut base = base.clone();
        // Joining against `https://host/app` would replace `app`; keep it as a directory.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);
        base.join(&format!("{}{basename}", self.serve_route)).or_raise(|| ErrorKind::Address(base.to_string()))
    }
}

/// A staged HTML file and the URL the host serves it at.
#[derive(Debug)]
pub struct StagedResource {
    file: NamedTempFile,
    url: Url,
}

impl StagedResource {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Deletes the staged file, consuming the handle.
    pub fn release(self) -> Result<()> {
        let path = self.file.path().to_path_buf();
        self.file.close().map_err(ErrorKind::from)?;
        tracing::trace!(path = %path.display(), "Released staged HTML snapshot");
        Ok(())
    }
}
