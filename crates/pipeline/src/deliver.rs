//! Getting rendered output to the caller.
//!
//! Streamed output stays in memory and comes back base64 encoded. Stored
//! output is written by the engine straight into a location reserved with
//! the host file store, then registered and handed back as a redirect.

use crate::error::{ErrorKind, Result};
use crate::filename::FilenameTemplate;
use crate::host::RequestContext;
use crate::options::{OutputFormat, OutputTarget};
use crate::result::{Download, RenderResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pressroom_render::{RenderEngine, RenderJob};
use pressroom_storage::{FileStore, NewFile};
use std::path::PathBuf;
use tracing::instrument;

/// Where one render's output goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    Stream,
    File { location: PathBuf, filename: String, min_role_read: u32 },
}

/// Output of the engine for a [`Destination`].
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Bytes(Vec<u8>),
    Written(u64),
}

pub struct Delivery<'a> {
    engine: &'a dyn RenderEngine,
    store: &'a dyn FileStore,
    format: OutputFormat,
}

impl<'a> Delivery<'a> {
    pub fn new(engine: &'a dyn RenderEngine, store: &'a dyn FileStore, format: OutputFormat) -> Self {
        Self { engine, store, format }
    }

    /// Picks the destination, reserving a store location for file targets.
    ///
    /// `default_name` is the page or view name, used when no filename
    /// template was given. `inherited_role` is the source's read role.
    pub async fn prepare(
        &self,
        target: &OutputTarget,
        default_name: &str,
        inherited_role: u32,
        request: &RequestContext,
    ) -> Result<Destination> {
        let OutputTarget::File { filename, min_role_read } = target else {
            return Ok(Destination::Stream);
        };
        let filename = match filename.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
            Some(template) => {
                template.parse::<FilenameTemplate>()?.render(request.row.as_ref(), request.user.as_ref())?
            },
            None => format!("{default_name}.{}", self.format.extension()),
        };
        let location = self.store.allocate_path(&filename).await.map_err(ErrorKind::storage)?;
        Ok(Destination::File { location, filename, min_role_read: min_role_read.unwrap_or(inherited_role) })
    }

    pub async fn render(&self, job: &RenderJob, destination: &Destination) -> Result<Output> {
        match destination {
            Destination::Stream => self.engine.render(job).await.map(Output::Bytes).map_err(ErrorKind::render),
            Destination::File { location, .. } => {
                self.engine.render_to(job, location).await.map(Output::Written).map_err(ErrorKind::render)
            },
        }
    }

    /// Gives back a reserved location after a failed render.
    pub async fn abandon(&self, destination: Destination) {
        if let Destination::File { location, .. } = destination
            && let Err(err) = self.store.discard(&location).await
        {
            tracing::warn!(location = %location.display(), error = ?err, "Could not discard reserved location");
        }
    }

    #[instrument(skip_all, fields(format = ?self.format))]
    pub async fn deliver(&self, output: Output, destination: Destination, owner: Option<u64>) -> Result<RenderResult> {
        match (output, destination) {
            (Output::Bytes(bytes), Destination::Stream) => {
                tracing::debug!(bytes = bytes.len(), "Streaming document");
                Ok(RenderResult::Download {
                    download: Download { blob: STANDARD.encode(&bytes), mimetype: self.format.mime_type() },
                })
            },
            (Output::Written(size_bytes), Destination::File { location, filename, min_role_read }) => {
                let (mime_super, mime_sub) = self.format.mime_parts();
                let stored = self
                    .store
                    .persist(NewFile {
                        location,
                        filename,
                        owner,
                        size_bytes,
                        mime_super: mime_super.to_string(),
                        mime_sub: mime_sub.to_string(),
                        min_role_read,
                    })
                    .await
                    .map_err(ErrorKind::storage)?;
                Ok(RenderResult::goto(self.store.serve_path(&stored).map_err(ErrorKind::storage)?))
            },
            (Output::Bytes(_), Destination::File { .. }) | (Output::Written(_), Destination::Stream) => {
                exn::bail!(ErrorKind::InvalidRequest("output does not match its destination".to_string()))
            },
        }
    }
}
