//! In-memory render engine for testing.

use crate::engine::RenderEngine;
use crate::error::{ErrorKind, Result};
use crate::options::{Capture, RenderJob};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

/// Smallest byte sequence each output kind is recognisable by.
pub const MOCK_PDF: &[u8] = b"%PDF-1.7\n%mock\n%%EOF";
pub const MOCK_IMAGE: &[u8] = b"\x89PNG\r\n\x1a\nmock";

/// [`RenderEngine`] that records every job and returns canned bytes.
///
/// Selectors registered with [`with_missing_selector`](Self::with_missing_selector)
/// fail exactly like a real page without a matching element would, and
/// [`unreachable`](Self::unreachable) makes every navigation fail.
///
/// # Examples
///
/// ```
/// use pressroom_render::mock::MockEngine;
///
/// let engine = MockEngine::default().with_missing_selector("#missing");
/// ```
#[derive(Default)]
pub struct MockEngine {
    missing: HashSet<String>,
    unreachable: bool,
    jobs: Mutex<Vec<RenderJob>>,
}

impl MockEngine {
    pub fn with_missing_selector(mut self, selector: impl Into<String>) -> Self {
        self.missing.insert(selector.into());
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Every job received so far, oldest first.
    pub async fn jobs(&self) -> Vec<RenderJob> {
        self.jobs.lock().await.clone()
    }
}

#[async_trait]
impl RenderEngine for MockEngine {
    async fn render(&self, job: &RenderJob) -> Result<Vec<u8>> {
        self.jobs.lock().await.push(job.clone());
        if self.unreachable {
            exn::bail!(ErrorKind::Navigation { url: job.url.to_string(), reason: "unreachable".to_string() });
        }
        match &job.capture {
            Capture::Image(options) if self.missing.contains(&options.selector) => {
                exn::bail!(ErrorKind::SelectorNotFound(options.selector.clone()))
            },
            Capture::Image(_) => Ok(MOCK_IMAGE.to_vec()),
            Capture::Document(_) => Ok(MOCK_PDF.to_vec()),
        }
    }
}
