use crate::browser::BrowserSession;
use crate::chrome::Chrome;
use crate::error::{ErrorKind, Result};
use crate::launch::LaunchOptions;
use crate::options::RenderJob;
use async_trait::async_trait;
use exn::ResultExt;
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

/// Turns a [`RenderJob`] into document bytes.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Renders and returns the output in memory.
    async fn render(&self, job: &RenderJob) -> Result<Vec<u8>>;

    /// Renders straight into `save_to`, returning the number of bytes written.
    async fn render_to(&self, job: &RenderJob, save_to: &Path) -> Result<u64> {
        let bytes = self.render(job).await?;
        tokio::fs::write(save_to, &bytes).await.or_raise(|| ErrorKind::Io)?;
        Ok(bytes.len() as u64)
    }
}

/// A launched browser, good for exactly one capture.
pub(crate) trait Session {
    async fn capture(&self, job: &RenderJob, save_to: Option<&Path>, limit: Duration) -> Result<Vec<u8>>;

    async fn close(self);
}

/// Captures, then closes the session whatever the outcome, and only then
/// reports the capture result.
pub(crate) async fn drive<S: Session>(
    session: S,
    job: &RenderJob,
    save_to: Option<&Path>,
    limit: Duration,
) -> Result<Vec<u8>> {
    let outcome = session.capture(job, save_to, limit).await;
    session.close().await;
    outcome
}

/// [`RenderEngine`] driving a fresh headless Chrome per render.
///
/// Nothing is shared between renders: each call launches its own browser
/// with a throw-away profile and tears it down before returning, whether
/// or not the capture succeeded.
#[derive(Debug, Clone)]
pub struct ChromeEngine {
    chrome: Chrome,
    options: LaunchOptions,
}
impl ChromeEngine {
    /// Locates the browser executable up front so a missing installation
    /// fails at startup rather than on the first render.
    pub fn new(options: LaunchOptions) -> Result<Self> {
        let chrome = Chrome::discover(options.executable.as_deref())?;
        Ok(Self { chrome, options })
    }

    async fn run(&self, job: &RenderJob, save_to: Option<&Path>) -> Result<Vec<u8>> {
        let session = BrowserSession::launch(self.chrome.path(), &self.options).await?;
        drive(session, job, save_to, self.options.navigation_timeout).await
    }
}

#[async_trait]
impl RenderEngine for ChromeEngine {
    #[instrument(skip_all, fields(url = %job.url))]
    async fn render(&self, job: &RenderJob) -> Result<Vec<u8>> {
        self.run(job, None).await
    }

    #[instrument(skip_all, fields(url = %job.url, save_to = %save_to.display()))]
    async fn render_to(&self, job: &RenderJob, save_to: &Path) -> Result<u64> {
        Ok(self.run(job, Some(save_to)).await?.len() as u64)
    }
}
