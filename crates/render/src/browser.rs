//! One browser process per render.
//!
//! The sequence is strictly linear and never retried:
//! launch → open tab → install cookies → navigate and wait for network idle
//! → capture → close. [`BrowserSession::close`] is called by the engine on
//! every path; if the owning future is dropped instead, `Drop` still stops the
//! event loop and chromiumoxide kills the child process with the `Browser`.

use crate::engine::Session;
use crate::error::{ErrorKind, Result};
use crate::launch::LaunchOptions;
use crate::options::{BLANK_TEMPLATE, Capture, DocumentOptions, ImageOptions, RenderJob, SessionCookie};
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, NavigateParams, PrintToPdfParams, SetLifecycleEventsEnabledParams, Viewport,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::layout::BoundingBox;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};

/// Lifecycle event Chrome fires once no network connections remain for 500ms.
const NETWORK_IDLE: &str = "networkIdle";

pub(crate) struct BrowserSession {
    browser: Browser,
    events: JoinHandle<()>,
    // Held so the profile directory lives exactly as long as the process.
    _profile: TempDir,
}

impl BrowserSession {
    pub(crate) async fn launch(executable: &Path, options: &LaunchOptions) -> Result<Self> {
        let profile = tempfile::Builder::new().prefix("pressroom-chrome-").tempdir().or_raise(|| ErrorKind::Io)?;
        let config = BrowserConfig::builder()
            .chrome_executable(executable)
            .user_data_dir(profile.path())
            .request_timeout(options.navigation_timeout)
            .args(options.flags())
            .build()
            .map_err(ErrorKind::Launch)?;
        let (browser, mut handler) =
            Browser::launch(config).await.or_raise(|| ErrorKind::Launch(executable.display().to_string()))?;
        // The handler drives the DevTools connection; nothing happens unless it's polled.
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(error) = event {
                    tracing::trace!(%error, "DevTools handler reported an error");
                }
            }
        });
        tracing::debug!(executable = %executable.display(), "Browser launched");
        Ok(Self { browser, events, _profile: profile })
    }
}

impl Session for BrowserSession {
    async fn capture(&self, job: &RenderJob, save_to: Option<&Path>, limit: Duration) -> Result<Vec<u8>> {
        let page = self.browser.new_page("about:blank").await.or_raise(|| ErrorKind::Launch("new tab".into()))?;
        if !job.cookies.is_empty() {
            let cookies = job.cookies.iter().map(cookie_param).collect::<Vec<_>>();
            page.set_cookies(cookies).await.or_raise(|| ErrorKind::Cookie)?;
            tracing::debug!(count = job.cookies.len(), "Session cookies installed");
        }
        navigate(&page, job, limit).await?;
        match &job.capture {
            Capture::Image(options) => screenshot(&page, options, save_to).await,
            Capture::Document(options) => export(&page, options, save_to).await,
        }
    }

    async fn close(mut self) {
        if let Err(error) = self.browser.close().await {
            tracing::warn!(%error, "Browser did not acknowledge close");
        }
        if let Err(error) = self.browser.wait().await {
            tracing::warn!(%error, "Browser process did not exit cleanly");
        }
        tracing::debug!("Browser closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.events.abort();
    }
}

fn cookie_param(cookie: &SessionCookie) -> CookieParam {
    let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
    param.url = cookie.url.clone();
    param.domain = cookie.domain.clone();
    param
}

/// Navigates and waits until the new document's network goes idle, so
/// client-side rendering and async fetches have finished before capture.
async fn navigate(page: &Page, job: &RenderJob, limit: Duration) -> Result<()> {
    let url = job.url.as_str();
    let failed = |reason: &str| ErrorKind::Navigation { url: url.to_string(), reason: reason.to_string() };
    let deadline = Instant::now() + limit;

    let lifecycle = page.event_listener::<EventLifecycleEvent>().await.or_raise(|| failed("listener"))?;
    page.execute(SetLifecycleEventsEnabledParams::new(true)).await.or_raise(|| failed("lifecycle events"))?;
    let navigation = timeout(limit, page.execute(NavigateParams::new(url)))
        .await
        .map_err(|_| failed("timed out"))?
        .or_raise(|| failed("request"))?;
    if let Some(text) = navigation.result.error_text.as_deref() {
        exn::bail!(failed(text));
    }
    let loader = navigation.result.loader_id.clone();

    let events = lifecycle.map(|event| (event.loader_id.clone(), event.name.clone()));
    if let Err(reason) = network_idle(events, loader.as_ref(), deadline).await {
        exn::bail!(failed(reason));
    }
    tracing::debug!(url, "Network idle");
    Ok(())
}

/// Waits for `networkIdle` from `loader`, or from any loader when it isn't
/// known. Events are `(loader, name)` pairs.
pub(crate) async fn network_idle<L, S>(
    events: S,
    loader: Option<&L>,
    deadline: Instant,
) -> std::result::Result<(), &'static str>
where
    L: PartialEq,
    S: Stream<Item = (L, String)>,
{
    let mut events = std::pin::pin!(events);
    let idle = async {
        while let Some((id, name)) = events.next().await {
            if loader.is_none_or(|current| *current == id) && name == NETWORK_IDLE {
                return true;
            }
        }
        false
    };
    match tokio::time::timeout_at(deadline, idle).await {
        Ok(true) => Ok(()),
        Ok(false) => Err("page closed before network idle"),
        Err(_) => Err("timed out waiting for network idle"),
    }
}

async fn screenshot(page: &Page, options: &ImageOptions, save_to: Option<&Path>) -> Result<Vec<u8>> {
    let element = page
        .find_element(options.selector.as_str())
        .await
        .map_err(|_| ErrorKind::SelectorNotFound(options.selector.clone()))?;
    element.scroll_into_view().await.or_raise(|| ErrorKind::Capture)?;
    let bounds = element.bounding_box().await.or_raise(|| ErrorKind::Capture)?;
    let scrolled = page.layout_metrics().await.or_raise(|| ErrorKind::Capture)?.css_layout_viewport;
    let params = ScreenshotParams::builder()
        .format(options.format.cdp())
        .clip(element_clip(&bounds, (scrolled.page_x as f64, scrolled.page_y as f64)))
        .capture_beyond_viewport(true)
        .omit_background(options.omit_background)
        .build();
    let bytes = match save_to {
        Some(path) => page.save_screenshot(params, path).await,
        None => page.screenshot(params).await,
    }
    .or_raise(|| ErrorKind::Capture)?;
    tracing::debug!(selector = %options.selector, bytes = bytes.len(), "Element captured");
    Ok(bytes)
}

/// Clip in page coordinates for an element box measured against a viewport
/// scrolled to `scroll`.
pub(crate) fn element_clip(bounds: &BoundingBox, scroll: (f64, f64)) -> Viewport {
    Viewport { x: bounds.x + scroll.0, y: bounds.y + scroll.1, width: bounds.width, height: bounds.height, scale: 1.0 }
}

async fn export(page: &Page, options: &DocumentOptions, save_to: Option<&Path>) -> Result<Vec<u8>> {
    let params = pdf_params(options);
    let bytes = match save_to {
        Some(path) => page.save_pdf(params, path).await,
        None => page.pdf(params).await,
    }
    .or_raise(|| ErrorKind::Capture)?;
    tracing::debug!(bytes = bytes.len(), "Document exported");
    Ok(bytes)
}

pub(crate) fn pdf_params(options: &DocumentOptions) -> PrintToPdfParams {
    let (width, height) = options.paper.size_inches();
    let (top, right, bottom, left) = options.margins.inches();
    let mut params = PrintToPdfParams {
        landscape: Some(options.landscape),
        scale: Some(options.scale),
        paper_width: Some(width),
        paper_height: Some(height),
        margin_top: Some(top),
        margin_right: Some(right),
        margin_bottom: Some(bottom),
        margin_left: Some(left),
        ..Default::default()
    };
    if let Some(chrome) = &options.page_chrome {
        params.display_header_footer = Some(true);
        params.header_template = Some(BLANK_TEMPLATE.to_string());
        params.footer_template = Some(chrome.footer_template.clone().unwrap_or_else(|| BLANK_TEMPLATE.to_string()));
    }
    params
}
