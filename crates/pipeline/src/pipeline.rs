use crate::compose::{Composer, Fragments};
use crate::deliver::Delivery;
use crate::error::{self, ErrorKind, Result};
use crate::host::{HostContext, HostModel, Rendered, RequestContext};
use crate::layout::{Layout, PrintLayout};
use crate::options::RenderOptions;
use crate::resolve::{ContentResolver, Resolved};
use crate::result::RenderResult;
use crate::source::{ContentSource, FragmentSource};
use crate::state::StateMapping;
use exn::ResultExt;
use pressroom_config::Config;
use pressroom_render::{ChromeEngine, EngineHandle, LaunchOptions, RenderJob, SessionCookie};
use pressroom_storage::{LocalFileStore, StagedResource, Stager, StoreHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::instrument;
use url::Url;

/// One render, as the host hands it over.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub source: ContentSource,
    /// Already-evaluated state (workflow mode). Bypasses the source's
    /// whitelist, and the configured base URL is used instead of the referrer.
    pub explicit_state: Option<StateMapping>,
    pub options: RenderOptions,
    pub context: RequestContext,
}

impl RenderRequest {
    pub fn new(source: ContentSource, options: RenderOptions, context: RequestContext) -> Self {
        Self { source, explicit_state: None, options, context }
    }

    pub fn with_explicit_state(mut self, state: StateMapping) -> Self {
        self.explicit_state = Some(state);
        self
    }
}

/// Resolve, compose, stage, render, release, deliver.
///
/// Every request gets its own browser and its own staged file; nothing is
/// shared between concurrent runs except the configuration snapshot.
pub struct Pipeline {
    config: RwLock<HostContext>,
    model: Arc<dyn HostModel>,
    layout: Arc<dyn Layout>,
    engine: EngineHandle,
    store: StoreHandle,
}

impl Pipeline {
    pub fn new(config: Config, model: Arc<dyn HostModel>, engine: EngineHandle, store: StoreHandle) -> Self {
        Self { config: RwLock::new(Arc::new(config)), model, layout: Arc::new(PrintLayout), engine, store }
    }

    /// Wires the Chrome engine and the local file store from `config`.
    pub fn from_config(config: Config, model: Arc<dyn HostModel>) -> Result<Self> {
        let browser = &config.browser;
        let launch = LaunchOptions::new()
            .with_executable(browser.executable.clone())
            .with_args(browser.args.iter().cloned())
            .with_proxy(browser.proxy.clone())
            .with_proxy_from_env()
            .with_navigation_timeout(Duration::from_secs(browser.navigation_timeout_secs));
        let engine = ChromeEngine::new(launch).map_err(ErrorKind::render)?;
        let store =
            LocalFileStore::new(&config.host.files_root, config.host.serve_route.clone()).map_err(ErrorKind::storage)?;
        Ok(Self::new(config, model, Arc::new(engine), Arc::new(store)))
    }

    pub fn with_layout(mut self, layout: Arc<dyn Layout>) -> Self {
        self.layout = layout;
        self
    }

    /// Current configuration snapshot.
    pub async fn config(&self) -> HostContext {
        self.config.read().await.clone()
    }

    /// Replaces the configuration for requests that start after this call.
    ///
    /// Browser settings and the file store root are bound when the pipeline
    /// is built and aren't affected.
    pub async fn update_config(&self, config: Config) -> Result<()> {
        config.validate().or_raise(|| ErrorKind::Config)?;
        *self.config.write().await = Arc::new(config);
        tracing::info!("Configuration updated");
        Ok(())
    }

    /// Runs a render, reporting any failure as [`RenderResult::Error`].
    pub async fn run(&self, request: RenderRequest) -> RenderResult {
        match self.try_run(request).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(error = ?err, "Render failed");
                RenderResult::error(error::describe(&err))
            },
        }
    }

    #[instrument(skip_all, fields(source = ?request.source, format = ?request.options.format))]
    pub async fn try_run(&self, request: RenderRequest) -> Result<RenderResult> {
        let host = self.config().await;
        let RenderRequest { source, explicit_state, options, context } = request;
        let (state, base) = match explicit_state {
            Some(state) => (state, base_url(&host)?),
            None => {
                let state = StateMapping::from_whitelist(
                    source.state_vars(),
                    context.referrer.as_ref(),
                    context.row.as_ref(),
                );
                let base = context.referrer.as_ref().and_then(origin).map_or_else(|| base_url(&host), Ok)?;
                (state, base)
            },
        };

        let resolver = ContentResolver::new(self.model.as_ref());
        let delivery = Delivery::new(self.engine.as_ref(), self.store.as_ref(), options.format);
        let target = match resolver.resolve(&source, &state, &context).await? {
            Resolved::Hosted(rendered) => {
                let fragments = self.fragments(&resolver, &host, &options, &state, &context).await?;
                let composer = Composer::new(&host, self.layout.as_ref());
                let html = composer.compose(&rendered, &fragments, &context, false);
                let stager = Stager::new(self.store.staging_dir(), self.store.serve_route());
                let staged = stager.stage(&html, &base).map_err(ErrorKind::storage)?;
                Target {
                    url: staged.url().clone(),
                    cookies: session_cookies(&host, &context, &base),
                    default_name: rendered.name,
                    min_role: rendered.min_role,
                    staged: Some(staged),
                }
            },
            Resolved::External(url) => Target {
                default_name: external_name(&url),
                url,
                cookies: Vec::new(),
                min_role: host.host.public_role,
                staged: None,
            },
        };
        // Fragments only exist for staged content.
        let options =
            if target.staged.is_some() { options } else { RenderOptions { header: None, footer: None, ..options } };

        let Target { staged, url, cookies, default_name, min_role } = target;
        let job = RenderJob { url, capture: options.capture(&host.layout), cookies };
        let prepared = delivery.prepare(&options.target, &default_name, min_role, &context).await;
        let outcome = match prepared {
            Ok(destination) => match delivery.render(&job, &destination).await {
                Ok(output) => Ok((output, destination)),
                Err(err) => {
                    delivery.abandon(destination).await;
                    Err(err)
                },
            },
            Err(err) => Err(err),
        };
        if let Some(staged) = staged
            && let Err(err) = staged.release()
        {
            tracing::warn!(error = ?err, "Could not remove staged snapshot");
        }
        let (output, destination) = outcome?;
        delivery.deliver(output, destination, context.user.as_ref().map(|u| u.id)).await
    }

    /// Resolves header and footer fragments with the body's state. Raster
    /// formats have no pages, so they get none.
    async fn fragments(
        &self,
        resolver: &ContentResolver<'_>,
        host: &Config,
        options: &RenderOptions,
        state: &StateMapping,
        context: &RequestContext,
    ) -> Result<Fragments> {
        let (header, footer) = options.fragments();
        let mut fragments = Fragments {
            header_height_cm: options.header_height_cm,
            footer_height_cm: options.footer_height_cm,
            ..Default::default()
        };
        let composer = Composer::new(host, self.layout.as_ref());
        for (source, slot) in [(header, &mut fragments.header), (footer, &mut fragments.footer)] {
            let Some(source) = source else { continue };
            let rendered = self.fragment(resolver, source, state, context).await?;
            *slot = Some(composer.compose(&rendered, &Fragments::default(), context, true));
        }
        Ok(fragments)
    }

    async fn fragment(
        &self,
        resolver: &ContentResolver<'_>,
        source: &FragmentSource,
        state: &StateMapping,
        context: &RequestContext,
    ) -> Result<Rendered> {
        match resolver.resolve(&source.content_source(), state, context).await? {
            Resolved::Hosted(rendered) => Ok(rendered),
            Resolved::External(url) => exn::bail!(ErrorKind::InvalidRequest(format!("fragment from URL {url}"))),
        }
    }
}

/// What the browser is pointed at for one request.
struct Target {
    /// The composed snapshot; `None` for literal URLs.
    staged: Option<StagedResource>,
    url: Url,
    cookies: Vec<SessionCookie>,
    default_name: String,
    min_role: u32,
}

fn base_url(host: &Config) -> Result<Url> {
    Url::parse(&host.host.base_url).or_raise(|| ErrorKind::InvalidUrl(host.host.base_url.clone()))
}

/// Origin of `url`, or `None` when it has no tuple origin (`file:`, `data:`).
fn origin(url: &Url) -> Option<Url> {
    let origin = url.origin();
    if !origin.is_tuple() {
        return None;
    }
    Url::parse(&origin.ascii_serialization()).ok()
}

/// Forwards the caller's session cookie to the staged snapshot's origin, so
/// routes the snapshot loads render with the caller's privileges.
fn session_cookies(host: &Config, context: &RequestContext, base: &Url) -> Vec<SessionCookie> {
    let policy = &host.host.session_cookie;
    if !policy.forward {
        return Vec::new();
    }
    context
        .cookie(&policy.name)
        .map(|value| SessionCookie {
            name: policy.name.clone(),
            value: value.to_string(),
            url: Some(base.to_string()),
            domain: None,
        })
        .into_iter()
        .collect()
}

/// Default file name for a literal URL: its last path segment, else its host.
fn external_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(|s| s.rsplit_once('.').map_or(s, |(stem, _)| stem))
        .or_else(|| url.host_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document")
        .to_string()
}
