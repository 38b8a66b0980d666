//! In-memory host model for testing.

use crate::error::{ErrorKind, Result};
use crate::host::{Contents, HostModel, Rendered, RequestContext};
use crate::state::StateMapping;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// [`HostModel`] serving fixed pages and views and recording every run as
/// `("page:<name>" | "view:<name>", state)`.
#[derive(Default)]
pub struct MockHost {
    pages: HashMap<String, Rendered>,
    views: HashMap<String, Rendered>,
    failing: Option<String>,
    runs: Mutex<Vec<(String, StateMapping)>>,
}

impl MockHost {
    pub fn with_page(mut self, name: &str, title: &str, contents: Contents, min_role: u32) -> Self {
        self.pages.insert(name.to_string(), Self::rendered(name, title, contents, min_role));
        self
    }

    pub fn with_view(mut self, name: &str, title: &str, contents: Contents, min_role: u32) -> Self {
        self.views.insert(name.to_string(), Self::rendered(name, title, contents, min_role));
        self
    }

    /// Makes runs of the page or view `name` fail inside the host.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing = Some(name.to_string());
        self
    }

    pub async fn runs(&self) -> Vec<(String, StateMapping)> {
        self.runs.lock().await.clone()
    }

    fn rendered(name: &str, title: &str, contents: Contents, min_role: u32) -> Rendered {
        Rendered { contents, title: title.to_string(), name: name.to_string(), min_role }
    }

    async fn run(&self, kind: &str, name: &str, state: &StateMapping) -> Result<Option<Rendered>> {
        self.runs.lock().await.push((format!("{kind}:{name}"), state.clone()));
        if self.failing.as_deref() == Some(name) {
            exn::bail!(ErrorKind::Host(format!("{kind} {name}")));
        }
        let found = match kind {
            "page" => self.pages.get(name),
            _ => self.views.get(name),
        };
        Ok(found.cloned())
    }
}

#[async_trait]
impl HostModel for MockHost {
    async fn run_page(&self, name: &str, state: &StateMapping, _request: &RequestContext) -> Result<Option<Rendered>> {
        self.run("page", name, state).await
    }

    async fn run_view(&self, name: &str, state: &StateMapping, _request: &RequestContext) -> Result<Option<Rendered>> {
        self.run("view", name, state).await
    }
}
