//! The slice of the host application the pipeline talks to.

use crate::error::Result;
use crate::state::StateMapping;
use async_trait::async_trait;
use pressroom_config::Config;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// Host configuration as seen by one request. Taken once at the start of a
/// render so a concurrent update never changes settings halfway through.
pub type HostContext = Arc<Config>;

/// A data row, keyed by field name.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    /// Name of the primary key field.
    pub pk: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub role_id: u32,
    pub language: Option<String>,
}

/// Who asked for the render, and from where.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user: Option<User>,
    /// Falls back to the user's language, then `en`.
    pub locale: Option<String>,
    pub csrf_token: String,
    /// Cookies sent with the inbound request.
    pub cookies: BTreeMap<String, String>,
    /// Page the action was triggered from.
    pub referrer: Option<Url>,
    /// Row the action was triggered on, with its owning table.
    pub row: Option<Row>,
    pub table: Option<Table>,
}

impl RequestContext {
    pub fn locale(&self) -> &str {
        self.locale
            .as_deref()
            .or_else(|| self.user.as_ref().and_then(|u| u.language.as_deref()))
            .unwrap_or("en")
    }

    /// Role of the acting user; anonymous requests get `public_role`.
    pub fn role(&self, public_role: u32) -> u32 {
        self.user.as_ref().map_or(public_role, |u| u.role_id)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }
}

/// Output of a page or view run.
#[derive(Debug, Clone, PartialEq)]
pub enum Contents {
    /// Finished markup, used as is.
    Markup(String),
    /// Body blocks still to be laid out by the host theme.
    Blocks(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub contents: Contents,
    pub title: String,
    /// Page or view name, used as the default file name.
    pub name: String,
    /// Minimum role needed to read the source, inherited by stored documents.
    pub min_role: u32,
}

/// Read-only access to the host's pages and views.
///
/// `Ok(None)` means no page or view has that name.
#[async_trait]
pub trait HostModel: Send + Sync {
    async fn run_page(&self, name: &str, state: &StateMapping, request: &RequestContext) -> Result<Option<Rendered>>;

    async fn run_view(&self, name: &str, state: &StateMapping, request: &RequestContext) -> Result<Option<Rendered>>;
}
