use crate::error::{ErrorKind, Result};
use crate::host::{HostModel, Rendered, RequestContext};
use crate::source::ContentSource;
use crate::state::StateMapping;
use exn::OptionExt;
use tracing::instrument;
use url::Url;

/// Outcome of resolving a [`ContentSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// Output of a host page or view, still to be composed and staged.
    Hosted(Rendered),
    /// A URL to load as is.
    External(Url),
}

/// Turns content sources into page output using the host's read-only runs.
pub struct ContentResolver<'a> {
    model: &'a dyn HostModel,
}

impl<'a> ContentResolver<'a> {
    pub fn new(model: &'a dyn HostModel) -> Self {
        Self { model }
    }

    #[instrument(skip_all, fields(source = ?source))]
    pub async fn resolve(
        &self,
        source: &ContentSource,
        state: &StateMapping,
        request: &RequestContext,
    ) -> Result<Resolved> {
        let rendered = match source {
            ContentSource::Url { literal } => return Ok(Resolved::External(literal.clone())),
            ContentSource::Page { name, .. } => self
                .model
                .run_page(name, state, request)
                .await?
                .ok_or_raise(|| ErrorKind::NotFound { kind: "page", name: name.clone() })?,
            ContentSource::View { name } => {
                let state = Self::with_row_key(state, request);
                self.model
                    .run_view(name, &state, request)
                    .await?
                    .ok_or_raise(|| ErrorKind::NotFound { kind: "view", name: name.clone() })?
            },
        };
        tracing::debug!(name = %rendered.name, min_role = rendered.min_role, "Content resolved");
        Ok(Resolved::Hosted(rendered))
    }

    /// Passes the triggering row's primary key to the view, when both the row
    /// and its table are known.
    fn with_row_key(state: &StateMapping, request: &RequestContext) -> StateMapping {
        let mut state = state.clone();
        if let (Some(row), Some(table)) = (&request.row, &request.table)
            && let Some(value) = row.get(&table.pk)
        {
            state.insert(table.pk.clone(), value.clone());
        }
        state
    }
}
