//! Pipeline Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors from the render and storage
//! crates are re-raised under a pipeline kind, keeping their frames as
//! children in the tree.

use derive_more::{Display, Error};
use pressroom_render::error::{Error as RenderError, ErrorKind as RenderErrorKind};
use pressroom_storage::error::Error as StorageError;

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The named page or view does not exist.
    #[display("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },
    /// The host failed while executing a page or view.
    #[display("host could not run {_0}")]
    Host(#[error(not(source))] String),
    /// No element matched the screenshot selector.
    #[display("no element matches selector `{_0}`")]
    SelectorNotFound(#[error(not(source))] String),
    /// The staged resource (or literal URL) never finished loading.
    #[display("navigation failed: {_0}")]
    Navigation(#[error(not(source))] String),
    /// Staging, allocating or recording a file failed.
    #[display("storage failure")]
    Storage,
    /// The browser could not be found or started.
    #[display("browser launch failed")]
    Launch,
    /// The browser loaded the page but could not produce output.
    #[display("capture failed")]
    Capture,
    /// The filename template is invalid or references missing fields.
    #[display("invalid filename template: {_0}")]
    Template(#[error(not(source))] String),
    #[display("invalid URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// A configuration update was rejected.
    #[display("invalid configuration")]
    Config,
    /// The request combines options that cannot be honoured.
    #[display("invalid request: {_0}")]
    InvalidRequest(#[error(not(source))] String),
}

impl ErrorKind {
    /// Convert a render error into a pipeline error, preserving the render
    /// crate's frame as a child in the error tree.
    #[track_caller]
    pub fn render(err: RenderError) -> Error {
        let kind = match &*err {
            RenderErrorKind::SelectorNotFound(selector) => Self::SelectorNotFound(selector.clone()),
            RenderErrorKind::Navigation { url, reason } => Self::Navigation(format!("{url}: {reason}")),
            RenderErrorKind::ChromeNotFound | RenderErrorKind::ExecutableMissing(_) | RenderErrorKind::Launch(_) => {
                Self::Launch
            },
            RenderErrorKind::Cookie | RenderErrorKind::Capture | RenderErrorKind::Io => Self::Capture,
        };
        err.raise(kind)
    }

    #[track_caller]
    pub fn storage(err: StorageError) -> Error {
        err.raise(Self::Storage)
    }

    /// Returns `true` if retrying might succeed.
    ///
    /// Renders are never retried: a failed navigation or capture is reported
    /// to the caller as is.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Message for the caller: the top-level kind, followed by the innermost
/// cause when it adds something.
pub fn describe(err: &Error) -> String {
    let top = err.frame().error().to_string();
    let mut frame = err.frame();
    while let Some(child) = frame.children().first() {
        frame = child;
    }
    let cause = frame.error().to_string();
    if top.contains(&cause) { top } else { format!("{top}: {cause}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;
    use pressroom_storage::error::ErrorKind as StorageErrorKind;

    #[test]
    fn test_render_kinds_map_to_pipeline_kinds() {
        let err = ErrorKind::render(RenderError::from(RenderErrorKind::SelectorNotFound("#chart".into())));
        assert!(matches!(&*err, ErrorKind::SelectorNotFound(s) if s == "#chart"));

        let err = ErrorKind::render(RenderError::from(RenderErrorKind::Navigation {
            url: "https://host/files/serve/x.html".into(),
            reason: "net::ERR_CONNECTION_REFUSED".into(),
        }));
        assert!(matches!(&*err, ErrorKind::Navigation(m) if m.contains("ERR_CONNECTION_REFUSED")));

        let err = ErrorKind::render(RenderError::from(RenderErrorKind::ChromeNotFound));
        assert!(matches!(&*err, ErrorKind::Launch));
    }

    #[test]
    fn test_display_names_missing_entity() {
        let kind = ErrorKind::NotFound { kind: "page", name: "invoice".to_string() };
        assert_eq!(kind.to_string(), "page not found: invoice");
    }

    #[test]
    fn test_describe_appends_innermost_cause() {
        let err = Err::<(), _>(std::io::Error::other("disk full")).or_raise(|| StorageErrorKind::Metadata).unwrap_err();
        assert_eq!(describe(&ErrorKind::storage(err)), "storage failure: disk full");
    }

    #[test]
    fn test_describe_without_children_is_kind() {
        let err = Error::from(ErrorKind::NotFound { kind: "view", name: "totals".to_string() });
        assert_eq!(describe(&err), "view not found: totals");
    }

    #[test]
    fn test_describe_skips_repeated_cause() {
        let err = ErrorKind::render(RenderError::from(RenderErrorKind::SelectorNotFound("#chart".into())));
        assert_eq!(describe(&err), "no element matches selector `#chart`");
    }
}
