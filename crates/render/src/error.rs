//! Render Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A render error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("chrome/chromium not detected on your system")]
    ChromeNotFound,
    /// The configured executable path does not point at a file.
    #[display("configured chrome executable does not exist: {_0}")]
    ExecutableMissing(#[error(not(source))] String),
    /// The browser process could not be started or its first tab opened.
    #[display("could not launch browser: {_0}")]
    Launch(#[error(not(source))] String),
    /// Session cookies were rejected by the browser.
    Cookie,
    /// The target never reached network idle: unreachable, TLS/proxy
    /// failure, navigation error or timeout.
    #[display("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    /// No element matched the screenshot selector.
    #[display("no element matches selector `{_0}`")]
    SelectorNotFound(#[error(not(source))] String),
    /// The PDF export or screenshot command failed.
    Capture,
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
