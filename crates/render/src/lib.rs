mod browser;
mod chrome;
mod engine;
pub mod error;
mod launch;
#[cfg(feature = "mock")]
pub mod mock;
mod options;

pub use crate::engine::{ChromeEngine, RenderEngine};
pub use crate::launch::LaunchOptions;
pub use crate::options::{
    Capture, DocumentOptions, ImageFormat, ImageOptions, Margins, PAGE_NUMBER_TEMPLATE, PageChrome, PaperFormat,
    RenderJob, SessionCookie,
};
use std::sync::Arc;

pub type EngineHandle = Arc<dyn RenderEngine>;
