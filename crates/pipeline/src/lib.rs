//! Print pipeline.
//!
//! A [`RenderRequest`] names some host content (a page, a view or a literal
//! URL). [`Pipeline::run`] resolves it through the [`HostModel`], composes a
//! standalone print document, stages it where the host serves files, points a
//! headless browser at it and hands the output back as a [`RenderResult`].

mod compose;
mod deliver;
pub mod error;
mod filename;
mod host;
mod layout;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod options;
mod pipeline;
mod resolve;
mod result;
mod source;
mod state;

pub use crate::compose::{Composer, Fragments};
pub use crate::deliver::{Delivery, Destination, Output};
pub use crate::filename::FilenameTemplate;
pub use crate::host::{Contents, HostContext, HostModel, Rendered, RequestContext, Row, Table, User};
pub use crate::layout::{HeadTag, Layout, PrintLayout};
pub use crate::options::{MarginOptions, OutputFormat, OutputTarget, RenderOptions};
pub use crate::pipeline::{Pipeline, RenderRequest};
pub use crate::resolve::{ContentResolver, Resolved};
pub use crate::result::{Download, RenderResult};
pub use crate::source::{ContentSource, FragmentSource, parse_state_vars};
pub use crate::state::StateMapping;
