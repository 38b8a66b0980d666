//! Stylesheets embedded into the binary at compile time using
//! [`rust-embed`](rust_embed).

use rust_embed::Embed;
use std::borrow::Cow;

pub(crate) const PRINT_STYLESHEET: &str = "print.css";

#[derive(Embed)]
#[folder = "../../assets/print/"]
pub(crate) struct Builtins;

impl Builtins {
    /// Contents of the builtin stylesheet `name`, if embedded.
    pub(crate) fn css(name: &str) -> Option<Cow<'static, str>> {
        let file = Self::get(name)?;
        Some(match file.data {
            Cow::Borrowed(bytes) => String::from_utf8_lossy(bytes),
            Cow::Owned(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
        })
    }
}
