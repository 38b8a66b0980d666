use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use url::Url;

/// What to print.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentSource {
    /// A host page, run with the whitelisted `state_vars` taken from the
    /// referrer's query string and the triggering row.
    Page { name: String, state_vars: BTreeSet<String> },
    /// A host view. The triggering row and its table come from the
    /// request context; the row's primary key is passed to the view.
    View { name: String },
    /// An already-served URL, loaded directly without staging.
    Url { literal: Url },
}

impl ContentSource {
    pub fn page(name: impl Into<String>, state_vars: impl AsRef<str>) -> Self {
        Self::Page { name: name.into(), state_vars: parse_state_vars(state_vars.as_ref()) }
    }

    pub fn view(name: impl Into<String>) -> Self {
        Self::View { name: name.into() }
    }

    pub fn url(literal: impl AsRef<str>) -> crate::error::Result<Self> {
        let literal = literal.as_ref();
        let url = Url::parse(literal).or_raise(|| ErrorKind::InvalidUrl(literal.to_string()))?;
        Ok(Self::Url { literal: url })
    }

    /// Variable names that may be copied into the page state.
    pub fn state_vars(&self) -> impl Iterator<Item = &str> {
        let vars = match self {
            Self::Page { state_vars, .. } => Some(state_vars.iter().map(String::as_str)),
            Self::View { .. } | Self::Url { .. } => None,
        };
        vars.into_iter().flatten()
    }
}

/// Splits a comma-separated list of state variable names, ignoring blanks.
pub fn parse_state_vars(list: &str) -> BTreeSet<String> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// A header or footer, written `Page:<name>` or `View:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FragmentSource {
    Page(String),
    View(String),
}

impl FragmentSource {
    /// Fragments are run with the body's state, so pages carry no whitelist.
    pub(crate) fn content_source(&self) -> ContentSource {
        match self {
            Self::Page(name) => ContentSource::Page { name: name.clone(), state_vars: BTreeSet::new() },
            Self::View(name) => ContentSource::View { name: name.clone() },
        }
    }

    fn parse_descriptor(s: &str) -> Result<Self, ErrorKind> {
        let invalid = || ErrorKind::InvalidRequest(format!("fragment source `{s}`"));
        let (kind, name) = s.split_once(':').ok_or_else(invalid)?;
        let name = name.trim();
        match kind.trim() {
            _ if name.is_empty() => Err(invalid()),
            "Page" => Ok(Self::Page(name.to_string())),
            "View" => Ok(Self::View(name.to_string())),
            _ => Err(invalid()),
        }
    }
}

impl FromStr for FragmentSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_descriptor(s)?)
    }
}

// Serde needs a plain `Display` error, hence `ErrorKind` rather than `Error`.
impl TryFrom<String> for FragmentSource {
    type Error = ErrorKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_descriptor(&value)
    }
}

impl Display for FragmentSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Page(name) => write!(f, "Page:{name}"),
            Self::View(name) => write!(f, "View:{name}"),
        }
    }
}

impl From<FragmentSource> for String {
    fn from(value: FragmentSource) -> Self {
        value.to_string()
    }
}
