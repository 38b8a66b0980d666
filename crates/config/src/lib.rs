//! Layered configuration for pressroom.
//!
//! Values are resolved in order, later sources overriding earlier ones:
//!
//! 1. compiled defaults ([`Config::default`]),
//! 2. an optional configuration file (TOML, YAML or JSON, chosen by extension),
//! 3. environment variables prefixed with `PRESSROOM_`, using `__` to descend
//!    into nested tables (e.g. `PRESSROOM_HOST__BASE_URL`).
//!
//! The loaded [`Config`] is validated before it is handed out, so a bad base
//! URL or a negative margin fails at startup instead of halfway through a
//! render.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;
use url::Url;

pub const ENV_PREFIX: &str = "PRESSROOM_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: HostConfig,
    pub browser: BrowserConfig,
    pub layout: LayoutConfig,
}

/// Settings describing the host application the rendered pages come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Origin used when a request has no referrer (and always in workflow mode).
    pub base_url: String,
    /// Directory the host serves under [`serve_route`](Self::serve_route).
    /// Staged HTML snapshots and persisted documents both live here.
    pub files_root: PathBuf,
    pub serve_route: String,
    pub static_route: String,
    /// Cache-busting tag inserted into static asset URLs.
    pub version_tag: String,
    /// Stylesheets under the versioned static route, e.g. `app.css`.
    pub stylesheets: Vec<String>,
    /// Scripts under the versioned static route, e.g. `app.js`.
    pub scripts: Vec<String>,
    /// Raw tags contributed by host plugins, copied verbatim into `<head>`.
    pub extra_head: Vec<String>,
    /// Operator-configured CSS appended to every printed page.
    pub custom_css: String,
    /// Operator-configured HTML appended to `<head>` of every printed page.
    pub custom_html: String,
    pub session_cookie: SessionCookieConfig,
    /// Role assigned to documents whose source carries no role of its own.
    pub public_role: u32,
}
impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/".to_string(),
            files_root: std::env::temp_dir().join("pressroom-files"),
            serve_route: "/files/serve/".to_string(),
            static_route: "/static_assets/".to_string(),
            version_tag: String::new(),
            stylesheets: Vec::new(),
            scripts: Vec::new(),
            extra_head: Vec::new(),
            custom_css: String::new(),
            custom_html: String::new(),
            session_cookie: SessionCookieConfig::default(),
            public_role: 100,
        }
    }
}

/// Whether, and under which name, the caller's session cookie is handed to
/// the headless browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCookieConfig {
    pub name: String,
    pub forward: bool,
}
impl Default for SessionCookieConfig {
    fn default() -> Self {
        Self { name: "connect.sid".to_string(), forward: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Explicit Chrome/Chromium binary. Auto-detected when unset.
    pub executable: Option<PathBuf>,
    /// Extra command-line flags appended after the baseline set.
    pub args: Vec<String>,
    pub navigation_timeout_secs: u64,
    /// HTTPS proxy; falls back to `HTTPS_PROXY`/`https_proxy` when unset.
    pub proxy: Option<String>,
}
impl Default for BrowserConfig {
    fn default() -> Self {
        Self { executable: None, args: Vec::new(), navigation_timeout_secs: 30, proxy: None }
    }
}

/// Geometry defaults, all in centimetres.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub header_height_cm: f64,
    pub footer_height_cm: f64,
    pub margin_cm: f64,
}
impl Default for LayoutConfig {
    fn default() -> Self {
        Self { header_height_cm: 3.0, footer_height_cm: 3.0, margin_cm: 2.0 }
    }
}

impl Config {
    /// Default configuration file location for the current platform, if one
    /// can be determined.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "pressroom").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads configuration from defaults, an optional file and the environment.
    ///
    /// A missing file at `path` is not an error (figment treats absent files
    /// as empty sources); a file that exists but doesn't parse is.
    #[instrument(skip_all, fields(path = ?path))]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = Self::merge_file(figment, path)?;
        }
        let config: Config =
            figment.merge(Env::prefixed(ENV_PREFIX).split("__")).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(base_url = %config.host.base_url, "Configuration loaded");
        Ok(config)
    }

    fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();
        Ok(match ext.as_str() {
            "toml" => figment.merge(Toml::file(path)),
            "yaml" | "yml" => figment.merge(Yaml::file(path)),
            "json" => figment.merge(Json::file(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.display().to_string())),
        })
    }

    /// Checks value ranges that serde can't express.
    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.host.base_url)
            .or_raise(|| ErrorKind::Invalid("host.base_url", self.host.base_url.clone()))?;
        if !matches!(base.scheme(), "http" | "https") {
            exn::bail!(ErrorKind::Invalid("host.base_url", format!("unsupported scheme {}", base.scheme())));
        }
        if !self.host.serve_route.starts_with('/') {
            exn::bail!(ErrorKind::Invalid("host.serve_route", self.host.serve_route.clone()));
        }
        if self.host.session_cookie.forward && self.host.session_cookie.name.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("host.session_cookie.name", "empty".to_string()));
        }
        if self.browser.navigation_timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("browser.navigation_timeout_secs", "0".to_string()));
        }
        for (key, value) in [
            ("layout.header_height_cm", self.layout.header_height_cm),
            ("layout.footer_height_cm", self.layout.footer_height_cm),
        ] {
            if !(value.is_finite() && value > 0.0) {
                exn::bail!(ErrorKind::Invalid(key, value.to_string()));
            }
        }
        if !(self.layout.margin_cm.is_finite() && self.layout.margin_cm >= 0.0) {
            exn::bail!(ErrorKind::Invalid("layout.margin_cm", self.layout.margin_cm.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.host.session_cookie.name, "connect.sid");
        assert_eq!(config.layout.margin_cm, 2.0);
    }

    #[test]
    fn test_loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pressroom.toml");
        fs::write(
            &path,
            r#"
                [host]
                base_url = "https://intranet.example.com/"
                version_tag = "v42"

                [layout]
                footer_height_cm = 1.5
            "#,
        )
        .unwrap();
        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.host.base_url, "https://intranet.example.com/");
        assert_eq!(config.host.version_tag, "v42");
        assert_eq!(config.layout.footer_height_cm, 1.5);
        // Untouched values keep their defaults.
        assert_eq!(config.layout.header_height_cm, 3.0);
    }

    #[test]
    fn test_loads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pressroom.yaml");
        fs::write(&path, "browser:\n  args: [\"--font-render-hinting=none\"]\n").unwrap();
        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.browser.args, vec!["--font-render-hinting=none".to_string()]);
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let err = Config::load(Some(Path::new("/etc/pressroom.ini"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[rstest]
    #[case("not a url")]
    #[case("ftp://files.example.com/")]
    #[case("/relative/only")]
    fn test_rejects_bad_base_url(#[case] base_url: &str) {
        let mut config = Config::default();
        config.host.base_url = base_url.to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid("host.base_url", _)));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    fn test_rejects_bad_fragment_height(#[case] height: f64) {
        let mut config = Config::default();
        config.layout.footer_height_cm = height;
        assert!(config.validate().is_err());
    }
}
