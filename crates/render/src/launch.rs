use std::path::PathBuf;
use std::time::Duration;

/// Flags every browser is started with: containers rarely allow the sandbox,
/// and staged snapshots are often served from hosts with self-signed certs.
const BASELINE_FLAGS: [&str; 3] = ["--no-sandbox", "--disable-setuid-sandbox", "--ignore-certificate-errors"];
const PROXY_ENV: [&str; 2] = ["HTTPS_PROXY", "https_proxy"];

/// How browser processes are started.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub executable: Option<PathBuf>,
    /// Appended after the baseline flags.
    pub extra_args: Vec<String>,
    pub proxy: Option<String>,
    /// Upper bound for reaching network idle, and for each DevTools command.
    pub navigation_timeout: Duration,
}
impl Default for LaunchOptions {
    fn default() -> Self {
        Self { executable: None, extra_args: Vec::new(), proxy: None, navigation_timeout: Duration::from_secs(30) }
    }
}
impl LaunchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executable(mut self, executable: impl Into<Option<PathBuf>>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<Option<String>>) -> Self {
        self.proxy = proxy.into();
        self
    }

    /// Uses the `HTTPS_PROXY` environment variable when no proxy was set explicitly.
    pub fn with_proxy_from_env(self) -> Self {
        if self.proxy.is_some() {
            return self;
        }
        let proxy = PROXY_ENV.iter().find_map(|key| std::env::var(key).ok()).filter(|p| !p.trim().is_empty());
        self.with_proxy(proxy)
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Full command-line flag list passed to the browser.
    pub fn flags(&self) -> Vec<String> {
        let mut flags: Vec<String> = BASELINE_FLAGS.iter().map(|f| f.to_string()).collect();
        if let Some(proxy) = &self.proxy {
            flags.push(format!("--proxy-server={}", proxy.trim()));
        }
        flags.extend(self.extra_args.iter().cloned());
        flags
    }
}
