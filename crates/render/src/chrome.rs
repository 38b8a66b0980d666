use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};

/// Executable names searched for in `PATH`, in order of preference.
const EXECUTABLES: [&str; 4] = ["chromium-browser", "chromium", "google-chrome", "chrome"];
/// Install locations checked when nothing is found in `PATH`.
const WELL_KNOWN: [&str; 3] = [
    "/usr/bin/chromium-browser",
    "/usr/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
];

/// A Chrome/Chromium executable.
#[derive(Debug, Clone)]
pub(crate) struct Chrome {
    path: PathBuf,
}
impl Chrome {
    /// Uses `explicit` when given, otherwise searches the system.
    pub(crate) fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::ExecutableMissing(path.display().to_string()));
            }
            return Ok(Self { path: path.to_path_buf() });
        }
        for exe in EXECUTABLES {
            if let Ok(path) = which::which(exe) {
                tracing::debug!(path = %path.display(), "Discovered Chrome executable in PATH");
                return Ok(Self { path });
            }
        }
        tracing::info!("Chrome executable not found in PATH; checking well-known install locations");
        for candidate in WELL_KNOWN.iter().map(Path::new) {
            if candidate.is_file() {
                return Ok(Self { path: candidate.to_path_buf() });
            }
        }
        exn::bail!(ErrorKind::ChromeNotFound);
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_must_exist() {
        let err = Chrome::discover(Some(Path::new("/definitely/not/a/chrome"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ExecutableMissing(_)));
    }

    #[test]
    fn test_explicit_path_wins() {
        let fake = tempfile::NamedTempFile::new().unwrap();
        let chrome = Chrome::discover(Some(fake.path())).unwrap();
        assert_eq!(chrome.path(), fake.path());
    }

    #[test]
    fn test_explicit_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Chrome::discover(Some(dir.path())).is_err());
    }
}
