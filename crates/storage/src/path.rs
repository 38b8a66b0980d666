//! File name validation.
//!
//! Output file names come from user-editable templates interpolated against
//! row data, so they are treated as hostile until proven to be a single plain
//! path segment.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Validates a suggested file name, returning it trimmed.
///
/// The name must consist of exactly one normal path component: no directory
/// separators, no `.`/`..`, no null bytes.
///
/// # Examples
///
/// ```
/// use pressroom_storage::validate_filename;
/// assert_eq!(validate_filename(" report-42.pdf ").unwrap(), "report-42.pdf");
/// assert!(validate_filename("../etc/passwd").is_err());
/// assert!(validate_filename("invoices/7.pdf").is_err());
/// assert!(validate_filename("").is_err());
/// ```
pub fn validate_filename(name: impl AsRef<str>) -> Result<String> {
    let name = name.as_ref().trim();
    // Null bytes pass through Path::components() on Unix but cause
    // truncation in C-based syscalls, reject them explicitly.
    if name.contains('\0') || name.contains('\\') {
        exn::bail!(ErrorKind::InvalidFilename(name.to_string()));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(segment)), None) if segment == name => Ok(name.to_string()),
        _ => exn::bail!(ErrorKind::InvalidFilename(name.to_string())),
    }
}

/// Returns `path` relative to `root`, with `/` separators, if `path` lives
/// underneath `root`.
pub(crate) fn relative_to(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| ErrorKind::InvalidPath(path.to_path_buf()))?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(s) => segments.push(
                s.to_str().ok_or_else(|| ErrorKind::InvalidPath(path.to_path_buf()))?.to_string(),
            ),
            _ => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
        }
    }
    if segments.is_empty() {
        exn::bail!(ErrorKind::InvalidPath(PathBuf::from(path)));
    }
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("report.pdf", "report.pdf")]
    #[case("  spaced.png\t", "spaced.png")]
    #[case("invoice #7 (final).pdf", "invoice #7 (final).pdf")]
    fn test_valid_filenames(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate_filename(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case(".")]
    #[case("..")]
    #[case("a/b.pdf")]
    #[case("/abs.pdf")]
    #[case("a\\b.pdf")]
    #[case("nul\0.pdf")]
    fn test_invalid_filenames(#[case] input: &str) {
        let err = validate_filename(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidFilename(_)));
    }

    #[test]
    fn test_relative_to_root() {
        let root = Path::new("/srv/files");
        assert_eq!(relative_to(root, Path::new("/srv/files/doc-1/a.pdf")).unwrap(), "doc-1/a.pdf");
        assert!(relative_to(root, Path::new("/srv/other/a.pdf")).is_err());
        assert!(relative_to(root, root).is_err());
    }
}
