//! Path validation.
//!
//! Artifact names are built from catalog data (`<filename>_<language>.zip`),
//! so they are treated as untrusted and must never resolve outside the folder
//! a backend is rooted at.

use std::path::{Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a storage path: it must be a single, plain file name directly
/// inside the backend's folder.
///
/// Rejected: empty names, `.` and `..`, anything with a `/` or `\` separator
/// (so no nested, absolute or traversing paths), and null bytes.
///
/// # Returns
/// Returns the name as a path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid.
///
/// # Examples
///
/// ```
/// use tfx_storage::validate_path;
/// assert!(validate_path("joomla-core_de-DE.zip").is_ok());
/// assert!(validate_path("errors/joomla-core_de-DE.zip").is_err());
/// assert!(validate_path("../joomla-core_de-DE.zip").is_err());
/// assert!(validate_path("a\0b.zip").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let bytes = path.as_os_str().as_encoded_bytes();
    // `file_name()` is `None` for `.`, `..` and the empty path, and differs
    // from the whole path as soon as there's a separator or a `.` prefix.
    let plain = path.file_name().is_some_and(|name| name == path.as_os_str());
    // Null bytes truncate in C-based syscalls; backslashes separate on Windows.
    if !plain || bytes.iter().any(|b| matches!(b, b'\0' | b'\\')) {
        exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
    }
    Ok(path.to_path_buf())
}
