//! Storage backend trait and implementations.
//!
//! The refresh job only ever asks a handful of questions of a folder: does
//! this artifact exist, when was it last modified, and can it be removed or
//! (for quarantine markers) written. [`StorageBackend`] is that interface;
//! [`LocalBackend`] answers it from the local filesystem and [`MockBackend`]
//! from memory for tests.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
use crate::FileInfo;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Unified interface over a single storage folder.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations should
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tfx_storage::{backend::StorageBackend, error::Result};
///
/// async fn artifact_size(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = Path::new("com_content_de-DE.zip");
///     if backend.exists(path).await? {
///         Ok(backend.stat(path).await?.size)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// Make sure the storage root exists and is usable, creating it if
    /// needed. Idempotent.
    async fn prepare(&self) -> Result<()>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, creating or overwriting the file.
    ///
    /// Implementations should create parent directories as needed.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Get file metadata (size and last-modified time) without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use tfx_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let info = backend.stat(Path::new("com_content_de-DE.zip")).await?;
    /// println!("Size: {} bytes, modified: {}", info.size, info.modified);
    /// # Ok(())
    /// # }
    /// ```
    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}
