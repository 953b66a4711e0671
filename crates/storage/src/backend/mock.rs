//! In-memory storage backend for testing.

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::models::FileInfo;
use crate::path::validate as validate_path;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Files are stored in a `HashMap` behind a [`RwLock`] along with their
/// last-modified time, which tests can set explicitly to age an artifact
/// without touching a real filesystem. Paths can also be marked as
/// unreadable, in which case they still "exist" but their metadata and
/// contents cannot be fetched.
///
/// # Examples
///
/// ```ignore
/// use tfx_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
/// use time::{Duration, UtcDateTime};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::default();
/// let modified = UtcDateTime::now() - Duration::days(10);
/// backend.insert_modified("com_content_de.zip", b"PK", modified).await;
/// assert_eq!(backend.stat(Path::new("com_content_de.zip")).await?.modified, modified);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<PathBuf, (UtcDateTime, Vec<u8>)>>,
    unreadable: RwLock<HashSet<PathBuf>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files modified "now".
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let now = UtcDateTime::now();
        let mut map = HashMap::new();
        for (path, data) in files {
            map.insert(Self::validated(path.into()), (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            unreadable: RwLock::new(HashSet::new()),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Insert (or replace) a file with an explicit last-modified time.
    pub async fn insert_modified(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>, modified: UtcDateTime) {
        let path = Self::validated(path.into());
        self.storage.write().await.insert(path, (modified, data.into()));
    }

    /// Make an existing (or future) file report as present while refusing to
    /// hand out its metadata or contents, like a file with broken permissions.
    pub async fn make_unreadable(&self, path: impl Into<PathBuf>) {
        let path = Self::validated(path.into());
        self.unreadable.write().await.insert(path);
    }

    fn validated(path: PathBuf) -> PathBuf {
        let Ok(validated) = validate_path(&path) else {
            // The panic here is DELIBERATE. MockBackend is intended to be
            // used in tests; panics are expected. There is no error result.
            panic!("MockBackend: invalid path {}", path.display());
        };
        validated
    }

    async fn check_readable(&self, path: &Path) -> Result<()> {
        if self.unreadable.read().await.contains(path) {
            exn::bail!(ErrorKind::PermissionDenied(path.to_path_buf()));
        }
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.read().await.contains_key(&path) || self.unreadable.read().await.contains(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        self.check_readable(&path).await?;
        let (_modified, data) =
            self.storage.read().await.get(&path).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))?;
        Ok(data)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.storage.write().await.insert(path, (UtcDateTime::now(), data.to_vec()));
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.unreadable.write().await.remove(&path);
        self.storage.write().await.remove(&path).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = validate_path(path)?;
        self.check_readable(&path).await?;
        let guard = self.storage.read().await;
        let (modified, data) = guard.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(FileInfo::new(path.clone(), data.len() as u64, *modified))
    }
}
