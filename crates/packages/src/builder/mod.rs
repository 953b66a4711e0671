//! The contract with whatever actually produces an archive.
//!
//! Building an archive (downloading translations, packing them) is not this
//! crate's concern; the [`Job`](crate::Job) hands the selected project and
//! language to a [`PackageBuilder`] together with [`BuildOptions`] and acts on
//! the [`BuildOutcome`].

pub mod error;

use crate::policy::CacheDays;
use async_trait::async_trait;
use std::path::PathBuf;
use tfx_catalog::Project;

pub use self::error::{Error as BuildError, ErrorKind as BuildErrorKind, Result as BuildResult};

/// Everything a builder needs besides the project and language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Credentials and endpoint of the remote translation API.
    pub username: Option<String>,
    pub password: Option<String>,
    pub url: Option<String>,
    pub cache_days: CacheDays,
    /// Scratch directory.
    pub tmp_path: PathBuf,
    /// Absolute path of the archives folder the result is expected in.
    pub archives_folder: PathBuf,
    /// Embed the language's display name in the archive.
    pub include_lang_name: bool,
}
impl BuildOptions {
    pub fn new(archives_folder: impl Into<PathBuf>, tmp_path: impl Into<PathBuf>) -> Self {
        Self {
            username: None,
            password: None,
            url: None,
            cache_days: CacheDays::default(),
            tmp_path: tmp_path.into(),
            archives_folder: archives_folder.into(),
            include_lang_name: true,
        }
    }
}

/// What came of a build that was attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The archive was written to this path.
    Built(PathBuf),
    /// The build ran but didn't produce an archive. The record is quarantined
    /// for one TTL before being retried.
    Failed(String),
}

/// Produces the archive for one project and language.
#[async_trait]
pub trait PackageBuilder: Send + Sync {
    /// Build the archive for `project` in `language`.
    ///
    /// Returns an error only if the build could not be attempted at all; a
    /// build that ran and failed is [`BuildOutcome::Failed`]. Errors abort
    /// the run without quarantining the record.
    async fn build(&self, project: &Project, language: &str, options: &BuildOptions) -> BuildResult<BuildOutcome>;
}
