use crate::error::Result;
use crate::{PackageRecord, Project, ProjectIds};
use async_trait::async_trait;

/// Read access to the project/package catalog.
///
/// [`Repository`](crate::Repository) is the SQLite implementation; the trait
/// exists so the refresh job can be driven by any catalog source.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Every (project, target language) pair that could produce an archive.
    ///
    /// - With [`ProjectIds::All`], only projects that are published **and**
    ///   have a non-empty filename are considered.
    /// - With an explicit filter, exactly the given projects are considered,
    ///   regardless of published state or filename. An explicit filter
    ///   without any IDs yields no records.
    ///
    /// Each (project, language) pair appears at most once, ordered by project
    /// ID then language code. Records for a project's own source language are
    /// included; it is up to the caller to skip them.
    async fn fetch_candidates(&self, projects: &ProjectIds) -> Result<Vec<PackageRecord>>;

    /// Load a single project by ID, or `None` if it doesn't exist.
    async fn load_project(&self, id: i64) -> Result<Option<Project>>;
}
