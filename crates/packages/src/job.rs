//! The scheduled refresh job.

use crate::age::{Clock, SystemClock};
use crate::artifact::artifact_name;
use crate::builder::{BuildOptions, BuildOutcome, PackageBuilder};
use crate::error::{ErrorKind, Result};
use crate::lock::RunLock;
use crate::policy::CacheConfig;
use crate::selector::{Inspection, inspect, select_for_rebuild};
use exn::ResultExt;
use std::path::PathBuf;
use std::sync::Arc;
use tfx_catalog::{Catalog, PackageRecord, ProjectIds};
use tracing::instrument;

/// The scheduler context this job answers to. Every other context is a no-op.
pub const CREATE_PACKAGES_CONTEXT: &str = "com_itptransifex.cron.create.packages";

/// Contents of a quarantine marker.
pub const QUARANTINE_MARKER: &[u8] = b"Error!";

/// What a single run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Triggered for a different context; nothing was touched.
    Ignored,
    /// Another run holds the run lock; nothing was touched.
    Locked,
    /// Every candidate is fresh, quarantined, or otherwise not due.
    NothingToDo,
    /// The selected record's archive was rebuilt.
    Built { record: PackageRecord, archive: PathBuf },
    /// The build failed; a quarantine marker now holds the record back.
    Quarantined { record: PackageRecord, reason: String },
}

/// Parse a raw project ID filter: values are trimmed and parsed as integers,
/// anything that isn't a positive integer is dropped, duplicates collapse.
///
/// Blank input means no filter at all. A filter that was given but has no
/// valid ID left matches no project, rather than every published one.
pub fn normalize_project_ids<S: AsRef<str>>(raw: impl IntoIterator<Item = S>) -> ProjectIds {
    let mut given = false;
    let ids: ProjectIds = raw
        .into_iter()
        .filter_map(|value| {
            let value = value.as_ref().trim();
            if value.is_empty() {
                return None;
            }
            given = true;
            match value.parse::<i64>() {
                Ok(id) if id > 0 => Some(id),
                _ => {
                    tracing::debug!(value, "Ignoring invalid project ID");
                    None
                },
            }
        })
        .collect();
    if !given {
        return ProjectIds::all();
    }
    if ids.matches_nothing() {
        tracing::warn!("No valid project ID in the project filter; nothing will be selected");
    }
    ids
}

/// Rebuilds at most one translation archive per run.
///
/// Every collaborator is injected: the catalog the candidates come from, the
/// archives and quarantine folders, the builder, and the clock ages are
/// measured against.
pub struct Job {
    catalog: Arc<dyn Catalog>,
    builder: Arc<dyn PackageBuilder>,
    cache: CacheConfig,
    options: BuildOptions,
    clock: Arc<dyn Clock>,
    projects: ProjectIds,
    lock_dir: Option<PathBuf>,
}
impl Job {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        builder: Arc<dyn PackageBuilder>,
        cache: CacheConfig,
        options: BuildOptions,
    ) -> Self {
        Self {
            catalog,
            builder,
            cache,
            options,
            clock: Arc::new(SystemClock::new()),
            projects: ProjectIds::all(),
            lock_dir: None,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Only consider these projects. [`ProjectIds::all()`] means every
    /// published project with a filename.
    pub fn with_projects(mut self, projects: ProjectIds) -> Self {
        self.projects = projects;
        self
    }

    /// Hold a [`RunLock`] in `dir` while running.
    pub fn with_lock(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    /// Scheduler entry point: runs the job if `context` is
    /// [`CREATE_PACKAGES_CONTEXT`], and does nothing at all otherwise.
    pub async fn on_cron_create(&self, context: &str) -> Result<JobOutcome> {
        if context != CREATE_PACKAGES_CONTEXT {
            tracing::trace!(context, "Ignoring trigger for another context");
            return Ok(JobOutcome::Ignored);
        }
        self.run().await
    }

    /// Select the next record due for a rebuild and rebuild it.
    ///
    /// # Errors
    /// - [`ErrorKind::Storage`] if the folders can't be created, a stale file
    ///   can't be removed, or a quarantine marker can't be written.
    /// - [`ErrorKind::Lock`] if the run lock can't be queried.
    /// - [`ErrorKind::Catalog`] if candidates or the project can't be loaded.
    /// - [`ErrorKind::InvalidProject`] if the selected record's project is
    ///   missing or unpublished.
    /// - [`ErrorKind::Build`] if the builder raised an error.
    #[instrument(skip_all, fields(filtered = !self.projects.is_all(), projects = self.projects.len()))]
    pub async fn run(&self) -> Result<JobOutcome> {
        self.cache.archives.prepare().await.or_raise(|| ErrorKind::Storage)?;
        self.cache.errors.prepare().await.or_raise(|| ErrorKind::Storage)?;

        let _lock = match &self.lock_dir {
            Some(dir) => match RunLock::try_acquire(dir)? {
                Some(lock) => Some(lock),
                None => {
                    tracing::warn!(path = %dir.display(), "Another run holds the lock; skipping");
                    return Ok(JobOutcome::Locked);
                },
            },
            None => None,
        };

        let candidates = self.catalog.fetch_candidates(&self.projects).await.or_raise(|| ErrorKind::Catalog)?;
        tracing::debug!(candidates = candidates.len(), "Fetched candidates");
        let Some(record) = select_for_rebuild(candidates, &self.cache, self.clock.as_ref()).await? else {
            tracing::info!("All archives are up to date");
            return Ok(JobOutcome::NothingToDo);
        };

        let project = match self.catalog.load_project(record.project_id).await.or_raise(|| ErrorKind::Catalog)? {
            Some(project) if project.is_published() => project,
            _ => exn::bail!(ErrorKind::InvalidProject(record.project_id)),
        };

        let outcome = self
            .builder
            .build(&project, &record.language, &self.options)
            .await
            .or_raise(|| ErrorKind::Build)?;
        match outcome {
            BuildOutcome::Built(archive) => {
                tracing::info!(project_id = record.project_id, language = %record.language, archive = %archive.display(), "Archive built");
                Ok(JobOutcome::Built { record, archive })
            },
            BuildOutcome::Failed(reason) => {
                let name = artifact_name(&record);
                self.cache.errors.write(&name, QUARANTINE_MARKER).await.or_raise(|| ErrorKind::Storage)?;
                tracing::warn!(project_id = record.project_id, language = %record.language, reason = %reason, "Build failed; quarantined");
                Ok(JobOutcome::Quarantined { record, reason })
            },
        }
    }

    /// Classify every candidate without changing anything on disk.
    pub async fn status(&self) -> Result<Vec<Inspection>> {
        let candidates = self.catalog.fetch_candidates(&self.projects).await.or_raise(|| ErrorKind::Catalog)?;
        Ok(inspect(candidates, &self.cache, self.clock.as_ref()).await)
    }
}
