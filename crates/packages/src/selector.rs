//! Picking the next archive to rebuild.
//!
//! Every candidate record is classified against the two folders it may have
//! a file in:
//!
//! 1. A record for the project's own source language is never rebuilt.
//! 2. If a quarantine marker exists, it decides alone: the record is held
//!    back until the marker has outlived the TTL, at which point the marker
//!    is removed and the record selected. The archives folder is not
//!    consulted at all while a marker exists.
//! 3. Otherwise a missing archive is selected straight away, and an archive
//!    older than the TTL is removed and selected.
//!
//! [`select_for_rebuild`] walks the candidates in catalog order and stops at
//! the first one that needs work; [`inspect`] classifies all of them without
//! touching anything.
//!
//! Files that exist but whose metadata can't be read, or whose names are
//! rejected by the storage layer, are logged and skipped for this run rather
//! than failing it.

use crate::age::{Clock, age_in_days};
use crate::artifact::artifact_name;
use crate::error::{ErrorKind, Result};
use crate::policy::CacheConfig;
use derive_more::Display;
use exn::ResultExt;
use std::path::Path;
use tfx_catalog::PackageRecord;
use tfx_storage::BackendHandle;
use time::OffsetDateTime;
use tracing::instrument;

/// Where a single record stands, as far as the filesystem is concerned.
///
/// Ages are in calendar days (see [`age_in_days`]).
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Target language is the project's source language; never packaged.
    #[display("source language")]
    SourceLanguage,
    /// No archive and no quarantine marker.
    #[display("missing")]
    Missing,
    /// An archive within its TTL.
    #[display("fresh ({age} days)")]
    Fresh { age: u64 },
    /// An archive past its TTL.
    #[display("stale ({age} days)")]
    Stale { age: u64 },
    /// A recent build failed; held back until the marker expires.
    #[display("quarantined ({age} days)")]
    Quarantined { age: u64 },
    /// A build failed, but long enough ago to try again.
    #[display("quarantine expired ({age} days)")]
    QuarantineExpired { age: u64 },
    /// A file exists but couldn't be inspected, or the artifact name was
    /// rejected by the storage layer.
    #[display("unreadable")]
    Unreadable,
}
impl ArtifactState {
    /// Whether the selector would pick a record in this state.
    pub fn needs_rebuild(&self) -> bool {
        matches!(self, Self::Missing | Self::Stale { .. } | Self::QuarantineExpired { .. })
    }
}

/// A record and its classification, as reported by [`inspect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub record: PackageRecord,
    pub state: ArtifactState,
}

/// Select the first record, in the order given, whose archive needs to be
/// (re)built.
///
/// Selecting an expired quarantine marker or a stale archive **deletes** that
/// file as part of the selection, so that a build which never completes
/// leaves the record looking "missing" next time rather than fresh.
///
/// At most one record is returned. `None` means everything is either fresh,
/// quarantined, unreadable, or a source-language record.
///
/// # Errors
/// [`ErrorKind::Storage`] if a file that has to be removed can't be (a file
/// that has already disappeared is fine).
#[instrument(skip_all, fields(cache_days = cfg.cache_days.get()))]
pub async fn select_for_rebuild(
    records: impl IntoIterator<Item = PackageRecord>,
    cfg: &CacheConfig,
    clock: &dyn Clock,
) -> Result<Option<PackageRecord>> {
    let now = clock.now();
    for record in records {
        let name = artifact_name(&record);
        let state = classify(&record, &name, cfg, now).await;
        match state {
            ArtifactState::QuarantineExpired { .. } => {
                remove(&cfg.errors, &name).await?;
            },
            ArtifactState::Stale { .. } => {
                remove(&cfg.archives, &name).await?;
            },
            ArtifactState::Missing => {},
            _ => {
                tracing::trace!(project_id = record.project_id, language = %record.language, %state, "Skipping");
                continue;
            },
        }
        tracing::info!(project_id = record.project_id, language = %record.language, %state, "Selected for rebuild");
        return Ok(Some(record));
    }
    Ok(None)
}

/// Classify every record the same way [`select_for_rebuild`] would, without
/// deleting anything.
pub async fn inspect(
    records: impl IntoIterator<Item = PackageRecord>,
    cfg: &CacheConfig,
    clock: &dyn Clock,
) -> Vec<Inspection> {
    let now = clock.now();
    let mut inspections = Vec::new();
    for record in records {
        let state = classify(&record, &artifact_name(&record), cfg, now).await;
        inspections.push(Inspection { record, state });
    }
    inspections
}

async fn classify(record: &PackageRecord, name: &Path, cfg: &CacheConfig, now: OffsetDateTime) -> ArtifactState {
    if record.is_source_language() {
        return ArtifactState::SourceLanguage;
    }

    match cfg.errors.exists(name).await {
        Ok(true) => {
            return match file_age(&cfg.errors, name, now).await {
                Some(age) if cfg.cache_days.is_expired(age) => ArtifactState::QuarantineExpired { age },
                Some(age) => ArtifactState::Quarantined { age },
                // A marker we can't date still holds the record back.
                None => ArtifactState::Unreadable,
            };
        },
        Ok(false) => (),
        Err(e) => {
            tracing::warn!(backend = cfg.errors.name(), path = %name.display(), error = ?e, "Could not check for quarantine marker; skipping");
            return ArtifactState::Unreadable;
        },
    }

    match cfg.archives.exists(name).await {
        Ok(false) => ArtifactState::Missing,
        Ok(true) => match file_age(&cfg.archives, name, now).await {
            Some(age) if cfg.cache_days.is_expired(age) => ArtifactState::Stale { age },
            Some(age) => ArtifactState::Fresh { age },
            None => ArtifactState::Unreadable,
        },
        Err(e) => {
            tracing::warn!(backend = cfg.archives.name(), path = %name.display(), error = ?e, "Could not check for archive; skipping");
            ArtifactState::Unreadable
        },
    }
}

/// Age of a file known to exist, or `None` if its metadata can't be read
/// (including the file having disappeared since it was seen).
async fn file_age(backend: &BackendHandle, path: &Path, now: OffsetDateTime) -> Option<u64> {
    match backend.stat(path).await {
        Ok(info) => Some(age_in_days(info.modified, now)),
        Err(e) => {
            tracing::warn!(backend = backend.name(), path = %path.display(), error = ?e, "File exists but its modification time is unreadable; skipping");
            None
        },
    }
}

async fn remove(backend: &BackendHandle, path: &Path) -> Result<()> {
    match backend.delete(path).await {
        Ok(()) => {
            tracing::debug!(backend = backend.name(), path = %path.display(), "Removed expired file");
            Ok(())
        },
        Err(e) if e.is_not_found() => {
            tracing::debug!(backend = backend.name(), path = %path.display(), "Expired file already removed");
            Ok(())
        },
        Err(e) => Err(e).or_raise(|| ErrorKind::Storage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::age::FixedClock;
    use crate::policy::CacheDays;
    use async_trait::async_trait;
    use rstest::rstest;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tfx_storage::backend::{MockBackend, StorageBackend};
    use tfx_storage::error::{ErrorKind as StorageErrorKind, Result as StorageResult};
    use tfx_storage::FileInfo;
    use time::macros::{datetime, utc_datetime};
    use time::{Duration, UtcDateTime};

    const NOW: OffsetDateTime = datetime!(2025-03-10 12:00 UTC);

    fn days_ago(days: i64) -> UtcDateTime {
        utc_datetime!(2025-03-10 12:00) - Duration::days(days)
    }

    fn record(project_id: i64, language: &str) -> PackageRecord {
        PackageRecord {
            project_id,
            language: language.to_string(),
            source_language_code: "en-GB".to_string(),
            filename: format!("com_p{project_id}"),
        }
    }

    struct Folders {
        archives: Arc<MockBackend>,
        errors: Arc<MockBackend>,
    }
    impl Folders {
        fn new() -> Self {
            Self {
                archives: Arc::new(MockBackend::default().with_name("archives")),
                errors: Arc::new(MockBackend::default().with_name("errors")),
            }
        }

        fn config(&self, cache_days: i64) -> CacheConfig {
            CacheConfig::new(CacheDays::new(cache_days), self.archives.clone(), self.errors.clone())
        }

        async fn archive(&self, name: &str, age: i64) {
            self.archives.insert_modified(name, *b"PK", days_ago(age)).await;
        }

        async fn quarantine(&self, name: &str, age: i64) {
            self.errors.insert_modified(name, *b"Error!", days_ago(age)).await;
        }

        async fn has_archive(&self, name: &str) -> bool {
            self.archives.exists(Path::new(name)).await.unwrap()
        }

        async fn has_quarantine(&self, name: &str) -> bool {
            self.errors.exists(Path::new(name)).await.unwrap()
        }
    }

    async fn select(folders: &Folders, cache_days: i64, records: Vec<PackageRecord>) -> Option<PackageRecord> {
        select_for_rebuild(records, &folders.config(cache_days), &FixedClock(NOW)).await.unwrap()
    }

    #[tokio::test]
    async fn test_nothing_on_disk_selects_first_in_order() {
        let folders = Folders::new();
        let selected = select(&folders, 7, vec![record(1, "fr"), record(1, "de")]).await;
        assert_eq!(selected, Some(record(1, "fr")));
        assert!(!folders.has_archive("com_p1_de.zip").await);
        assert!(!folders.has_quarantine("com_p1_de.zip").await);
    }

    #[tokio::test]
    async fn test_stale_archive_wins_over_later_missing_one() {
        let folders = Folders::new();
        folders.archive("com_p1_fr.zip", 10).await;
        let selected = select(&folders, 7, vec![record(1, "fr"), record(1, "de")]).await;
        assert_eq!(selected, Some(record(1, "fr")));
        assert!(!folders.has_archive("com_p1_fr.zip").await);
    }

    #[tokio::test]
    async fn test_recent_quarantine_is_skipped() {
        let folders = Folders::new();
        folders.quarantine("com_p1_fr.zip", 3).await;
        let selected = select(&folders, 7, vec![record(1, "fr"), record(1, "de")]).await;
        assert_eq!(selected, Some(record(1, "de")));
        assert!(folders.has_quarantine("com_p1_fr.zip").await);
    }

    #[tokio::test]
    async fn test_recent_quarantine_deletes_nothing() {
        let folders = Folders::new();
        folders.quarantine("com_p1_fr.zip", 7).await;
        folders.archive("com_p1_fr.zip", 30).await;
        let selected = select(&folders, 7, vec![record(1, "fr")]).await;
        assert_eq!(selected, None);
        // The quarantine marker alone decides; the stale archive is untouched.
        assert!(folders.has_quarantine("com_p1_fr.zip").await);
        assert!(folders.has_archive("com_p1_fr.zip").await);
    }

    #[tokio::test]
    async fn test_expired_quarantine_is_selected_and_removed() {
        let folders = Folders::new();
        folders.quarantine("com_p1_fr.zip", 8).await;
        let selected = select(&folders, 7, vec![record(1, "fr"), record(1, "de")]).await;
        assert_eq!(selected, Some(record(1, "fr")));
        assert!(!folders.has_quarantine("com_p1_fr.zip").await);
    }

    #[tokio::test]
    async fn test_expired_quarantine_ignores_fresh_archive() {
        let folders = Folders::new();
        folders.quarantine("com_p1_fr.zip", 9).await;
        folders.archive("com_p1_fr.zip", 1).await;
        let selected = select(&folders, 7, vec![record(1, "fr")]).await;
        assert_eq!(selected, Some(record(1, "fr")));
        assert!(!folders.has_quarantine("com_p1_fr.zip").await);
        assert!(folders.has_archive("com_p1_fr.zip").await);
    }

    #[tokio::test]
    async fn test_fresh_archive_is_skipped() {
        let folders = Folders::new();
        folders.archive("com_p1_fr.zip", 7).await;
        folders.archive("com_p1_de.zip", 2).await;
        let selected = select(&folders, 7, vec![record(1, "fr"), record(1, "de"), record(2, "it")]).await;
        assert_eq!(selected, Some(record(2, "it")));
        assert!(folders.has_archive("com_p1_fr.zip").await);
        assert!(folders.has_archive("com_p1_de.zip").await);
    }

    #[tokio::test]
    async fn test_everything_fresh_selects_nothing() {
        let folders = Folders::new();
        folders.archive("com_p1_fr.zip", 0).await;
        folders.archive("com_p1_de.zip", 6).await;
        assert_eq!(select(&folders, 7, vec![record(1, "fr"), record(1, "de")]).await, None);
        assert_eq!(select(&folders, 7, vec![]).await, None);
    }

    #[rstest]
    #[case::missing(None)]
    #[case::stale(Some(100))]
    #[tokio::test]
    async fn test_source_language_is_never_selected(#[case] archive_age: Option<i64>) {
        let folders = Folders::new();
        let source = record(1, "en-GB");
        if let Some(age) = archive_age {
            folders.archive("com_p1_en-GB.zip", age).await;
        }
        assert_eq!(select(&folders, 7, vec![source.clone()]).await, None);
        assert_eq!(select(&folders, 7, vec![source, record(1, "fr")]).await, Some(record(1, "fr")));
        if archive_age.is_some() {
            assert!(folders.has_archive("com_p1_en-GB.zip").await);
        }
    }

    #[rstest]
    #[case::zero(0)]
    #[case::negative(-5)]
    #[tokio::test]
    async fn test_invalid_cache_days_behave_like_seven(#[case] cache_days: i64) {
        let folders = Folders::new();
        folders.archive("com_p1_fr.zip", 5).await;
        folders.archive("com_p1_de.zip", 8).await;
        let selected = select(&folders, cache_days, vec![record(1, "fr"), record(1, "de")]).await;
        assert_eq!(selected, Some(record(1, "de")));
        assert!(folders.has_archive("com_p1_fr.zip").await);
    }

    #[tokio::test]
    async fn test_at_most_one_selection_per_call() {
        let folders = Folders::new();
        folders.archive("com_p1_fr.zip", 10).await;
        folders.archive("com_p1_de.zip", 10).await;
        folders.quarantine("com_p2_fr.zip", 10).await;
        let records = vec![record(1, "fr"), record(1, "de"), record(2, "fr")];
        assert_eq!(select(&folders, 7, records.clone()).await, Some(record(1, "fr")));
        // Only the selected record's file was removed.
        assert!(folders.has_archive("com_p1_de.zip").await);
        assert!(folders.has_quarantine("com_p2_fr.zip").await);
        // The removed archive now looks missing, so it's picked again.
        assert_eq!(select(&folders, 7, records).await, Some(record(1, "fr")));
    }

    #[tokio::test]
    async fn test_undatable_quarantine_holds_record_back() {
        let folders = Folders::new();
        folders.errors.make_unreadable("com_p1_fr.zip").await;
        let selected = select(&folders, 7, vec![record(1, "fr"), record(1, "de")]).await;
        assert_eq!(selected, Some(record(1, "de")));
    }

    #[tokio::test]
    async fn test_undatable_archive_is_skipped() {
        let folders = Folders::new();
        folders.archive("com_p1_fr.zip", 30).await;
        folders.archives.make_unreadable("com_p1_fr.zip").await;
        let selected = select(&folders, 7, vec![record(1, "fr"), record(1, "de")]).await;
        assert_eq!(selected, Some(record(1, "de")));
    }

    #[tokio::test]
    async fn test_rejected_artifact_name_is_skipped() {
        let folders = Folders::new();
        let escaping = PackageRecord { filename: "../../etc/passwd".to_string(), ..record(1, "fr") };
        let selected = select(&folders, 7, vec![escaping, record(1, "de")]).await;
        assert_eq!(selected, Some(record(1, "de")));
    }

    #[tokio::test]
    async fn test_age_uses_calendar_days() {
        let folders = Folders::new();
        // Eight calendar days ago at 23:59 is less than eight full days, but still eight days old.
        folders.archives.insert_modified("com_p1_fr.zip", *b"PK", utc_datetime!(2025-03-02 23:59)).await;
        let selected = select(&folders, 7, vec![record(1, "fr")]).await;
        assert_eq!(selected, Some(record(1, "fr")));
    }

    /// Wraps a [`MockBackend`] whose deletes always fail with the given error.
    struct FailingDelete {
        inner: MockBackend,
        error: fn(PathBuf) -> StorageErrorKind,
    }
    #[async_trait]
    impl StorageBackend for FailingDelete {
        fn name(&self) -> &str {
            self.inner.name()
        }

        async fn prepare(&self) -> StorageResult<()> {
            self.inner.prepare().await
        }

        async fn exists(&self, path: &Path) -> StorageResult<bool> {
            self.inner.exists(path).await
        }

        async fn read(&self, path: &Path) -> StorageResult<Vec<u8>> {
            self.inner.read(path).await
        }

        async fn write(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
            self.inner.write(path, data).await
        }

        async fn delete(&self, path: &Path) -> StorageResult<()> {
            exn::bail!((self.error)(path.to_path_buf()))
        }

        async fn stat(&self, path: &Path) -> StorageResult<FileInfo> {
            self.inner.stat(path).await
        }
    }

    async fn failing_archives(error: fn(PathBuf) -> StorageErrorKind) -> CacheConfig {
        let inner = MockBackend::default();
        inner.insert_modified("com_p1_fr.zip", *b"PK", days_ago(10)).await;
        let archives = Arc::new(FailingDelete { inner, error });
        CacheConfig::new(CacheDays::default(), archives, Arc::new(MockBackend::default()))
    }

    #[tokio::test]
    async fn test_already_removed_file_is_not_an_error() {
        let cfg = failing_archives(StorageErrorKind::NotFound).await;
        let selected = select_for_rebuild(vec![record(1, "fr")], &cfg, &FixedClock(NOW)).await.unwrap();
        assert_eq!(selected, Some(record(1, "fr")));
    }

    #[tokio::test]
    async fn test_failed_removal_aborts_selection() {
        let cfg = failing_archives(StorageErrorKind::PermissionDenied).await;
        let err = select_for_rebuild(vec![record(1, "fr")], &cfg, &FixedClock(NOW)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Storage));
    }

    #[tokio::test]
    async fn test_inspect_classifies_without_deleting() {
        let folders = Folders::new();
        folders.archive("com_p1_de.zip", 2).await;
        folders.archive("com_p1_fr.zip", 12).await;
        folders.quarantine("com_p1_it.zip", 1).await;
        folders.quarantine("com_p1_nl.zip", 20).await;
        folders.archives.make_unreadable("com_p1_pt.zip").await;
        let records = vec![
            record(1, "de"),
            record(1, "en-GB"),
            record(1, "es"),
            record(1, "fr"),
            record(1, "it"),
            record(1, "nl"),
            record(1, "pt"),
        ];
        let states: Vec<_> = inspect(records, &folders.config(7), &FixedClock(NOW))
            .await
            .into_iter()
            .map(|i| (i.record.language, i.state))
            .collect();
        assert_eq!(
            states,
            vec![
                ("de".to_string(), ArtifactState::Fresh { age: 2 }),
                ("en-GB".to_string(), ArtifactState::SourceLanguage),
                ("es".to_string(), ArtifactState::Missing),
                ("fr".to_string(), ArtifactState::Stale { age: 12 }),
                ("it".to_string(), ArtifactState::Quarantined { age: 1 }),
                ("nl".to_string(), ArtifactState::QuarantineExpired { age: 20 }),
                ("pt".to_string(), ArtifactState::Unreadable),
            ]
        );
        assert!(folders.has_archive("com_p1_fr.zip").await);
        assert!(folders.has_quarantine("com_p1_nl.zip").await);
    }

    #[rstest]
    #[case(ArtifactState::Missing, true)]
    #[case(ArtifactState::Stale { age: 8 }, true)]
    #[case(ArtifactState::QuarantineExpired { age: 8 }, true)]
    #[case(ArtifactState::Fresh { age: 1 }, false)]
    #[case(ArtifactState::Quarantined { age: 1 }, false)]
    #[case(ArtifactState::SourceLanguage, false)]
    #[case(ArtifactState::Unreadable, false)]
    fn test_needs_rebuild(#[case] state: ArtifactState, #[case] expected: bool) {
        assert_eq!(state.needs_rebuild(), expected);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ArtifactState::Stale { age: 12 }.to_string(), "stale (12 days)");
        assert_eq!(ArtifactState::SourceLanguage.to_string(), "source language");
    }
}
