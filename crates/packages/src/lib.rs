//! Translation package cache refresh.
//!
//! Every (project, language) pair in the [catalog](tfx_catalog) should have a
//! downloadable archive named `<filename>_<language>.zip` in the archives
//! folder. Archives expire after a number of calendar days; builds that fail
//! leave a marker of the same name in the quarantine (`errors`) folder, which
//! holds off further attempts until it expires too.
//!
//! Each run of the [`Job`] rebuilds **at most one** archive: the first
//! candidate, in catalog order, that is missing, stale, or whose quarantine
//! marker has expired. Scheduling the job frequently is what eventually
//! refreshes everything.

mod age;
mod artifact;
pub mod builder;
pub mod error;
mod job;
mod lock;
mod policy;
mod selector;

pub use crate::age::{Clock, FixedClock, SystemClock, age_in_days};
pub use crate::artifact::{ARCHIVE_EXTENSION, artifact_name};
pub use crate::builder::{BuildOptions, BuildOutcome, PackageBuilder};
pub use crate::job::{CREATE_PACKAGES_CONTEXT, Job, JobOutcome, QUARANTINE_MARKER, normalize_project_ids};
pub use crate::lock::RunLock;
pub use crate::policy::{CacheConfig, CacheDays};
pub use crate::selector::{ArtifactState, Inspection, inspect, select_for_rebuild};
