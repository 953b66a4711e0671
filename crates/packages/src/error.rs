//! Refresh job error types.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction;
//! errors from the catalog, storage and builder layers are raised into one
//! of the dependency variants below.

use derive_more::{Display, Error};

/// A refresh job error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for refresh job operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a refresh job failure.
///
/// ### Operational Errors
/// - [`ErrorKind::InvalidProject`]
/// - [`ErrorKind::Lock`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Catalog`]
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Build`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The selected record's project doesn't exist or isn't published.
    #[display("invalid project: {_0}")]
    InvalidProject(#[error(not(source))] i64),
    /// The package builder raised an error (as opposed to reporting a failed
    /// build, which is quarantined).
    #[display("package builder failed")]
    Build,
    /// Reading candidates or projects from the catalog failed.
    #[display("catalog lookup failed")]
    Catalog,
    /// An archive or quarantine folder operation failed.
    #[display("storage operation failed")]
    Storage,
    /// The run lock could not be created or queried.
    #[display("could not acquire run lock")]
    Lock,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Catalog | Self::Storage | Self::Lock)
    }
}
