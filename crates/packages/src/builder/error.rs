//! Error types for the [`builder`](super) module.

use derive_more::{Display, Error};

/// A package builder error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for package builder operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a builder could not even attempt (or report on) a build.
///
/// These are distinct from a build that ran and failed, which is reported as
/// [`BuildOutcome::Failed`](super::BuildOutcome::Failed).
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The builder program could not be found.
    #[display("builder program not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The builder could not be started or waited on.
    #[display("could not run builder")]
    Spawn,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Spawn)
    }
}
