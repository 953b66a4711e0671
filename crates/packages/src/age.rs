//! Artifact age, in calendar days.
//!
//! Ages are measured by comparing *dates*, not durations: both timestamps are
//! expressed in the clock's UTC offset and the difference between their
//! calendar dates is taken. A file written at 23:59 is therefore one day old
//! a minute later, and a file written at 00:01 is still zero days old at
//! 23:59 the same day. Scheduled cleanups that run once a day behave
//! predictably with this definition, which is why it is kept.

use time::{OffsetDateTime, UtcDateTime, UtcOffset};

/// Supplies "now" to the cache selector.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock time in the local time zone.
///
/// The local offset is resolved once, on construction. Querying it later can
/// fail once the process has spawned threads, so construct this early; if
/// the offset can't be determined UTC is used instead.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}
impl SystemClock {
    pub fn new() -> Self {
        let offset = UtcOffset::current_local_offset().unwrap_or_else(|_| {
            tracing::debug!("Local UTC offset could not be determined; ages are computed in UTC");
            UtcOffset::UTC
        });
        Self { offset }
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}
impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// A clock that is always at the same instant, for tests and replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub OffsetDateTime);
impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// Number of calendar days between the date `modified` falls on and the date
/// of `now`, both in `now`'s offset.
///
/// The difference is absolute, so a modification time in the future (clock
/// skew, restored backups) counts as aged too.
pub fn age_in_days(modified: UtcDateTime, now: OffsetDateTime) -> u64 {
    let modified = modified.to_offset(now.offset());
    (now.date() - modified.date()).whole_days().unsigned_abs()
}
