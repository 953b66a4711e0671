use std::fmt;
use tfx_storage::BackendHandle;

/// How many calendar days an archive, or a quarantine marker, stays valid.
///
/// Always positive. Values that don't make sense as a TTL (zero or negative)
/// fall back to [`CacheDays::DEFAULT`] rather than failing the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheDays(u64);
impl CacheDays {
    pub const DEFAULT: u64 = 7;

    pub fn new(days: i64) -> Self {
        match u64::try_from(days) {
            Ok(days) if days > 0 => Self(days),
            _ => {
                tracing::debug!(cache_days = days, default = Self::DEFAULT, "Invalid cache days; using default");
                Self(Self::DEFAULT)
            },
        }
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Whether something `age` days old has outlived this TTL.
    pub fn is_expired(self, age: u64) -> bool {
        age > self.0
    }
}
impl Default for CacheDays {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}
impl fmt::Display for CacheDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where archives live and how long they last.
#[derive(Clone)]
pub struct CacheConfig {
    pub cache_days: CacheDays,
    /// The archives folder.
    pub archives: BackendHandle,
    /// The quarantine folder, for markers left by failed builds.
    pub errors: BackendHandle,
}
impl CacheConfig {
    pub fn new(cache_days: CacheDays, archives: BackendHandle, errors: BackendHandle) -> Self {
        Self { cache_days, archives, errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(7, 7)]
    #[case(1, 1)]
    #[case(30, 30)]
    #[case(0, 7)]
    #[case(-1, 7)]
    #[case(i64::MIN, 7)]
    fn test_coercion(#[case] input: i64, #[case] expected: u64) {
        assert_eq!(CacheDays::new(input).get(), expected);
    }

    #[test]
    fn test_expiry_is_strictly_greater() {
        let ttl = CacheDays::new(7);
        assert!(!ttl.is_expired(0));
        assert!(!ttl.is_expired(7));
        assert!(ttl.is_expired(8));
    }

    #[test]
    fn test_default() {
        assert_eq!(CacheDays::default(), CacheDays::new(0));
        assert_eq!(CacheDays::default().to_string(), "7");
    }
}
