use std::collections::BTreeSet;

/// Which projects to restrict the catalog to.
///
/// [`All`](Self::All) is the unfiltered catalog: every published project with
/// a filename. [`Only`](Self::Only) is an explicit filter; when none of the
/// requested IDs were usable it is empty, and matches no project at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProjectIds {
    #[default]
    All,
    Only(BTreeSet<i64>),
}
impl ProjectIds {
    /// No explicit filter.
    pub fn all() -> Self {
        Self::All
    }

    /// An explicit filter that matches nothing.
    pub fn none() -> Self {
        Self::Only(BTreeSet::new())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// True for an explicit filter without any IDs in it.
    pub fn matches_nothing(&self) -> bool {
        matches!(self, Self::Only(ids) if ids.is_empty())
    }

    /// Number of explicitly listed IDs (zero when unfiltered).
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether `id` is explicitly listed. Always false when unfiltered.
    pub fn contains(&self, id: i64) -> bool {
        matches!(self, Self::Only(ids) if ids.contains(&id))
    }

    /// The explicitly listed IDs, sorted and unique.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        let ids = match self {
            Self::All => None,
            Self::Only(ids) => Some(ids),
        };
        ids.into_iter().flatten().copied()
    }
}
impl FromIterator<i64> for ProjectIds {
    fn from_iter<T: IntoIterator<Item = i64>>(iter: T) -> Self {
        Self::Only(iter.into_iter().collect())
    }
}
