/// A translation project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub alias: String,
    pub source_language_code: String,
    /// Base name for archive file names; may be empty for projects that
    /// haven't been configured for packaging.
    pub filename: String,
    pub published: bool,
}
impl Project {
    pub fn is_published(&self) -> bool {
        self.published
    }
}

/// Value of `projects.published` for a published project.
pub(crate) const PUBLISHED: i64 = 1;

#[derive(sqlx::FromRow)]
pub(crate) struct ProjectRow {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) alias: String,
    pub(crate) source_language_code: String,
    pub(crate) filename: String,
    pub(crate) published: i64,
}
impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            alias: row.alias,
            source_language_code: row.source_language_code,
            filename: row.filename,
            // Anything other than 1 (unpublished, trashed, archived) is not published.
            published: row.published == PUBLISHED,
        }
    }
}
impl From<&Project> for ProjectRow {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
            alias: project.alias.clone(),
            source_language_code: project.source_language_code.clone(),
            filename: project.filename.clone(),
            published: i64::from(project.published),
        }
    }
}
