/// One (project, target language) pair that could produce an archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageRecord {
    pub project_id: i64,
    /// Target language code.
    pub language: String,
    /// The owning project's original language.
    pub source_language_code: String,
    /// Base name that archive file names are derived from.
    pub filename: String,
}
impl PackageRecord {
    /// Packaging a project's source language back onto itself is never
    /// wanted; such records are never candidates for a rebuild.
    pub fn is_source_language(&self) -> bool {
        self.language == self.source_language_code
    }
}

/// A package row to be inserted into the catalog.
#[derive(Debug, Clone, Default)]
pub struct NewPackage {
    pub project_id: i64,
    pub name: String,
    pub language: String,
    pub version: String,
}

#[derive(sqlx::FromRow)]
pub(crate) struct PackageRow {
    project_id: i64,
    language: String,
    source_language_code: String,
    filename: String,
}
impl From<PackageRow> for PackageRecord {
    fn from(row: PackageRow) -> Self {
        Self {
            project_id: row.project_id,
            language: row.language,
            source_language_code: row.source_language_code,
            filename: row.filename,
        }
    }
}
