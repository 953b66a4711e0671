//! SQLite-backed catalog repository.

use crate::Database;
use crate::catalog::Catalog;
use crate::error::{ErrorKind, Result};
use crate::filter::ProjectIds;
use crate::models::{NewPackage, PUBLISHED, PackageRecord, PackageRow, Project, ProjectRow};
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Repository for reading (and, for seeding, writing) the project/package
/// catalog.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Build the candidate query for the given project filter.
    ///
    /// Not called for a filter that matches nothing.
    fn candidates_query(projects: &ProjectIds) -> QueryBuilder<'static, Sqlite> {
        let mut query = QueryBuilder::new(include_str!("../queries/fetch_candidates.sql"));
        match projects {
            ProjectIds::All => {
                query.push(" WHERE a.project_id IN (SELECT c.id FROM projects AS c WHERE c.published = ");
                query.push_bind(PUBLISHED);
                query.push(" AND c.filename != '')");
            },
            // The caller picked these projects explicitly; don't second-guess
            // them with the published/filename checks.
            ProjectIds::Only(selected) => {
                query.push(" WHERE a.project_id IN (");
                let mut ids = query.separated(", ");
                for id in selected {
                    ids.push_bind(*id);
                }
                ids.push_unseparated(")");
            },
        }
        query.push(" GROUP BY a.project_id, a.language ORDER BY a.project_id, a.language");
        query
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert or replace a project (keyed by its ID).
    pub async fn upsert_project(&self, project: &Project) -> Result<()> {
        let row = ProjectRow::from(project);
        sqlx::query(include_str!("../queries/insert_project.sql"))
            .bind(row.id)
            .bind(row.name)
            .bind(row.alias)
            .bind(row.source_language_code)
            .bind(row.filename)
            .bind(row.published)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Insert a package row, returning its ID.
    pub async fn insert_package(&self, package: &NewPackage) -> Result<i64> {
        let result = sqlx::query(include_str!("../queries/insert_package.sql"))
            .bind(package.project_id)
            .bind(&package.name)
            .bind(&package.language)
            .bind(&package.version)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl Catalog for Repository {
    async fn fetch_candidates(&self, projects: &ProjectIds) -> Result<Vec<PackageRecord>> {
        if projects.matches_nothing() {
            tracing::debug!("Project filter has no valid IDs; no candidates");
            return Ok(Vec::new());
        }
        let rows: Vec<PackageRow> = Self::candidates_query(projects)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::debug!(candidates = rows.len(), filtered = !projects.is_all(), "Fetched package candidates");
        Ok(rows.into_iter().map(PackageRecord::from).collect())
    }

    async fn load_project(&self, id: i64) -> Result<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as(include_str!("../queries/load_project.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.map(Project::from))
    }
}
