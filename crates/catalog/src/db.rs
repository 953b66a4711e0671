//! Database connection and pool management.

use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations, run by [`Database::create`] and for in-memory catalogs.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// A refresh run issues a couple of queries, one after the other.
const MAX_CONNECTIONS: u32 = 2;
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Database connection pool for the catalog.
///
/// This is the main entry point for interacting with the catalog database.
/// Build a [`Repository`](crate::Repository) from it to run queries.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn open(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(Self { pool })
    }

    /// Connect to an existing catalog database.
    ///
    /// The file is neither created nor migrated: a missing file is an
    /// [`ErrorKind::Database`] error rather than an empty catalog.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Connecting to catalog database");
        let options = Self::base_options().filename(path).create_if_missing(false);
        Self::open(options, MAX_CONNECTIONS).await
    }

    /// Create (or open) a catalog database at the given path and bring its
    /// tables up to date. Used to seed a standalone catalog.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Creating catalog database");
        let options = Self::base_options().filename(path).create_if_missing(true);
        let db = Self::open(options, MAX_CONNECTIONS).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Connect to an empty in-memory catalog, for tests and dry runs.
    ///
    /// Not `#[cfg(test)]`: other crates seed it in their own tests. The
    /// catalog is gone once the pool is closed.
    pub async fn connect_in_memory() -> Result<Self> {
        // Every connection to `:memory:` is its own database.
        let db = Self::open(Self::base_options().filename(":memory:"), 1).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// The journal mode is left alone: the catalog file belongs to the CMS,
    /// which may be writing to it while a refresh reads.
    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
    }

    /// Create or update the catalog tables.
    #[instrument(name = "catalog_migrations", skip_all)]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
