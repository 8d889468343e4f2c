use std::path::{Path, PathBuf};
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DbResult;

/// Default pool size for file databases.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the database lives and how many connections to pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file. `None` means a private in-memory database.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Pool size. In-memory databases always use a single connection.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 1,
        }
    }
}

impl DatabaseConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn open(&self) -> DbResult<Database> {
        match &self.path {
            Some(path) => Database::open(path, self.max_connections),
            None => Database::in_memory(),
        }
    }
}

/// Pooled SQLite handle.
///
/// Cloning is cheap and shares the pool. Every operation checks a
/// connection out inside a blocking task and returns it when the pooled
/// guard drops, on success and failure alike.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
    location: String,
}

impl Database {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>, max_connections: u32) -> DbResult<Self> {
        let path = path.as_ref();
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
        let pool = Pool::builder()
            .max_size(max_connections.max(1))
            .build(manager)?;
        debug!(path = %path.display(), max_connections, "database opened");
        Ok(Self {
            pool,
            location: path.display().to_string(),
        })
    }

    /// A private in-memory database.
    ///
    /// Each SQLite in-memory connection is its own database, so the pool is
    /// capped at one connection that is never recycled: replacing it would
    /// replace the database with an empty one.
    pub fn in_memory() -> DbResult<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(SqliteConnectionManager::memory())?;
        Ok(Self {
            pool,
            location: ":memory:".to_string(),
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run `f` against a pooled connection on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut Connection) -> DbResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        })
        .await?
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("location", &self.location)
            .field("max_connections", &self.pool.max_size())
            .finish()
    }
}
