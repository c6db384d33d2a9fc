/*!
 * SQLite handle shared by the job repository.
 *
 * rusqlite connections are blocking, so every async call hops onto the
 * blocking pool and holds the mutex only for the duration of one closure.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::schema;

const APP_DIR: &str = "content-translate";
const JOBS_FILE: &str = "jobs.db";
const IN_MEMORY: &str = ":memory:";

/// Cloneable handle to the job database
#[derive(Clone)]
pub struct DatabaseConnection {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

fn lock(connection: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    connection
        .lock()
        .map_err(|_| anyhow!("Job database lock poisoned by a panicked task"))
}

impl DatabaseConnection {
    /// Open the configured database file, falling back to the per-user data dir
    pub fn open(db_path: Option<&Path>) -> Result<Self> {
        match db_path {
            Some(path) => Self::new(path),
            None => Self::new_default(),
        }
    }

    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open (or create) the database file, creating missing parent directories
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
        }

        info!("Opening job database at {}", db_path.display());
        let conn = Connection::open(&db_path).with_context(|| format!("Cannot open job database {}", db_path.display()))?;
        Self::from_connection(conn, db_path)
    }

    /// Private database that disappears with the handle
    pub fn new_in_memory() -> Result<Self> {
        debug!("Opening in-memory job database");
        let conn = Connection::open_in_memory().context("Cannot open in-memory job database")?;
        Self::from_connection(conn, PathBuf::from(IN_MEMORY))
    }

    fn from_connection(conn: Connection, db_path: PathBuf) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<data dir>/content-translate/jobs.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .ok_or_else(|| anyhow!("No data directory for this platform; set database_path in the config"))?;
        Ok(data_dir.join(APP_DIR).join(JOBS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == IN_MEMORY
    }

    /// Run `f` on the calling thread; only for short, non-async callers
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = lock(&self.connection)?;
        f(&conn)
    }

    /// Run `f` on the blocking pool
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let conn = lock(&connection)?;
            f(&conn)
        })
            .await
            .context("Job database task did not finish")?
    }

    /// Run `f` inside one transaction on the blocking pool.
    ///
    /// Nothing is committed unless `f` returns `Ok`.
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&connection)?;
            let tx = conn.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await
        .context("Job database transaction did not finish")?
    }

    /// Job and failure counts for the `report` command
    pub fn stats(&self) -> Result<DatabaseStats> {
        let (job_count, active_jobs, failure_count) = self.execute(|conn| {
            let (jobs, active): (i64, i64) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(status IN ('created', 'running', 'paused')), 0)
                 FROM batch_translate_jobs",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let failures: i64 = conn.query_row("SELECT COUNT(*) FROM batch_translate_failures", [], |row| row.get(0))?;
            Ok((jobs, active, failures))
        })?;

        let file_size_bytes = if self.is_in_memory() {
            0
        } else {
            std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(DatabaseStats {
            job_count,
            active_jobs,
            failure_count,
            file_size_bytes,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub job_count: i64,
    /// created, running or paused
    pub active_jobs: i64,
    /// Rows in the failure log
    pub failure_count: i64,
    pub file_size_bytes: u64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} jobs ({} active), {} failed records, {} KB on disk",
            self.job_count,
            self.active_jobs,
            self.failure_count,
            self.file_size_bytes / 1024
        )
    }
}
