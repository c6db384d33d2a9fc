/*!
 * Job database schema.
 *
 * Schema changes are appended to `MIGRATIONS`; entry `n` upgrades a database
 * from version `n` to `n + 1`. Released entries must never be edited.
 */

use anyhow::{Context, Result, bail};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension};

const MIGRATIONS: &[&str] = &[
    // v1: jobs and the per-record failure log
    r#"
    CREATE TABLE batch_translate_jobs (
        id TEXT PRIMARY KEY,
        content_type TEXT NOT NULL,
        source_locale TEXT NOT NULL,
        target_locale TEXT NOT NULL,
        fields_to_translate TEXT NOT NULL,
        priority INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'created',
        processed INTEGER NOT NULL DEFAULT 0,
        failed INTEGER NOT NULL DEFAULT 0,
        total INTEGER NOT NULL DEFAULT 0,
        cursor INTEGER,
        error TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        completed_at TEXT
    );

    CREATE INDEX idx_jobs_status ON batch_translate_jobs(status);
    CREATE INDEX idx_jobs_content_type ON batch_translate_jobs(content_type, updated_at);

    -- one active job per (content_type, target_locale)
    CREATE UNIQUE INDEX idx_jobs_active_key
        ON batch_translate_jobs(content_type, target_locale)
        WHERE status IN ('created', 'running', 'paused');

    CREATE TABLE batch_translate_failures (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id TEXT NOT NULL REFERENCES batch_translate_jobs(id) ON DELETE CASCADE,
        record_id INTEGER NOT NULL,
        attempts INTEGER NOT NULL,
        error TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX idx_failures_job ON batch_translate_failures(job_id);
    "#,
];

/// Version a fully migrated database reports
pub const SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

/// Bring the database up to `SCHEMA_VERSION`
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         CREATE TABLE IF NOT EXISTS schema_version (
             id INTEGER PRIMARY KEY CHECK (id = 1),
             version INTEGER NOT NULL,
             updated_at TEXT NOT NULL
         );",
    )?;

    let version = schema_version(conn)?;
    if version > SCHEMA_VERSION {
        bail!(
            "Job database is at schema v{} but this build only knows v{}",
            version,
            SCHEMA_VERSION
        );
    }
    if version == SCHEMA_VERSION {
        debug!("Job database schema is current (v{})", version);
        return Ok(());
    }

    migrate(conn, MIGRATIONS, version)
}

/// Apply `migrations` past `version`, one transaction per step
fn migrate(conn: &Connection, migrations: &[&str], version: i32) -> Result<()> {
    for (index, sql) in migrations.iter().enumerate().skip(version as usize) {
        let target = index as i32 + 1;
        info!("Migrating job database to schema v{}", target);
        // rolled back on drop unless committed
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .with_context(|| format!("Schema migration to v{} failed", target))?;
        tx.execute(
            "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
            [target],
        )?;
        tx.commit()?;
    }

    Ok(())
}

fn schema_version(conn: &Connection) -> Result<i32> {
    let version = conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| row.get(0))
        .optional()
        .context("Cannot read job database schema version")?;
    Ok(version.unwrap_or(0))
}
