//! Database schema migrations.
//!
//! Applied versions are tracked in `_migrations`. Each pending migration runs
//! in its own transaction together with its version row, so a failed batch
//! leaves the schema at the previous version.

use super::Error;
use tokio_rusqlite::rusqlite::{self, Connection as RawConnection};
use tokio_rusqlite::{Connection, params};

/// Schema migrations in application order: (version, SQL).
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_object_stores.sql")),
    (2, include_str!("../../migrations/002_generations.sql")),
];

fn current_version(conn: &RawConnection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))
}

/// Apply every migration newer than the recorded schema version.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` naming the version whose SQL failed.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current = current_version(conn)?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
            tracing::debug!(version, "applying store migration");
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
