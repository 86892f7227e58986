// Database schema: table creation and migrations.
//
// `schema_version` tracks which migrations have run. There is only one so far.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// Idempotent, so it runs on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Remembered alt detections, one row per identity
        CREATE TABLE IF NOT EXISTS ban_records (
            identity TEXT PRIMARY KEY,         -- platform user id
            reason TEXT NOT NULL,
            category TEXT NOT NULL,            -- trust category at detection time
            score REAL NOT NULL,
            recorded_at TEXT NOT NULL          -- RFC 3339, UTC
        );

        -- Listing is newest first
        CREATE INDEX IF NOT EXISTS idx_ban_records_recorded
            ON ban_records(recorded_at);
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    Ok(())
}
