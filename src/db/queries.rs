// Database queries: CRUD for ban records.
//
// All SQL lives here; SqliteBanStore just locks the connection and calls in.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::BanRecord;

/// Raw row as stored: (identity, reason, category, score, recorded_at).
type BanRow = (String, String, String, f64, String);

fn row_to_record(row: BanRow) -> Result<BanRecord> {
    let (identity, reason, category, score, recorded_at) = row;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
        .with_context(|| format!("Bad recorded_at for {identity}: {recorded_at}"))?
        .with_timezone(&Utc);
    Ok(BanRecord {
        category: category.parse()?,
        identity,
        reason,
        score,
        recorded_at,
    })
}

/// Load one identity's record.
pub fn get_ban_record(conn: &Connection, identity: &str) -> Result<Option<BanRecord>> {
    let mut stmt = conn.prepare(
        "SELECT identity, reason, category, score, recorded_at
         FROM ban_records WHERE identity = ?1",
    )?;
    let row: Option<BanRow> = stmt
        .query_row(params![identity], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })
        .optional()?;
    row.map(row_to_record).transpose()
}

/// Insert or replace an identity's record.
pub fn upsert_ban_record(conn: &Connection, record: &BanRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO ban_records (identity, reason, category, score, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(identity) DO UPDATE SET
            reason = ?2,
            category = ?3,
            score = ?4,
            recorded_at = ?5",
        params![
            record.identity,
            record.reason,
            record.category.as_str(),
            record.score,
            record.recorded_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Insert only if the identity has no record. Returns whether a row was written.
///
/// A single statement, so two processes sharing the file can't both win.
pub fn insert_ban_record_if_absent(conn: &Connection, record: &BanRecord) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO ban_records (identity, reason, category, score, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(identity) DO NOTHING",
        params![
            record.identity,
            record.reason,
            record.category.as_str(),
            record.score,
            record.recorded_at.to_rfc3339(),
        ],
    )?;
    Ok(changed == 1)
}

/// All records, newest first.
pub fn list_ban_records(conn: &Connection) -> Result<Vec<BanRecord>> {
    let mut stmt = conn.prepare(
        "SELECT identity, reason, category, score, recorded_at
         FROM ban_records
         ORDER BY recorded_at DESC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row_to_record(row?)?);
    }
    Ok(records)
}

pub fn count_ban_records(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM ban_records", [], |row| row.get(0))?;
    Ok(count as usize)
}
