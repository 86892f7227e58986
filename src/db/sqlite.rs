// SqliteBanStore: rusqlite backend implementing the BanStore trait.
//
// The Connection sits behind a std Mutex; every method locks, runs one or
// two statements, and returns. Writes go straight to disk, so there is
// nothing to flush on shutdown.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use rusqlite::Connection;

use super::models::BanRecord;
use super::traits::BanStore;

pub struct SqliteBanStore {
    conn: Mutex<Connection>,
}

impl SqliteBanStore {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("ban store connection lock poisoned"))
    }
}

impl BanStore for SqliteBanStore {
    fn get(&self, identity: &str) -> Result<Option<BanRecord>> {
        let conn = self.lock()?;
        super::queries::get_ban_record(&conn, identity)
    }

    fn put(&self, record: &BanRecord) -> Result<()> {
        let conn = self.lock()?;
        super::queries::upsert_ban_record(&conn, record)
    }

    fn insert_if_absent(&self, record: &BanRecord) -> Result<bool> {
        let conn = self.lock()?;
        super::queries::insert_ban_record_if_absent(&conn, record)
    }

    fn list(&self) -> Result<Vec<BanRecord>> {
        let conn = self.lock()?;
        super::queries::list_ban_records(&conn)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        super::queries::count_ban_records(&conn)
    }
}
