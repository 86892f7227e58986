// MemoryBanStore: process-local store behind an RwLock.
//
// Used by tests and by `watch --memory`. Nothing survives the process.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};

use super::models::BanRecord;
use super::traits::BanStore;

#[derive(Default)]
pub struct MemoryBanStore {
    records: RwLock<HashMap<String, BanRecord>>,
}

impl MemoryBanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BanStore for MemoryBanStore {
    fn get(&self, identity: &str) -> Result<Option<BanRecord>> {
        let records = self.records.read().map_err(|_| anyhow!("ban store lock poisoned"))?;
        Ok(records.get(identity).cloned())
    }

    fn put(&self, record: &BanRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| anyhow!("ban store lock poisoned"))?;
        records.insert(record.identity.clone(), record.clone());
        Ok(())
    }

    fn insert_if_absent(&self, record: &BanRecord) -> Result<bool> {
        let mut records = self.records.write().map_err(|_| anyhow!("ban store lock poisoned"))?;
        if records.contains_key(&record.identity) {
            return Ok(false);
        }
        records.insert(record.identity.clone(), record.clone());
        Ok(true)
    }

    fn list(&self) -> Result<Vec<BanRecord>> {
        let records = self.records.read().map_err(|_| anyhow!("ban store lock poisoned"))?;
        let mut all: Vec<BanRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(all)
    }

    fn count(&self) -> Result<usize> {
        let records = self.records.read().map_err(|_| anyhow!("ban store lock poisoned"))?;
        Ok(records.len())
    }
}
