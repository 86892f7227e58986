// Ban store trait: backend-agnostic interface for remembered alts.
//
// Implementors: MemoryBanStore (process-local map), SqliteBanStore (wraps
// rusqlite). The methods are synchronous because evaluation is: the gate
// lookup happens inside `evaluate`, which never suspends.

use anyhow::Result;

use super::models::BanRecord;

pub trait BanStore: Send + Sync {
    /// Look up the record for an identity.
    fn get(&self, identity: &str) -> Result<Option<BanRecord>>;

    /// Store a record, replacing any earlier one for the same identity.
    fn put(&self, record: &BanRecord) -> Result<()>;

    /// Atomic check-and-insert. Returns false, and leaves the existing
    /// record untouched, if the identity already has one.
    fn insert_if_absent(&self, record: &BanRecord) -> Result<bool>;

    /// All records, newest first.
    fn list(&self) -> Result<Vec<BanRecord>>;

    /// Number of records.
    fn count(&self) -> Result<usize>;
}
