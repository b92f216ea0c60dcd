use std::path::Path;

use crate::{CacheEntry, CacheKey, CacheStore, Result};

const ENTRIES_TREE: &str = "entries";

/// Durable store backed by a sled database; entries are postcard-encoded.
pub struct SledStore {
    db:      sled::Db,
    entries: sled::Tree,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        let entries = db.open_tree(ENTRIES_TREE)?;
        Ok(Self { db, entries })
    }

    /// All persisted entries, in key order.
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        let mut out = Vec::new();
        for item in self.entries.iter() {
            let (_, value) = item?;
            out.push(postcard::from_bytes(&value)?);
        }
        Ok(out)
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl CacheStore for SledStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        match self.entries.get(key.as_str())? {
            Some(value) => Ok(Some(postcard::from_bytes(&value)?)),
            None => Ok(None),
        }
    }

    fn set(&self, entry: &CacheEntry) -> Result<()> {
        let value = postcard::to_stdvec(entry)?;
        self.entries.insert(entry.key.as_str(), value)?;
        // A committed entry must outlive a crash right after the download finished.
        self.entries.flush()?;
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<()> {
        self.entries.remove(key.as_str())?;
        self.entries.flush()?;
        Ok(())
    }
}
