use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{CacheEntry, CacheKey, Result};

/// Persistent key -> entry mapping supplied by the host build system.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;
    fn set(&self, entry: &CacheEntry) -> Result<()>;
    fn remove(&self, key: &CacheKey) -> Result<()>;
}

impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> { (**self).get(key) }
    fn set(&self, entry: &CacheEntry) -> Result<()> { (**self).set(entry) }
    fn remove(&self, key: &CacheKey) -> Result<()> { (**self).remove(key) }
}

/// Process-local store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.read().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> { Ok(self.read().get(key).cloned()) }

    fn set(&self, entry: &CacheEntry) -> Result<()> {
        self.write().insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<()> {
        self.write().remove(key);
        Ok(())
    }
}
