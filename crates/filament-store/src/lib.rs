//! Deduplicating content cache.
//!
//! A [`ContentCache`] maps [`CacheKey`]s to fully written local files. Lookups either return
//! the committed [`CacheEntry`] or grant a [`Reservation`], the exclusive right to populate
//! the key. Concurrent lookups for a reserved key wait for the owner instead of starting a
//! second fetch.
//!
//! Entries are persisted through a [`CacheStore`]: [`SledStore`] for durable use across
//! process runs, [`MemoryStore`] for tests and one-shot tools.
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/remote/    downloaded files
//! <root>/buffers/   files materialized from in-memory buffers
//! <root>/.staging/  partial downloads, cleared on open
//! ```

mod backend;
mod cache;
mod durable;
mod entry;
mod error;
mod key;

pub use backend::{CacheStore, MemoryStore};
pub use cache::{BUFFERS_DIR, CacheOptions, ContentCache, Lookup, REMOTE_DIR, Reservation, STAGING_DIR};
pub use durable::SledStore;
pub use entry::{CacheEntry, Commit};
pub use error::{Error, Result};
pub use key::CacheKey;
