//! Atomic file placement for content caches.
//!
//! Every file that becomes visible under a cache root goes through one of two paths:
//!
//! - [`atomic_write`] for content already in memory: written to a sibling temporary file,
//!   optionally synced, then renamed over the destination.
//! - [`StagedFile`] for content that arrives incrementally (network bodies): the caller writes
//!   into the staged path and calls [`StagedFile::commit`]. Dropping an uncommitted stage
//!   deletes the partial file, so an interrupted writer never leaves a visible artifact.

mod atomic_write;
mod error;
mod staging;

pub use atomic_write::{AtomicWriteOptions, atomic_write};
pub use error::{Error, Result};
pub use staging::{StagedFile, sweep_dir};

use std::path::Path;

/// Create `path` and all missing parents.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::create_dir_all(path).map_err(|source| Error::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
