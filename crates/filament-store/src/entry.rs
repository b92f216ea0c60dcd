use std::path::PathBuf;

use chrono::{DateTime, Utc};
use filament_verify::Fingerprint;
use serde::{Deserialize, Serialize};

use crate::CacheKey;

/// A committed cache slot: a fully written local file and the identity of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key:         CacheKey,
    pub url:         String,
    pub local_path:  PathBuf,
    pub fingerprint: Fingerprint,
    pub size:        u64,
    pub etag:        Option<String>,
    pub created_at:  DateTime<Utc>,
}

/// Fields supplied by the writer when committing a reservation.
#[derive(Debug, Clone)]
pub struct Commit {
    pub url:         String,
    pub local_path:  PathBuf,
    pub fingerprint: Fingerprint,
    pub size:        u64,
    pub etag:        Option<String>,
}
