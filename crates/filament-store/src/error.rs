use std::sync::Arc;

use thiserror::Error;

use crate::CacheKey;

#[derive(Debug, Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] postcard::Error),

    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error(transparent)]
    Fs(#[from] filament_fs::Error),

    #[error(transparent)]
    Verify(#[from] filament_verify::VerifyError),

    #[error("no free file name for {name} (key {key})")]
    NamingConflict { name: String, key: CacheKey },

    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    /// The reservation this caller was waiting on failed; carries the owner's error.
    #[error("shared acquisition failed: {0}")]
    PeerFailed(#[source] Arc<dyn std::error::Error + Send + Sync>),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
