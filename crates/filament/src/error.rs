use std::path::{Path, PathBuf};

use filament_fetch::ErrorKind;
use thiserror::Error;

use crate::sink::SinkError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] filament_fetch::Error),

    #[error("failed to read {}", path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fingerprint {}", path.display())]
    Hash {
        path:   PathBuf,
        #[source]
        source: filament_verify::VerifyError,
    },

    #[error(transparent)]
    Fs(#[from] filament_fs::Error),

    #[error(transparent)]
    Cache(#[from] filament_store::Error),

    #[error("node sink rejected {}", path.display())]
    Sink {
        path:   PathBuf,
        #[source]
        source: SinkError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] filament_fetch::TransportError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Fetch(e) => e.kind(),
            Error::Hash { .. } => ErrorKind::Hash,
            Error::Cache(filament_store::Error::NamingConflict { .. }) => ErrorKind::NamingConflict,
            Error::Client(_) => ErrorKind::Network,
            Error::Io { .. } | Error::Fs(_) | Error::Cache(_) | Error::Sink { .. } | Error::Join(_) => ErrorKind::Io,
        }
    }

    /// The remote URL behind a failed acquisition.
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::Fetch(e) => Some(e.url()),
            _ => None,
        }
    }

    /// The local path involved, when the failure is about one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::Io { path, .. } | Error::Hash { path, .. } | Error::Sink { path, .. } => Some(path),
            Error::Fs(e) => Some(e.path()),
            _ => None,
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
