use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("fingerprint mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: String, actual: String },

    #[error("failed to read {} while hashing", path.display())]
    Read {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read metadata of {}", path.display())]
    Metadata {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unknown fingerprint mode: {0}")]
    UnknownMode(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, VerifyError>;
