use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to write {}", path.display())]
    Write {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}", path.display())]
    Read {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create directory {}", path.display())]
    CreateDir {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move {} to {}", from.display(), to.display())]
    Rename {
        from:   PathBuf,
        to:     PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path has no parent directory: {}", .0.display())]
    NoParent(PathBuf),
}

impl Error {
    /// The path the failed operation was acting on.
    pub fn path(&self) -> &Path {
        match self {
            Error::Write { path, .. }
            | Error::Read { path, .. }
            | Error::CreateDir { path, .. }
            | Error::NoParent(path) => path,
            Error::Rename { to, .. } => to,
        }
    }

    /// The underlying I/O error, if any.
    pub fn io(&self) -> Option<&io::Error> {
        match self {
            Error::Write { source, .. }
            | Error::Read { source, .. }
            | Error::CreateDir { source, .. }
            | Error::Rename { source, .. } => Some(source),
            Error::NoParent(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
