//! Error types for filament-fetch.
//!
//! Errors are `Clone` so a failed owner can hand the same value to every caller that was
//! waiting on its reservation.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Coarse classification callers branch on.
///
/// `Hash` is reserved for failures fingerprinting local files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Auth,
    NamingConflict,
    Io,
    Hash,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Network => "network",
            ErrorKind::Auth => "auth",
            ErrorKind::NamingConflict => "naming-conflict",
            ErrorKind::Io => "io",
            ErrorKind::Hash => "hash",
        };
        f.write_str(label)
    }
}

/// Why the last attempt at a URL failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No body bytes arrived within the stall window.
    Stalled { after: Duration },
    /// No response headers arrived within the connect window.
    ConnectTimeout { after: Duration },
    Status(u16),
    Transport(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Stalled { after } => write!(f, "stalled: no data for {after:?}"),
            FailureReason::ConnectTimeout { after } => write!(f, "no response within {after:?}"),
            FailureReason::Status(status) => write!(f, "HTTP status {status}"),
            FailureReason::Transport(message) => write!(f, "{message}"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to fetch {url} after {attempts} attempt(s): {reason}")]
    Network {
        url:      String,
        attempts: u32,
        reason:   FailureReason,
    },

    #[error("credentials rejected for {url} (HTTP {status})")]
    Auth { url: String, status: u16 },

    #[error("no free file name for {url} (wanted {name})")]
    NamingConflict { url: String, name: String },

    #[error("I/O error at {} while fetching {url}", path.display())]
    Io {
        url:    String,
        path:   PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("filesystem error while fetching {url}")]
    Fs {
        url:    String,
        #[source]
        source: Arc<filament_fs::Error>,
    },

    #[error("cache error while fetching {url}")]
    Cache {
        url:    String,
        #[source]
        source: Arc<filament_store::Error>,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidUrl { .. } | Error::Network { .. } => ErrorKind::Network,
            Error::Auth { .. } => ErrorKind::Auth,
            Error::NamingConflict { .. } => ErrorKind::NamingConflict,
            Error::Io { .. } | Error::Fs { .. } | Error::Cache { .. } => ErrorKind::Io,
        }
    }

    /// The remote URL the failure belongs to.
    pub fn url(&self) -> &str {
        match self {
            Error::InvalidUrl { url, .. }
            | Error::Network { url, .. }
            | Error::Auth { url, .. }
            | Error::NamingConflict { url, .. }
            | Error::Io { url, .. }
            | Error::Fs { url, .. }
            | Error::Cache { url, .. } => url,
        }
    }

    pub(crate) fn io(url: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            url:    url.to_string(),
            path:   path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn fs(url: &str, source: filament_fs::Error) -> Self {
        Error::Fs {
            url:    url.to_string(),
            source: Arc::new(source),
        }
    }

    /// Map a cache failure, unwrapping errors relayed from another caller's reservation.
    pub(crate) fn cache(url: &str, source: filament_store::Error) -> Self {
        match source {
            filament_store::Error::PeerFailed(shared) => match shared.downcast_ref::<Error>() {
                Some(original) => original.clone(),
                None => Error::Cache {
                    url:    url.to_string(),
                    source: Arc::new(filament_store::Error::PeerFailed(shared)),
                },
            },
            filament_store::Error::NamingConflict { name, .. } => Error::NamingConflict {
                url: url.to_string(),
                name,
            },
            other => Error::Cache {
                url:    url.to_string(),
                source: Arc::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        let network = Error::Network {
            url:      "https://example.com/a".into(),
            attempts: 3,
            reason:   FailureReason::Status(503),
        };
        assert_eq!(network.kind(), ErrorKind::Network);
        assert_eq!(network.url(), "https://example.com/a");

        let auth = Error::Auth {
            url:    "https://example.com/a".into(),
            status: 401,
        };
        assert_eq!(auth.kind(), ErrorKind::Auth);
    }

    #[test]
    fn peer_failure_unwraps_to_original() {
        let original = Error::Auth {
            url:    "https://example.com/private".into(),
            status: 403,
        };
        let relayed = filament_store::Error::PeerFailed(Arc::new(original.clone()));

        let mapped = Error::cache("https://example.com/private", relayed);
        assert_eq!(mapped.kind(), ErrorKind::Auth);
        assert_eq!(mapped.to_string(), original.to_string());
    }

    #[test]
    fn store_naming_conflict_maps_to_kind() {
        let conflict = filament_store::Error::NamingConflict {
            name: "a.jpg".into(),
            key:  filament_store::CacheKey::derive("https://example.com/a.jpg", None, None),
        };
        let mapped = Error::cache("https://example.com/a.jpg", conflict);
        assert_eq!(mapped.kind(), ErrorKind::NamingConflict);
    }

    #[test]
    fn reason_display() {
        assert_eq!(FailureReason::Status(404).to_string(), "HTTP status 404");
        assert!(
            FailureReason::Stalled {
                after: Duration::from_millis(50),
            }
            .to_string()
            .starts_with("stalled")
        );
    }
}
