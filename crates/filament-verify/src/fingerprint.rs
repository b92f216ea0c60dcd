use std::fmt;
use std::fs::{File, Metadata};
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{HashingReader, Hasher, Result, Sha256Hasher, VerifyError};

const READ_CHUNK: usize = 64 * 1024;

/// How a file's identity is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMode {
    /// SHA-256 over the full content.
    #[default]
    Exact,
    /// Byte length plus modification time. No content is read, so a rewrite that keeps both
    /// unchanged goes unnoticed.
    Proxy,
}

impl fmt::Display for FingerprintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerprintMode::Exact => write!(f, "exact"),
            FingerprintMode::Proxy => write!(f, "proxy"),
        }
    }
}

impl FromStr for FingerprintMode {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" | "hash" | "sha256" => Ok(Self::Exact),
            "proxy" | "mtime" | "fast" => Ok(Self::Proxy),
            other => Err(VerifyError::UnknownMode(other.to_string())),
        }
    }
}

/// Content identity of a file.
///
/// Values of different variants never compare equal, even when they describe the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fingerprint {
    Exact {
        digest: String,
    },
    Proxy {
        size:           u64,
        modified_secs:  i64,
        modified_nanos: u32,
    },
}

impl Fingerprint {
    pub fn mode(&self) -> FingerprintMode {
        match self {
            Fingerprint::Exact { .. } => FingerprintMode::Exact,
            Fingerprint::Proxy { .. } => FingerprintMode::Proxy,
        }
    }

    pub fn exact_from_digest(digest: &[u8]) -> Self {
        Fingerprint::Exact {
            digest: hex::encode(digest),
        }
    }

    /// Hex digest for exact fingerprints.
    pub fn digest(&self) -> Option<&str> {
        match self {
            Fingerprint::Exact { digest } => Some(digest),
            Fingerprint::Proxy { .. } => None,
        }
    }

    /// Build a proxy fingerprint from already-fetched metadata.
    pub fn from_metadata(metadata: &Metadata) -> io::Result<Self> {
        let (modified_secs, modified_nanos) = split_epoch(metadata.modified()?);
        Ok(Fingerprint::Proxy {
            size: metadata.len(),
            modified_secs,
            modified_nanos,
        })
    }

    /// Whether content described by `self` should be treated as different from `previous`.
    pub fn is_changed(&self, previous: &Fingerprint) -> bool { self != previous }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fingerprint::Exact { digest } => f.write_str(digest),
            Fingerprint::Proxy {
                size,
                modified_secs,
                modified_nanos,
            } => write!(f, "{size}-{modified_secs}.{modified_nanos:09}"),
        }
    }
}

/// Seconds and nanoseconds relative to the Unix epoch, floored so that the nanosecond part
/// is always non-negative.
fn split_epoch(time: SystemTime) -> (i64, u32) {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => (after.as_secs() as i64, after.subsec_nanos()),
        Err(e) => {
            let before = e.duration();
            let secs = before.as_secs() as i64;
            match before.subsec_nanos() {
                0 => (-secs, 0),
                nanos => (-secs - 1, 1_000_000_000 - nanos),
            }
        }
    }
}

/// Accumulates an exact fingerprint from chunks as they arrive, e.g. from a network body.
#[derive(Clone, Default)]
pub struct ExactAccumulator {
    hasher: Sha256Hasher,
    len:    u64,
}

impl ExactAccumulator {
    pub fn new() -> Self { Self::default() }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.len += chunk.len() as u64;
    }

    pub fn len(&self) -> u64 { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn finalize(self) -> Fingerprint { Fingerprint::exact_from_digest(&self.hasher.finalize()) }
}

pub fn fingerprint_bytes(data: &[u8]) -> Fingerprint {
    Fingerprint::exact_from_digest(&Sha256Hasher::digest(data))
}

/// Exact fingerprint of everything `reader` yields, read in bounded chunks.
pub fn fingerprint_reader<R: Read>(reader: R) -> io::Result<Fingerprint> {
    let mut reader = HashingReader::new(reader, Sha256Hasher::new());
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(Fingerprint::exact_from_digest(&reader.into_digest()))
}

/// Fingerprint the file at `path` using `mode`.
///
/// Exact mode streams the content; a read error part-way through (the file vanishing,
/// a device error) surfaces as [`VerifyError::Read`] and yields no fingerprint.
pub fn compute_fingerprint(path: impl AsRef<Path>, mode: FingerprintMode) -> Result<Fingerprint> {
    let path = path.as_ref();
    match mode {
        FingerprintMode::Exact => {
            let read_err = |source| VerifyError::Read {
                path: path.to_path_buf(),
                source,
            };
            let file = File::open(path).map_err(read_err)?;
            let fingerprint = fingerprint_reader(file).map_err(read_err)?;
            tracing::trace!(path = %path.display(), %fingerprint, "exact fingerprint");
            Ok(fingerprint)
        }
        FingerprintMode::Proxy => {
            let metadata_err = |source| VerifyError::Metadata {
                path: path.to_path_buf(),
                source,
            };
            let metadata = std::fs::metadata(path).map_err(metadata_err)?;
            Fingerprint::from_metadata(&metadata).map_err(metadata_err)
        }
    }
}

/// Recompute the fingerprint of `path` in the mode of `expected` and compare.
pub fn verify_file(path: impl AsRef<Path>, expected: &Fingerprint) -> Result<()> {
    let actual = compute_fingerprint(path, expected.mode())?;
    if &actual == expected {
        Ok(())
    } else {
        Err(VerifyError::Mismatch {
            expected: expected.to_string(),
            actual:   actual.to_string(),
        })
    }
}
