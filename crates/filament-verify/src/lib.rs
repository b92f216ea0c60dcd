//! Content fingerprints for deciding whether a file changed between builds.
//!
//! Two strategies are offered:
//!
//! - [`FingerprintMode::Exact`]: SHA-256 over the content, streamed in bounded chunks so
//!   arbitrarily large files hash in constant memory. Chunk boundaries never affect the result.
//! - [`FingerprintMode::Proxy`]: byte length plus modification time, read from metadata only.
//!   Cheap, but content rewritten in place with the same size and timestamp is reported as
//!   unchanged. Callers opt into that trade-off explicitly.
//!
//! # Example
//!
//! ```
//! use filament_verify::{ExactAccumulator, fingerprint_bytes};
//!
//! let mut acc = ExactAccumulator::new();
//! acc.update(b"hello ");
//! acc.update(b"world");
//!
//! assert_eq!(acc.finalize(), fingerprint_bytes(b"hello world"));
//! ```

pub use self::error::{Result, VerifyError};
pub use self::fingerprint::{
    ExactAccumulator, Fingerprint, FingerprintMode, compute_fingerprint, fingerprint_bytes,
    fingerprint_reader, verify_file,
};
pub use self::hasher::{Hasher, Sha256Hasher};
pub use self::reader::HashingReader;

mod error;
mod fingerprint;
mod hasher;
mod reader;
