//! Acquire remote and in-memory files as fingerprinted file nodes.
//!
//! An [`Ingestor`] ties the pieces together:
//!
//! - [`filament_fetch::Coordinator`] downloads each remote resource at most once, under a
//!   global concurrency bound, with stall detection and retries
//! - [`filament_store::ContentCache`] remembers where every resource landed
//! - [`Materializer`] turns the resulting files into [`FileNode`]s and passes them to a
//!   host-provided [`NodeSink`]
//!
//! Node ids come from an [`IdentitySource`]; the default derives v5 UUIDs from stable seeds
//! so repeated runs produce the same ids.

mod error;
mod ingestor;
mod materializer;
mod node;
mod sink;

pub use error::{Error, Result};
pub use ingestor::{INDEX_DIR, Ingestor, IngestorBuilder};
pub use materializer::Materializer;
pub use node::{FileNode, NodeId};
pub use sink::{IdentitySource, MemorySink, NodeSink, SeededIdentity, SinkError};

pub use filament_fetch::{AcquisitionRequest, Credentials, ErrorKind, FetchConfig};
pub use filament_verify::{Fingerprint, FingerprintMode};

pub use filament_fetch as fetch;
pub use filament_store as store;
pub use filament_verify as verify;
