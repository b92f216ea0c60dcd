//! Bounded, deduplicated HTTP acquisition into a content cache.
//!
//! # Key Features
//!
//! - **Deduplicated**: concurrent requests for the same resource share one transfer
//! - **Bounded**: a global semaphore caps active transfers
//! - **Stall-aware**: a transfer that stops producing bytes is abandoned and retried
//! - **Single-pass**: bodies are fingerprinted while streaming to disk
//! - **Atomic placement**: files appear under their final name only when complete
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use filament_fetch::{AcquisitionRequest, Coordinator, FetchConfig, ReqwestClient};
//! use filament_store::{ContentCache, MemoryStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig::load(None)?;
//! let cache = ContentCache::open("/tmp/filament", Arc::new(MemoryStore::new()), config.cache_options())?;
//! let coordinator = Coordinator::new(ReqwestClient::new(&config)?, cache, config);
//!
//! let acquired = coordinator
//!     .acquire(&AcquisitionRequest::new("https://example.com/logo.png"))
//!     .await?;
//! println!("{}", acquired.entry.local_path.display());
//! # Ok(())
//! # }
//! ```

mod config;
mod coordinator;
mod error;
mod http;
mod metrics;
mod request;
mod retry;

pub mod naming;
pub mod sniff;

pub use config::{ENV_PREFIX, FetchConfig};
pub use coordinator::{Acquired, Coordinator};
pub use error::{Error, ErrorKind, FailureReason, Result};
pub use http::{BoxStream, HttpClient, HttpRequest, HttpResponse, TransportError};
pub use metrics::{FetchMetrics, MetricsSnapshot};
pub use request::{AcquisitionRequest, Credentials};
pub use retry::{StatusClass, classify_status, retry_delay};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
