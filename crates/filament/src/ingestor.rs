use std::path::{Path, PathBuf};
use std::sync::Arc;

use filament_fetch::{AcquisitionRequest, Coordinator, FetchConfig, HttpClient, MetricsSnapshot};
use filament_store::{CacheStore, ContentCache, SledStore};
use filament_verify::FingerprintMode;
use tracing::info;

use crate::materializer::{Materializer, Origin};
use crate::{FileNode, IdentitySource, MemorySink, NodeId, NodeSink, Result, SeededIdentity};

/// Directory under the cache root holding the sled index.
pub const INDEX_DIR: &str = "index";

/// Entry point for hosts: remote URLs, buffers and local paths in, [`FileNode`]s out.
///
/// # Examples
///
/// ```no_run
/// use filament::{AcquisitionRequest, Ingestor};
///
/// # async fn run() -> filament::Result<()> {
/// let ingestor = Ingestor::builder("/var/cache/filament").build_default()?;
/// let node = ingestor
///     .acquire_remote_file(AcquisitionRequest::new("https://example.com/logo.png"))
///     .await?;
/// println!("{} -> {}", node.id, node.absolute_path.display());
/// # Ok(())
/// # }
/// ```
pub struct Ingestor<C> {
    coordinator:  Coordinator<C>,
    materializer: Materializer,
}

impl Ingestor<()> {
    pub fn builder(root: impl Into<PathBuf>) -> IngestorBuilder { IngestorBuilder::new(root) }
}

impl<C: HttpClient> Ingestor<C> {
    /// Download (or reuse) the file behind `request` and create its node.
    pub async fn acquire_remote_file(&self, request: AcquisitionRequest) -> Result<FileNode> {
        let acquired = self.coordinator.acquire(&request).await?;
        let entry = acquired.entry;
        let parent = request.parent_id().map(NodeId::from);
        let origin = Origin::Remote {
            url: &entry.url,
            key: entry.key.as_str(),
        };
        self.materializer
            .materialize(&entry.local_path, parent, origin, Some(entry.fingerprint.clone()))
            .await
    }

    pub async fn materialize_from_buffer(
        &self,
        bytes: &[u8],
        name: Option<&str>,
        parent: Option<NodeId>,
    ) -> Result<FileNode> {
        self.materializer.materialize_from_buffer(bytes, name, parent).await
    }

    /// Create a node for a file that already exists on disk.
    pub async fn materialize_local(&self, path: impl AsRef<Path>, parent: Option<NodeId>) -> Result<FileNode> {
        self.materializer
            .materialize(path.as_ref(), parent, Origin::Local, None)
            .await
    }

    pub fn cache(&self) -> &ContentCache { self.coordinator.cache() }

    pub fn coordinator(&self) -> &Coordinator<C> { &self.coordinator }

    pub fn materializer(&self) -> &Materializer { &self.materializer }

    pub fn fingerprint_mode(&self) -> FingerprintMode { self.materializer.mode() }

    pub fn metrics(&self) -> MetricsSnapshot { self.coordinator.metrics() }
}

pub struct IngestorBuilder {
    root:     PathBuf,
    config:   FetchConfig,
    mode:     FingerprintMode,
    store:    Option<Arc<dyn CacheStore>>,
    sink:     Option<Arc<dyn NodeSink>>,
    identity: Option<Arc<dyn IdentitySource>>,
}

impl IngestorBuilder {
    fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root:     root.into(),
            config:   FetchConfig::default(),
            mode:     FingerprintMode::default(),
            store:    None,
            sink:     None,
            identity: None,
        }
    }

    #[must_use]
    pub fn config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn fingerprint_mode(mut self, mode: FingerprintMode) -> Self {
        self.mode = mode;
        self
    }

    /// Entry persistence. Defaults to a [`SledStore`] under `<root>/index`.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Node destination. Defaults to a [`MemorySink`].
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn NodeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Node id source. Defaults to [`SeededIdentity`].
    #[must_use]
    pub fn identity(mut self, identity: Arc<dyn IdentitySource>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn build<C: HttpClient>(self, client: C) -> Result<Ingestor<C>> {
        let store: Arc<dyn CacheStore> = match self.store {
            Some(store) => store,
            None => Arc::new(SledStore::open(self.root.join(INDEX_DIR))?),
        };
        let cache = ContentCache::open(self.root.clone(), store, self.config.cache_options())?;
        let materializer = Materializer::new(
            self.mode,
            self.sink.unwrap_or_else(|| Arc::new(MemorySink::new())),
            self.identity.unwrap_or_else(|| Arc::new(SeededIdentity::default())),
            cache.buffers_dir(),
        );
        info!(root = %self.root.display(), mode = %self.mode, "ingestor ready");

        Ok(Ingestor {
            coordinator: Coordinator::new(client, cache, self.config),
            materializer,
        })
    }

    /// Build with the production HTTP client.
    #[cfg(feature = "reqwest")]
    pub fn build_default(self) -> Result<Ingestor<filament_fetch::ReqwestClient>> {
        let client = filament_fetch::ReqwestClient::new(&self.config)?;
        self.build(client)
    }
}
