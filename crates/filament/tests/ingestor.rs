use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use filament::fetch::{HttpClient, HttpRequest, HttpResponse, TransportError};
use filament::store::MemoryStore;
use filament::verify::fingerprint_bytes;
use filament::{
    AcquisitionRequest, ErrorKind, FileNode, Fingerprint, FingerprintMode, IdentitySource, Ingestor, MemorySink,
    NodeId, NodeSink, SeededIdentity, SinkError,
};
use futures_util::stream;
use tempfile::TempDir;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D];

#[derive(Clone, Default)]
struct StaticClient {
    routes: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    calls:  Arc<AtomicUsize>,
}

impl StaticClient {
    fn route(self, url: &str, body: &[u8]) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), body.to_vec());
        self
    }

    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl HttpClient for StaticClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self.routes.lock().unwrap().get(&request.url).cloned();
        let (status, body) = match body {
            Some(body) => (200, body),
            None => (404, Vec::new()),
        };
        Ok(HttpResponse {
            status,
            etag: None,
            content_length: Some(body.len() as u64),
            body: Box::pin(stream::iter(vec![Ok::<_, TransportError>(Bytes::from(body))])),
        })
    }
}

struct RejectingSink;

impl NodeSink for RejectingSink {
    fn create(&self, _node: FileNode) -> Result<(), SinkError> { Err("sink is read-only".into()) }
}

fn ingestor(dir: &TempDir, client: StaticClient, sink: Arc<MemorySink>, mode: FingerprintMode) -> Ingestor<StaticClient> {
    Ingestor::builder(dir.path().join("cache"))
        .store(Arc::new(MemoryStore::new()))
        .sink(sink)
        .fingerprint_mode(mode)
        .build(client)
        .unwrap()
}

#[tokio::test]
async fn remote_file_becomes_a_node() {
    let dir = tempfile::tempdir().unwrap();
    let url = "https://example.com/assets/logo.png";
    let client = StaticClient::default().route(url, PNG);
    let sink = Arc::new(MemorySink::new());
    let ingestor = ingestor(&dir, client, sink.clone(), FingerprintMode::Exact);

    let request = AcquisitionRequest::new(url).parent("page-1");
    let key = request.cache_key();
    let node = ingestor.acquire_remote_file(request).await.unwrap();

    assert_eq!(node.name, "logo");
    assert_eq!(node.extension, "png");
    assert_eq!(node.base(), "logo.png");
    assert_eq!(node.size, PNG.len() as u64);
    assert_eq!(node.fingerprint, fingerprint_bytes(PNG));
    assert_eq!(node.source_url.as_deref(), Some(url));
    assert_eq!(node.parent, Some(NodeId::from("page-1")));
    assert!(node.absolute_path.is_absolute());
    assert_eq!(node.id, SeededIdentity::default().next_id(&format!("remote:{key}")));
    assert_eq!(sink.nodes(), vec![node]);
}

#[tokio::test]
async fn repeated_acquisition_reuses_the_download() {
    let dir = tempfile::tempdir().unwrap();
    let url = "https://example.com/data.json";
    let client = StaticClient::default().route(url, b"{}");
    let sink = Arc::new(MemorySink::new());
    let ingestor = ingestor(&dir, client.clone(), sink.clone(), FingerprintMode::Exact);

    let first = ingestor.acquire_remote_file(AcquisitionRequest::new(url)).await.unwrap();
    let second = ingestor.acquire_remote_file(AcquisitionRequest::new(url)).await.unwrap();

    assert_eq!(client.calls(), 1);
    assert_eq!(first.id, second.id);
    assert_eq!(first.absolute_path, second.absolute_path);
    assert_eq!(sink.len(), 2);
}

#[tokio::test]
async fn known_remote_path_keeps_the_acquisition_id() {
    let dir = tempfile::tempdir().unwrap();
    let url = "https://example.com/assets/logo.png";
    let client = StaticClient::default().route(url, PNG);
    let sink = Arc::new(MemorySink::new());
    let ingestor = ingestor(&dir, client, sink, FingerprintMode::Exact);

    let acquired = ingestor.acquire_remote_file(AcquisitionRequest::new(url)).await.unwrap();
    let described = ingestor
        .materializer()
        .materialize_path(&acquired.absolute_path, None, Some(url))
        .await
        .unwrap();

    assert_eq!(described.id, acquired.id);
    assert_eq!(described.source_url.as_deref(), Some(url));
    assert_eq!(described.fingerprint, acquired.fingerprint);
}

#[tokio::test]
async fn failed_acquisition_creates_no_node() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let ingestor = ingestor(&dir, StaticClient::default(), sink.clone(), FingerprintMode::Exact);

    let error = ingestor
        .acquire_remote_file(AcquisitionRequest::new("https://example.com/missing"))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Network);
    assert_eq!(error.url(), Some("https://example.com/missing"));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn unnamed_buffer_is_stored_by_digest_with_sniffed_extension() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let ingestor = ingestor(&dir, StaticClient::default(), sink.clone(), FingerprintMode::Exact);

    let first = ingestor.materialize_from_buffer(PNG, None, None).await.unwrap();
    let modified = std::fs::metadata(&first.absolute_path).unwrap().modified().unwrap();
    let second = ingestor.materialize_from_buffer(PNG, None, None).await.unwrap();

    let digest = fingerprint_bytes(PNG).digest().unwrap().to_string();
    assert_eq!(file_name(&first.absolute_path), format!("{digest}.png"));
    assert_eq!(first.absolute_path, second.absolute_path);
    assert_eq!(std::fs::metadata(&second.absolute_path).unwrap().modified().unwrap(), modified);
    assert_eq!(first.fingerprint, fingerprint_bytes(PNG));
    assert!(first.source_url.is_none());
    assert_eq!(sink.len(), 2);
}

#[tokio::test]
async fn named_buffer_lands_under_digest_directory() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let ingestor = ingestor(&dir, StaticClient::default(), sink, FingerprintMode::Exact);

    let node = ingestor
        .materialize_from_buffer(b"hello", Some("greeting.txt"), Some(NodeId::from("parent")))
        .await
        .unwrap();

    let digest = fingerprint_bytes(b"hello").digest().unwrap().to_string();
    assert_eq!(file_name(&node.absolute_path), "greeting.txt");
    assert_eq!(file_name(node.absolute_path.parent().unwrap()), digest);
    assert_eq!(node.name, "greeting");
    assert_eq!(node.extension, "txt");
    assert_eq!(node.parent, Some(NodeId::from("parent")));
    assert_eq!(std::fs::read(&node.absolute_path).unwrap(), b"hello");
}

#[tokio::test]
async fn local_file_in_proxy_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.md");
    std::fs::write(&path, b"# notes").unwrap();
    let sink = Arc::new(MemorySink::new());
    let ingestor = ingestor(&dir, StaticClient::default(), sink, FingerprintMode::Proxy);

    let node = ingestor.materialize_local(&path, None).await.unwrap();

    assert_eq!(ingestor.fingerprint_mode(), FingerprintMode::Proxy);
    assert!(matches!(node.fingerprint, Fingerprint::Proxy { size: 7, .. }));
    assert_eq!(node.size, 7);
}

#[tokio::test]
async fn local_file_in_exact_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.md");
    std::fs::write(&path, b"# notes").unwrap();
    let sink = Arc::new(MemorySink::new());
    let ingestor = ingestor(&dir, StaticClient::default(), sink, FingerprintMode::Exact);

    let node = ingestor.materialize_local(&path, None).await.unwrap();
    assert_eq!(node.fingerprint, fingerprint_bytes(b"# notes"));
}

#[tokio::test]
async fn missing_local_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let ingestor = ingestor(&dir, StaticClient::default(), sink, FingerprintMode::Exact);

    let error = ingestor
        .materialize_local(dir.path().join("absent.txt"), None)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Io);
}

#[tokio::test]
async fn sink_rejection_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let ingestor = Ingestor::builder(dir.path().join("cache"))
        .store(Arc::new(MemoryStore::new()))
        .sink(Arc::new(RejectingSink))
        .build(StaticClient::default())
        .unwrap();

    let error = ingestor.materialize_from_buffer(b"x", None, None).await.unwrap_err();
    assert!(matches!(error, filament::Error::Sink { .. }));
    assert!(error.path().is_some());
}

#[tokio::test]
async fn default_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("cache");
    let url = "https://example.com/persist.txt";

    {
        let client = StaticClient::default().route(url, b"kept");
        let ingestor = Ingestor::builder(&root).build(client).unwrap();
        ingestor.acquire_remote_file(AcquisitionRequest::new(url)).await.unwrap();
    }

    let offline = StaticClient::default();
    let ingestor = Ingestor::builder(&root).build(offline.clone()).unwrap();
    let node = ingestor.acquire_remote_file(AcquisitionRequest::new(url)).await.unwrap();

    assert_eq!(offline.calls(), 0);
    assert_eq!(std::fs::read(&node.absolute_path).unwrap(), b"kept");
    assert!(root.join(filament::INDEX_DIR).exists());
}

fn file_name(path: &Path) -> String { path.file_name().unwrap().to_string_lossy().into_owned() }
