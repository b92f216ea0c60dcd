use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use filament_fetch::naming::sanitize;
use filament_fetch::sniff::sniff_extension;
use filament_fs::AtomicWriteOptions;
use filament_store::CacheKey;
use filament_verify::{Fingerprint, FingerprintMode, Sha256Hasher, compute_fingerprint};
use tracing::debug;

use crate::{Error, FileNode, IdentitySource, NodeId, NodeSink, Result};

/// Where a node's bytes came from; decides the id seed.
pub(crate) enum Origin<'a> {
    Remote { url: &'a str, key: &'a str },
    Buffer { digest: &'a str },
    Local,
}

/// Turns files on disk into [`FileNode`]s and hands them to the sink.
#[derive(Clone)]
pub struct Materializer {
    mode:        FingerprintMode,
    sink:        Arc<dyn NodeSink>,
    identity:    Arc<dyn IdentitySource>,
    buffers_dir: PathBuf,
}

impl Materializer {
    pub fn new(
        mode: FingerprintMode,
        sink: Arc<dyn NodeSink>,
        identity: Arc<dyn IdentitySource>,
        buffers_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mode,
            sink,
            identity,
            buffers_dir: buffers_dir.into(),
        }
    }

    pub fn mode(&self) -> FingerprintMode { self.mode }

    /// Describe an existing file. `source_url` is recorded on the node when given, and the
    /// node gets the same id an unnamed acquisition of that URL would.
    pub async fn materialize_path(
        &self,
        path: impl AsRef<Path>,
        parent: Option<NodeId>,
        source_url: Option<&str>,
    ) -> Result<FileNode> {
        let key = source_url.map(|url| CacheKey::derive(url, None, None));
        let origin = match (source_url, &key) {
            (Some(url), Some(key)) => Origin::Remote { url, key: key.as_str() },
            _ => Origin::Local,
        };
        self.materialize(path.as_ref(), parent, origin, None).await
    }

    /// Write `bytes` under the buffers directory and describe the result.
    ///
    /// Identical content lands on the same path; an identical file already there is reused.
    pub async fn materialize_from_buffer(
        &self,
        bytes: &[u8],
        name: Option<&str>,
        parent: Option<NodeId>,
    ) -> Result<FileNode> {
        let raw = Sha256Hasher::digest(bytes);
        let digest = hex::encode(&raw);
        let path = match name {
            Some(name) => self.buffers_dir.join(&digest).join(sanitize(name)),
            None => match sniff_extension(bytes) {
                Some(extension) => self.buffers_dir.join(format!("{digest}.{extension}")),
                None => self.buffers_dir.join(&digest),
            },
        };

        let existing = tokio::fs::metadata(&path).await.ok();
        if existing.is_some_and(|m| m.is_file() && m.len() == bytes.len() as u64) {
            debug!(path = %path.display(), "identical buffer already materialized");
        } else {
            let target = path.clone();
            let content = bytes.to_vec();
            tokio::task::spawn_blocking(move || {
                filament_fs::atomic_write(&target, &content, AtomicWriteOptions::new().sync(true))
            })
            .await??;
            debug!(path = %path.display(), size = bytes.len(), "buffer written");
        }

        let known = Fingerprint::exact_from_digest(&raw);
        self.materialize(&path, parent, Origin::Buffer { digest: &digest }, Some(known))
            .await
    }

    /// Build the node for `path`. `known` is an exact fingerprint already computed for the
    /// current content, reused instead of re-hashing.
    pub(crate) async fn materialize(
        &self,
        path: &Path,
        parent: Option<NodeId>,
        origin: Origin<'_>,
        known: Option<Fingerprint>,
    ) -> Result<FileNode> {
        let absolute_path = tokio::fs::canonicalize(path).await.map_err(|e| Error::io(path, e))?;
        let metadata = tokio::fs::metadata(&absolute_path)
            .await
            .map_err(|e| Error::io(&absolute_path, e))?;
        let modified = metadata.modified().map_err(|e| Error::io(&absolute_path, e))?;

        let fingerprint = match (self.mode, known) {
            (FingerprintMode::Exact, Some(known @ Fingerprint::Exact { .. })) => known,
            (FingerprintMode::Exact, _) => {
                let target = absolute_path.clone();
                tokio::task::spawn_blocking(move || compute_fingerprint(&target, FingerprintMode::Exact))
                    .await?
                    .map_err(|source| Error::Hash {
                        path: absolute_path.clone(),
                        source,
                    })?
            }
            (FingerprintMode::Proxy, _) => {
                Fingerprint::from_metadata(&metadata).map_err(|e| Error::io(&absolute_path, e))?
            }
        };

        let file_name = absolute_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (name, extension) = match absolute_path.extension() {
            Some(extension) => (
                absolute_path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                extension.to_string_lossy().into_owned(),
            ),
            None => (file_name, String::new()),
        };

        let (seed, source_url) = match origin {
            Origin::Remote { url, key } => (format!("remote:{key}"), Some(url.to_string())),
            Origin::Buffer { digest } => (format!("buffer:{digest}:{}", absolute_path.display()), None),
            Origin::Local => (format!("local:{}", absolute_path.display()), None),
        };

        let node = FileNode {
            id: self.identity.next_id(&seed),
            parent,
            absolute_path,
            name,
            extension,
            size: metadata.len(),
            modified: DateTime::<Utc>::from(modified),
            fingerprint,
            source_url,
        };

        self.sink.create(node.clone()).map_err(|source| Error::Sink {
            path: node.absolute_path.clone(),
            source,
        })?;
        debug!(id = %node.id, path = %node.absolute_path.display(), "node created");
        Ok(node)
    }
}
