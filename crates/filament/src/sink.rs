use std::error::Error as StdError;
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use crate::{FileNode, NodeId};

pub type SinkError = Box<dyn StdError + Send + Sync>;

/// Receives every node the materializer creates.
pub trait NodeSink: Send + Sync {
    fn create(&self, node: FileNode) -> Result<(), SinkError>;
}

/// Produces node ids. The same seed must always yield the same id.
pub trait IdentitySource: Send + Sync {
    fn next_id(&self, seed: &str) -> NodeId;
}

/// Collects nodes in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    nodes: Mutex<Vec<FileNode>>,
}

impl MemorySink {
    pub fn new() -> Self { Self::default() }

    pub fn nodes(&self) -> Vec<FileNode> { self.nodes.lock().unwrap_or_else(PoisonError::into_inner).clone() }

    pub fn len(&self) -> usize { self.nodes.lock().unwrap_or_else(PoisonError::into_inner).len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl NodeSink for MemorySink {
    fn create(&self, node: FileNode) -> Result<(), SinkError> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner).push(node);
        Ok(())
    }
}

/// Name-based (v5) UUIDs under a fixed namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededIdentity {
    namespace: Uuid,
}

impl SeededIdentity {
    pub fn new(namespace: Uuid) -> Self { Self { namespace } }
}

impl Default for SeededIdentity {
    fn default() -> Self { Self::new(Uuid::NAMESPACE_URL) }
}

impl IdentitySource for SeededIdentity {
    fn next_id(&self, seed: &str) -> NodeId { Uuid::new_v5(&self.namespace, seed.as_bytes()).into() }
}
