use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use filament_verify::Fingerprint;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identity of a node in the host's graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<Uuid> for NodeId {
    fn from(id: Uuid) -> Self { Self(id.to_string()) }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self { Self(id.to_string()) }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self { Self(id) }
}

/// A materialized file as handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub id:            NodeId,
    pub parent:        Option<NodeId>,
    pub absolute_path: PathBuf,
    /// File name without extension.
    pub name:          String,
    /// Extension without the leading dot; empty when there is none.
    pub extension:     String,
    pub size:          u64,
    pub modified:      DateTime<Utc>,
    pub fingerprint:   Fingerprint,
    pub source_url:    Option<String>,
}

impl FileNode {
    /// `name.extension`, or just `name` when there is no extension.
    pub fn base(&self) -> String {
        if self.extension.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.extension)
        }
    }
}
