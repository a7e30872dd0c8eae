// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph documents: saving and loading a node system.
//!
//! A document lists the nodes in insertion order, each tagged with its type
//! discriminator, and the connections as `"<node>x<port>-<node>x<port>"`
//! strings. Loading is tolerant: entries that cannot be restored are dropped
//! and reported, and only a document that is not valid JSON fails as a whole.

use crate::connection::{Connection, ParseConnectionError};
use crate::graph::{ConnectionError, NodeSystem};
use crate::node::{NodeId, NodeRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serialized form of a whole node system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Nodes in insertion order
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Connection strings in creation order
    #[serde(default)]
    pub connections: Vec<String>,
}

/// Serialized form of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node ID
    pub id: u32,
    /// Type discriminator
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific fields
    #[serde(default)]
    pub fields: serde_json::Value,
}

/// Why a document entry was not restored
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DropReason {
    /// No registered kind has this discriminator
    #[error("unknown node type '{0}'")]
    UnknownKind(String),

    /// The kind rejected the stored fields
    #[error("invalid fields: {0}")]
    InvalidFields(String),

    /// Another node already uses the ID
    #[error("duplicate node id")]
    DuplicateId,

    /// The connection string is malformed
    #[error(transparent)]
    Malformed(#[from] ParseConnectionError),

    /// The connection does not resolve or breaks a structural rule
    #[error(transparent)]
    Invalid(#[from] ConnectionError),
}

/// Node entry dropped while loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedNode {
    /// ID from the document
    pub id: u32,
    /// Discriminator from the document
    pub kind: String,
    /// Why it was dropped
    pub reason: DropReason,
}

/// Connection entry dropped while loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedConnection {
    /// Connection string from the document
    pub text: String,
    /// Why it was dropped
    pub reason: DropReason,
}

/// What was skipped while loading a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Dropped node entries, in document order
    pub dropped_nodes: Vec<DroppedNode>,
    /// Dropped connection entries, in document order
    pub dropped_connections: Vec<DroppedConnection>,
}

impl LoadReport {
    /// Whether every entry was restored
    pub fn is_clean(&self) -> bool {
        self.dropped_nodes.is_empty() && self.dropped_connections.is_empty()
    }
}

/// Error when a document cannot be read or written at all
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Invalid JSON or unexpected document shape
    #[error("Invalid graph document: {0}")]
    Json(#[from] serde_json::Error),

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for document operations
pub type Result<T> = std::result::Result<T, DocumentError>;

impl NodeSystem {
    /// Serialize into a document, preserving node and connection order
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            nodes: self
                .nodes()
                .map(|node| NodeRecord {
                    id: node.id().0,
                    kind: node.kind().to_string(),
                    fields: node.behavior().save_fields(),
                })
                .collect(),
            connections: self.connections().iter().map(ToString::to_string).collect(),
        }
    }

    /// Rebuild a system from a document.
    ///
    /// Nodes are created through `registry`; anything that cannot be
    /// restored is logged and listed in the returned report.
    pub fn from_document(document: GraphDocument, registry: &NodeRegistry) -> (Self, LoadReport) {
        let mut system = NodeSystem::new();
        let mut report = LoadReport::default();

        for record in document.nodes {
            let reason = match registry.create_with_fields(&record.kind, record.fields) {
                None => DropReason::UnknownKind(record.kind.clone()),
                Some(Err(e)) => DropReason::InvalidFields(e.to_string()),
                Some(Ok(behavior)) => match system.insert_node(NodeId(record.id), behavior) {
                    Ok(()) => continue,
                    Err(_) => DropReason::DuplicateId,
                },
            };
            tracing::warn!("Dropping node {} ({}): {}", record.id, record.kind, reason);
            report.dropped_nodes.push(DroppedNode {
                id: record.id,
                kind: record.kind,
                reason,
            });
        }

        for text in document.connections {
            let restored = text
                .parse::<Connection>()
                .map_err(DropReason::from)
                .and_then(|c| system.push_connection(c).map_err(DropReason::from));
            if let Err(reason) = restored {
                tracing::warn!("Dropping connection '{}': {}", text, reason);
                report.dropped_connections.push(DroppedConnection { text, reason });
            }
        }

        tracing::debug!(
            "Loaded {} node(s) and {} connection(s)",
            system.node_count(),
            system.connection_count()
        );
        (system, report)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// Parse JSON and rebuild a system
    pub fn from_json(json: &str, registry: &NodeRegistry) -> Result<(Self, LoadReport)> {
        let document: GraphDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(document, registry))
    }

    /// Load a graph document from a file
    pub fn load(path: &Path, registry: &NodeRegistry) -> Result<(Self, LoadReport)> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content, registry)
    }

    /// Save the graph document to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
