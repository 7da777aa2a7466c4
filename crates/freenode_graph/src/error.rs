// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types shared across the graph core.

use crate::ids::{EdgeId, NodeId, PortId};

/// Error registering node types
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A type with this name is already registered
    #[error("Node type already registered: {0}")]
    DuplicateType(String),
}

/// Error mutating or querying the graph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// No type with this name is registered
    #[error("Unknown node type: {0}")]
    UnknownType(String),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port not found on the given node
    #[error("Port not found: {0}")]
    PortNotFound(PortId),

    /// Edge not found
    #[error("Edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// A node with this id already exists
    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),
}

/// Error loading or encoding a graph document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// JSON encoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing the document file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document references something the graph cannot resolve
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Two nodes share an id
    #[error("Duplicate node id in document: {0}")]
    DuplicateNode(NodeId),

    /// An edge points at a node or port that the document does not contain
    #[error("Edge {0} references a missing node or port")]
    DanglingReference(EdgeId),
}

/// Error executing or reverting a command
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The graph rejected the mutation
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// A node's execution behavior failed during a cycle.
///
/// Never propagated to the caller of `step`; delivered through the `error`
/// notification instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Node {node} ({node_type}) failed: {message}")]
pub struct NodeExecutionError {
    /// The failing node
    pub node: NodeId,
    /// Its type name
    pub node_type: String,
    /// What went wrong
    pub message: String,
}

/// Error loading or saving editor configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid RON for the settings tree
    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Encoding the settings failed
    #[error("RON encode error: {0}")]
    Encode(#[from] ron::Error),

    /// Written by a newer version of the editor
    #[error("Config version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build understands
        supported: u32,
    },
}
