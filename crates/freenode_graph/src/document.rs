// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serialized graph document.
//!
//! ```text
//! {
//!   nodes: [ { id, type, title, x, y, w, h, inputs, outputs, state } ],
//!   edges: [ { id, fromNode, fromPort, toNode, toPort } ]
//! }
//! ```
//!
//! Behaviors are not part of the document; they are looked up in the
//! registry by type name when the document is loaded.

use crate::edge::Edge;
use crate::error::DocumentError;
use crate::ids::NodeId;
use crate::node::{Node, NodeState};
use crate::port::Port;
use serde::{Deserialize, Serialize};

/// One node as stored in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node id
    pub id: NodeId,
    /// Type name
    #[serde(rename = "type")]
    pub node_type: String,
    /// Display title
    pub title: String,
    /// World x
    pub x: f32,
    /// World y
    pub y: f32,
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
    /// Input ports
    #[serde(default)]
    pub inputs: Vec<Port>,
    /// Output ports
    #[serde(default)]
    pub outputs: Vec<Port>,
    /// Behavior state
    #[serde(default)]
    pub state: NodeState,
}

impl NodeRecord {
    /// Rebuild the node this record describes
    pub fn to_node(&self) -> Node {
        Node {
            id: self.id,
            node_type: self.node_type.clone(),
            title: self.title.clone(),
            position: [self.x, self.y],
            size: [self.w, self.h],
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            state: self.state.clone(),
        }
    }
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            node_type: node.node_type.clone(),
            title: node.title.clone(),
            x: node.position[0],
            y: node.position[1],
            w: node.size[0],
            h: node.size[1],
            inputs: node.inputs.clone(),
            outputs: node.outputs.clone(),
            state: node.state.clone(),
        }
    }
}

/// The persisted/exported form of a graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Nodes, in insertion order
    pub nodes: Vec<NodeRecord>,
    /// Edges, in insertion order
    pub edges: Vec<Edge>,
    /// Fields added by `graph:serialize` observers
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl GraphDocument {
    /// Encode as compact JSON
    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encode as indented JSON
    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a document from a file
    pub fn load(path: &std::path::Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Write a document to a file
    pub fn save(&self, path: &std::path::Path) -> Result<(), DocumentError> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}
