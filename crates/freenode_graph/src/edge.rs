// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge (connection) definitions for the graph.
//!
//! Edges refer to their endpoints by id only. The graph keeps them valid by
//! cascading node removal.

use crate::ids::{EdgeId, NodeId, PortId};
use serde::{Deserialize, Serialize};

/// A directed connection from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Unique edge ID
    pub id: EdgeId,
    /// Source node ID
    pub from_node: NodeId,
    /// Source port ID
    pub from_port: PortId,
    /// Target node ID
    pub to_node: NodeId,
    /// Target port ID
    pub to_port: PortId,
}

impl Edge {
    /// Create a new edge
    pub fn new(
        id: EdgeId,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Self {
        Self {
            id,
            from_node,
            from_port,
            to_node,
            to_port,
        }
    }

    /// Check if this edge involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }

    /// Check if this edge feeds the given input
    pub fn targets(&self, node_id: NodeId, port_id: PortId) -> bool {
        self.to_node == node_id && self.to_port == port_id
    }

    /// Check if this edge connects exactly these endpoints
    pub fn connects(
        &self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> bool {
        self.from_node == from_node
            && self.from_port == from_port
            && self.to_node == to_node
            && self.to_port == to_port
    }
}
