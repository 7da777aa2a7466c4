// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes, edges and port values.
//!
//! Nodes and edges live in insertion-ordered maps. Edges refer to nodes by id,
//! so every removal path cascades: once a node is gone, no edge mentions it.

use crate::buffer::ValueBuffers;
use crate::document::{GraphDocument, NodeRecord};
use crate::edge::Edge;
use crate::error::{DocumentError, GraphError};
use crate::events::{GraphEvent, Hooks};
use crate::ids::{EdgeId, IdGenerator, NodeId, PortId, RandomIds};
use crate::node::{Node, NodeRegistry, NodeState};
use crate::port::{Port, PortDirection, PortValue};
use crate::runner::ExecutionContext;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Smallest width and height a node may be given
pub const MIN_NODE_SIZE: [f32; 2] = [80.0, 40.0];

/// Optional replacements for the values a node type would give a new node
#[derive(Debug, Clone, Default)]
pub struct NodeOverrides {
    /// Use this id instead of minting one
    pub id: Option<NodeId>,
    /// Display title
    pub title: Option<String>,
    /// World position
    pub position: Option<[f32; 2]>,
    /// Size
    pub size: Option<[f32; 2]>,
}

impl NodeOverrides {
    /// Place the node at a world position
    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Some([x, y]);
        self
    }

    /// Give the node an explicit size
    pub fn sized(mut self, width: f32, height: f32) -> Self {
        self.size = Some([width, height]);
        self
    }

    /// Give the node an explicit id
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    /// Give the node a custom title
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A node taken out of the graph together with everything needed to put it back
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    /// Position of the node in insertion order
    pub index: usize,
    /// The node itself
    pub node: Node,
    /// Incident edges with their insertion-order positions, ascending
    pub edges: Vec<(usize, Edge)>,
}

/// A dataflow graph
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    values: ValueBuffers,
    hooks: Hooks,
    ids: Arc<dyn IdGenerator>,
    min_node_size: [f32; 2],
}

impl Graph {
    /// Create a new empty graph with random ids
    pub fn new(hooks: Hooks) -> Self {
        Self::with_id_generator(hooks, Arc::new(RandomIds))
    }

    /// Create a new empty graph drawing ids from `ids`
    pub fn with_id_generator(hooks: Hooks, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            values: ValueBuffers::new(),
            hooks,
            ids,
            min_node_size: MIN_NODE_SIZE,
        }
    }

    /// Override the minimum node size
    pub fn with_min_node_size(mut self, min: [f32; 2]) -> Self {
        self.min_node_size = min;
        self
    }

    /// The notification bus this graph emits on
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// The id service this graph mints from
    pub fn id_generator(&self) -> &Arc<dyn IdGenerator> {
        &self.ids
    }

    /// Minimum node size enforced by [`Graph::set_node_size`]
    pub fn min_node_size(&self) -> [f32; 2] {
        self.min_node_size
    }

    fn floor_size(&self, size: [f32; 2]) -> [f32; 2] {
        [
            size[0].max(self.min_node_size[0]),
            size[1].max(self.min_node_size[1]),
        ]
    }

    /// Create a node of a registered type and add it to the graph
    pub fn add_node(
        &mut self,
        registry: &NodeRegistry,
        type_name: &str,
        overrides: NodeOverrides,
    ) -> Result<NodeId, GraphError> {
        let def = registry.lookup(type_name)?;
        let id = overrides.id.unwrap_or_else(|| self.ids.node_id());
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }

        let ids = self.ids.as_ref();
        let mut node = Node {
            id,
            node_type: type_name.to_string(),
            title: overrides.title.unwrap_or_else(|| def.title.clone()),
            position: overrides.position.unwrap_or([0.0, 0.0]),
            size: self.floor_size(overrides.size.unwrap_or(def.size)),
            inputs: def
                .inputs
                .iter()
                .map(|spec| Port::from_spec(spec, PortDirection::Input, ids))
                .collect(),
            outputs: def
                .outputs
                .iter()
                .map(|spec| Port::from_spec(spec, PortDirection::Output, ids))
                .collect(),
            state: NodeState::new(),
        };
        def.behavior.on_create(&mut node.state);

        tracing::debug!(node = %id, node_type = type_name, "added node");
        self.nodes.insert(id, node);
        if let Some(node) = self.nodes.get(&id) {
            self.hooks.emit(&mut GraphEvent::NodeCreate(node));
        }
        Ok(id)
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.take_node(node_id).map(|removed| removed.node)
    }

    /// Remove a node and its edges, keeping their positions for [`Graph::restore_node`]
    pub fn take_node(&mut self, node_id: NodeId) -> Option<RemovedNode> {
        let index = self.nodes.get_index_of(&node_id)?;

        let incident: Vec<usize> = self
            .edges
            .values()
            .enumerate()
            .filter(|(_, e)| e.involves_node(node_id))
            .map(|(i, _)| i)
            .collect();

        // Remove back to front so the recorded indices stay valid.
        let mut edges = Vec::with_capacity(incident.len());
        for &i in incident.iter().rev() {
            if let Some((_, edge)) = self.edges.shift_remove_index(i) {
                self.hooks.emit(&mut GraphEvent::EdgeDelete(&edge));
                edges.push((i, edge));
            }
        }
        edges.reverse();

        let (_, node) = self.nodes.shift_remove_index(index)?;
        self.values.forget_node(node_id);
        tracing::debug!(node = %node_id, edges = edges.len(), "removed node");

        Some(RemovedNode { index, node, edges })
    }

    /// Put back a node removed with [`Graph::take_node`], with its edges
    pub fn restore_node(&mut self, removed: RemovedNode) {
        let RemovedNode { index, node, edges } = removed;
        let id = node.id;

        let at = index.min(self.nodes.len());
        self.nodes.shift_insert(at, id, node);
        if let Some(node) = self.nodes.get(&id) {
            self.hooks.emit(&mut GraphEvent::NodeCreate(node));
        }

        for (index, edge) in edges {
            self.restore_edge(index, edge);
        }
        tracing::debug!(node = %id, "restored node");
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get the node at an insertion-order position
    pub fn node_at_index(&self, index: usize) -> Option<&Node> {
        self.nodes.get_index(index).map(|(_, node)| node)
    }

    /// Get all nodes, in insertion order
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs, in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Move a node to a world position
    pub fn set_node_position(&mut self, node_id: NodeId, position: [f32; 2]) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.position = position;
        self.hooks.emit(&mut GraphEvent::NodeMove(node));
        Ok(())
    }

    /// Resize a node, never below the minimum size. Returns the applied size.
    pub fn set_node_size(&mut self, node_id: NodeId, size: [f32; 2]) -> Result<[f32; 2], GraphError> {
        let size = self.floor_size(size);
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.size = size;
        self.hooks.emit(&mut GraphEvent::NodeResize(node));
        Ok(size)
    }

    /// Add an edge between two existing ports.
    ///
    /// Port direction and datatype are not checked here; that is the
    /// controller's job at gesture time.
    pub fn add_edge(
        &mut self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Result<EdgeId, GraphError> {
        self.require_port(from_node, from_port)?;
        self.require_port(to_node, to_port)?;

        let edge = Edge::new(self.ids.edge_id(), from_node, from_port, to_node, to_port);
        let id = edge.id;
        tracing::debug!(edge = %id, from = %from_node, to = %to_node, "added edge");
        self.edges.insert(id, edge);
        if let Some(edge) = self.edges.get(&id) {
            self.hooks.emit(&mut GraphEvent::EdgeCreate(edge));
        }
        Ok(id)
    }

    fn require_port(&self, node_id: NodeId, port_id: PortId) -> Result<(), GraphError> {
        let node = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        node.port(port_id)
            .map(|_| ())
            .ok_or(GraphError::PortNotFound(port_id))
    }

    /// Remove an edge
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> Option<Edge> {
        self.take_edge(edge_id).map(|(_, edge)| edge)
    }

    /// Remove an edge, returning its insertion-order position as well
    pub fn take_edge(&mut self, edge_id: EdgeId) -> Option<(usize, Edge)> {
        let (index, _, edge) = self.edges.shift_remove_full(&edge_id)?;
        tracing::debug!(edge = %edge_id, "removed edge");
        self.hooks.emit(&mut GraphEvent::EdgeDelete(&edge));
        Some((index, edge))
    }

    /// Reinsert an edge at an insertion-order position, keeping its id.
    ///
    /// Edges whose endpoints no longer exist are dropped.
    pub fn restore_edge(&mut self, index: usize, edge: Edge) -> bool {
        if self.require_port(edge.from_node, edge.from_port).is_err()
            || self.require_port(edge.to_node, edge.to_port).is_err()
        {
            tracing::warn!(edge = %edge.id, "not restoring edge with missing endpoint");
            return false;
        }
        let id = edge.id;
        let at = index.min(self.edges.len());
        self.edges.shift_insert(at, id, edge);
        if let Some(edge) = self.edges.get(&id) {
            self.hooks.emit(&mut GraphEvent::EdgeCreate(edge));
        }
        true
    }

    /// Get an edge by ID
    pub fn edge(&self, edge_id: EdgeId) -> Option<&Edge> {
        self.edges.get(&edge_id)
    }

    /// Get all edges, in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Get edges involving a node
    pub fn edges_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |e| e.involves_node(node_id))
    }

    /// First edge, in insertion order, feeding an input port
    pub fn incoming_edge(&self, node_id: NodeId, port_id: PortId) -> Option<&Edge> {
        self.edges.values().find(|e| e.targets(node_id, port_id))
    }

    /// Find an edge by its endpoints
    pub fn find_edge(
        &self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Option<EdgeId> {
        self.edges
            .values()
            .find(|e| e.connects(from_node, from_port, to_node, to_port))
            .map(|e| e.id)
    }

    /// Write a value to the next buffer
    pub fn set_output(&mut self, node_id: NodeId, port_id: PortId, value: PortValue) {
        self.values.write((node_id, port_id), value);
    }

    /// Read the previous cycle's value feeding an input port
    pub fn get_input(&self, node_id: NodeId, port_id: PortId) -> Option<&PortValue> {
        read_input(&self.edges, &self.values, node_id, port_id)
    }

    /// Promote the next buffer to current and clear the new next buffer
    pub fn swap_buffers(&mut self) {
        self.values.swap();
    }

    /// The port value buffers
    pub fn values(&self) -> &ValueBuffers {
        &self.values
    }

    /// Split a node into its state and an execution context over the buffers
    pub(crate) fn execution_parts(
        &mut self,
        node_id: NodeId,
        dt: f32,
    ) -> Option<(&mut NodeState, ExecutionContext<'_>)> {
        let node = self.nodes.get_mut(&node_id)?;
        let Node {
            id,
            node_type,
            inputs,
            outputs,
            state,
            ..
        } = node;
        let ctx = ExecutionContext::new(
            *id,
            node_type.as_str(),
            inputs.as_slice(),
            outputs.as_slice(),
            &self.edges,
            &mut self.values,
            dt,
        );
        Some((state, ctx))
    }

    /// Drop all nodes, edges and values
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.values.clear();
    }

    /// Build the serialized form, letting `graph:serialize` observers amend it
    pub fn to_document(&self) -> GraphDocument {
        let mut document = GraphDocument {
            nodes: self.nodes.values().map(NodeRecord::from).collect(),
            edges: self.edges.values().cloned().collect(),
            extra: serde_json::Map::new(),
        };
        self.hooks.emit(&mut GraphEvent::GraphSerialize(&mut document));
        document
    }

    /// Rebuild a graph from its serialized form.
    ///
    /// Every node type must be registered. Ids, ports, geometry and state are
    /// taken verbatim; on-create hooks do not run.
    pub fn from_document(
        document: &GraphDocument,
        registry: &NodeRegistry,
        hooks: Hooks,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, DocumentError> {
        let mut graph = Self::with_id_generator(hooks, ids);

        for record in &document.nodes {
            registry.lookup(&record.node_type)?;
            let node = record.to_node();
            if graph.nodes.insert(node.id, node).is_some() {
                return Err(DocumentError::DuplicateNode(record.id));
            }
        }

        let mut seen = HashSet::new();
        for edge in &document.edges {
            if graph.require_port(edge.from_node, edge.from_port).is_err()
                || graph.require_port(edge.to_node, edge.to_port).is_err()
                || !seen.insert(edge.id)
            {
                return Err(DocumentError::DanglingReference(edge.id));
            }
            graph.edges.insert(edge.id, edge.clone());
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "loaded graph document"
        );
        Ok(graph)
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes)
            .field("edges", &self.edges)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

/// Resolve an input: the first edge targeting it, read from the current buffer
pub(crate) fn read_input<'a>(
    edges: &IndexMap<EdgeId, Edge>,
    values: &'a ValueBuffers,
    node_id: NodeId,
    port_id: PortId,
) -> Option<&'a PortValue> {
    let edge = edges.values().find(|e| e.targets(node_id, port_id))?;
    values.read(&(edge.from_node, edge.from_port))
}
