// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions, node type behaviors and the type registry.

use crate::error::{GraphError, RegistryError};
use crate::ids::{NodeId, PortId};
use crate::port::{Port, PortDirection, PortSpec};
use crate::runner::ExecutionContext;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Fallback node size when a type does not specify one
pub const DEFAULT_NODE_SIZE: [f32; 2] = [160.0, 60.0];

/// Open-ended state bag owned by a node's behavior
pub type NodeState = serde_json::Map<String, serde_json::Value>;

/// Result of a behavior's execution step
pub type BehaviorResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Behavior attached to a node type.
///
/// All methods are optional. Behaviors only ever see their own node's state,
/// so one node type cannot interfere with another node's data.
pub trait NodeBehavior: Send + Sync {
    /// Initialize the state of a freshly created node
    fn on_create(&self, _state: &mut NodeState) {}

    /// Compute outputs from inputs, possibly mutating state
    fn on_execute(&self, _state: &mut NodeState, _ctx: &mut ExecutionContext<'_>) -> BehaviorResult {
        Ok(())
    }

    /// Paint custom content inside the node's screen rectangle
    fn on_draw(&self, _node: &Node, _painter: &egui::Painter, _screen_rect: egui::Rect) {}
}

/// Behavior that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct Inert;

impl NodeBehavior for Inert {}

/// Node type definition
#[derive(Clone)]
pub struct NodeType {
    /// Display title given to new nodes
    pub title: String,
    /// Default size of new nodes
    pub size: [f32; 2],
    /// Input port templates, in order
    pub inputs: Vec<PortSpec>,
    /// Output port templates, in order
    pub outputs: Vec<PortSpec>,
    /// Attached behavior
    pub behavior: Arc<dyn NodeBehavior>,
}

impl NodeType {
    /// Create a type with no ports and no behavior
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            size: DEFAULT_NODE_SIZE,
            inputs: Vec::new(),
            outputs: Vec::new(),
            behavior: Arc::new(Inert),
        }
    }

    /// Set the default size
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = [width, height];
        self
    }

    /// Append an input port template
    pub fn with_input(mut self, spec: PortSpec) -> Self {
        self.inputs.push(spec);
        self
    }

    /// Append an output port template
    pub fn with_output(mut self, spec: PortSpec) -> Self {
        self.outputs.push(spec);
        self
    }

    /// Attach a behavior
    pub fn with_behavior(mut self, behavior: impl NodeBehavior + 'static) -> Self {
        self.behavior = Arc::new(behavior);
        self
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType")
            .field("title", &self.title)
            .field("size", &self.size)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node type name (key into the registry)
    pub node_type: String,
    /// Display title
    pub title: String,
    /// Top-left corner in world space
    pub position: [f32; 2],
    /// Width and height in world units
    pub size: [f32; 2],
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
    /// Behavior-owned state
    pub state: NodeState,
}

impl Node {
    /// Get an input port by index
    pub fn input(&self, index: usize) -> Option<&Port> {
        self.inputs.get(index)
    }

    /// Get an output port by index
    pub fn output(&self, index: usize) -> Option<&Port> {
        self.outputs.get(index)
    }

    /// Get an input port by name
    pub fn input_named(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Get an output port by name
    pub fn output_named(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Get a port by ID
    pub fn port(&self, port_id: PortId) -> Option<&Port> {
        self.ports().find(|p| p.id == port_id)
    }

    /// Locate a port by ID, returning its direction and index
    pub fn port_slot(&self, port_id: PortId) -> Option<(PortDirection, usize)> {
        if let Some(i) = self.inputs.iter().position(|p| p.id == port_id) {
            return Some((PortDirection::Input, i));
        }
        self.outputs
            .iter()
            .position(|p| p.id == port_id)
            .map(|i| (PortDirection::Output, i))
    }

    /// Get all ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }
}

/// Registry of available node types, keyed by type name
#[derive(Debug, Default, Clone)]
pub struct NodeRegistry {
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type under a unique name
    pub fn register(&mut self, type_name: impl Into<String>, def: NodeType) -> Result<(), RegistryError> {
        let type_name = type_name.into();
        if self.types.contains_key(&type_name) {
            return Err(RegistryError::DuplicateType(type_name));
        }
        tracing::debug!(node_type = %type_name, "registered node type");
        self.types.insert(type_name, def);
        Ok(())
    }

    /// Look up a node type by name
    pub fn lookup(&self, type_name: &str) -> Result<&NodeType, GraphError> {
        self.types
            .get(type_name)
            .ok_or_else(|| GraphError::UnknownType(type_name.to_string()))
    }

    /// Check whether a name is registered
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Remove a type, returning its definition
    pub fn unregister(&mut self, type_name: &str) -> Option<NodeType> {
        self.types.shift_remove(type_name)
    }

    /// Remove every registered type
    pub fn clear(&mut self) {
        self.types.clear();
    }

    /// Iterate registered types in registration order
    pub fn types(&self) -> impl Iterator<Item = (&str, &NodeType)> {
        self.types.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
