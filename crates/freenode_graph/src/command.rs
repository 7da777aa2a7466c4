// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reversible graph mutations and the undo/redo stack.
//!
//! Commands never own the graph; they receive it on every `execute`/`undo`
//! and keep only the ids and captured data they need to reverse themselves.

use crate::edge::Edge;
use crate::error::{CommandError, GraphError};
use crate::graph::{Graph, RemovedNode};
use crate::ids::{EdgeId, NodeId, PortId};
use std::collections::VecDeque;
use std::fmt;

/// Default maximum undo history depth
pub const MAX_HISTORY: usize = 100;

/// A reversible unit of graph mutation
pub trait GraphCommand: Send {
    /// Human-readable description
    fn description(&self) -> &str;

    /// Apply the mutation
    fn execute(&mut self, graph: &mut Graph) -> Result<(), CommandError>;

    /// Revert the mutation
    fn undo(&mut self, graph: &mut Graph) -> Result<(), CommandError>;
}

/// Linear undo/redo history
pub struct CommandStack {
    undo_stack: VecDeque<Box<dyn GraphCommand>>,
    redo_stack: Vec<Box<dyn GraphCommand>>,
    max_depth: usize,
}

impl CommandStack {
    /// Create a new history with the default depth
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Execute a command and record it. Clears the redo history.
    pub fn exec(&mut self, graph: &mut Graph, command: impl GraphCommand + 'static) -> Result<(), CommandError> {
        self.exec_boxed(graph, Box::new(command))
    }

    /// Execute an already boxed command and record it
    pub fn exec_boxed(&mut self, graph: &mut Graph, mut command: Box<dyn GraphCommand>) -> Result<(), CommandError> {
        command.execute(graph)?;
        tracing::debug!(command = command.description(), "executed command");
        self.push(command);
        Ok(())
    }

    /// Record a command whose effect has already been applied to the graph.
    /// Clears the redo history.
    pub fn record(&mut self, command: Box<dyn GraphCommand>) {
        tracing::debug!(command = command.description(), "recorded command");
        self.push(command);
    }

    fn push(&mut self, command: Box<dyn GraphCommand>) {
        self.redo_stack.clear();
        self.undo_stack.push_back(command);
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    /// Revert the most recent command. Returns false if there was nothing to undo.
    ///
    /// A command whose undo fails is dropped from history.
    pub fn undo(&mut self, graph: &mut Graph) -> Result<bool, CommandError> {
        let Some(mut command) = self.undo_stack.pop_back() else {
            return Ok(false);
        };
        command.undo(graph)?;
        tracing::debug!(command = command.description(), "undid command");
        self.redo_stack.push(command);
        Ok(true)
    }

    /// Re-apply the most recently undone command. Returns false if there was nothing to redo.
    ///
    /// A command whose redo fails is dropped from history.
    pub fn redo(&mut self, graph: &mut Graph) -> Result<bool, CommandError> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        command.execute(graph)?;
        tracing::debug!(command = command.description(), "redid command");
        self.undo_stack.push_back(command);
        Ok(true)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Maximum number of retained undo entries
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|c| c.description())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|c| c.description())
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandStack")
            .field(
                "undo",
                &self.undo_stack.iter().map(|c| c.description()).collect::<Vec<_>>(),
            )
            .field(
                "redo",
                &self.redo_stack.iter().map(|c| c.description()).collect::<Vec<_>>(),
            )
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

/// Move a node between two positions
#[derive(Debug, Clone)]
pub struct MoveNode {
    node: NodeId,
    from: [f32; 2],
    to: [f32; 2],
}

impl MoveNode {
    /// Create a new move command
    pub fn new(node: NodeId, from: [f32; 2], to: [f32; 2]) -> Self {
        Self { node, from, to }
    }
}

impl GraphCommand for MoveNode {
    fn description(&self) -> &str {
        "Move Node"
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), CommandError> {
        Ok(graph.set_node_position(self.node, self.to)?)
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), CommandError> {
        Ok(graph.set_node_position(self.node, self.from)?)
    }
}

/// Resize a node between two sizes
#[derive(Debug, Clone)]
pub struct ResizeNode {
    node: NodeId,
    from: [f32; 2],
    to: [f32; 2],
}

impl ResizeNode {
    /// Create a new resize command
    pub fn new(node: NodeId, from: [f32; 2], to: [f32; 2]) -> Self {
        Self { node, from, to }
    }
}

impl GraphCommand for ResizeNode {
    fn description(&self) -> &str {
        "Resize Node"
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), CommandError> {
        graph.set_node_size(self.node, self.to)?;
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), CommandError> {
        graph.set_node_size(self.node, self.from)?;
        Ok(())
    }
}

/// Connect an output port to an input port
#[derive(Debug, Clone)]
pub struct AddEdge {
    from_node: NodeId,
    from_port: PortId,
    to_node: NodeId,
    to_port: PortId,
    added: Option<EdgeId>,
    undone: Option<(usize, Edge)>,
}

impl AddEdge {
    /// Create a new connect command
    pub fn new(from_node: NodeId, from_port: PortId, to_node: NodeId, to_port: PortId) -> Self {
        Self {
            from_node,
            from_port,
            to_node,
            to_port,
            added: None,
            undone: None,
        }
    }

    /// Id of the edge created by the last execution
    pub fn added(&self) -> Option<EdgeId> {
        self.added
    }
}

impl GraphCommand for AddEdge {
    fn description(&self) -> &str {
        "Connect"
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), CommandError> {
        // Redo restores the edge undo took, keeping its id.
        if let Some((index, edge)) = self.undone.take() {
            let id = edge.id;
            if !graph.restore_edge(index, edge) {
                return Err(CommandError::InvalidOperation(format!(
                    "cannot restore edge {id}: endpoint missing"
                )));
            }
            self.added = Some(id);
            return Ok(());
        }

        let id = graph.add_edge(self.from_node, self.from_port, self.to_node, self.to_port)?;
        self.added = Some(id);
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), CommandError> {
        // Fall back to matching endpoints if the recorded id went away.
        let id = self
            .added
            .filter(|id| graph.edge(*id).is_some())
            .or_else(|| graph.find_edge(self.from_node, self.from_port, self.to_node, self.to_port));
        self.undone = id.and_then(|id| graph.take_edge(id));
        self.added = None;
        Ok(())
    }
}

/// Disconnect an edge, restoring it with the same id on undo
#[derive(Debug, Clone)]
pub struct RemoveEdge {
    edge: EdgeId,
    removed: Option<(usize, Edge)>,
}

impl RemoveEdge {
    /// Create a disconnect command, or `None` if the edge does not exist
    pub fn new(graph: &Graph, edge: EdgeId) -> Option<Self> {
        graph.edge(edge).map(|_| Self { edge, removed: None })
    }

    /// Wrap an edge already taken out of the graph at `index`, ready for
    /// [`CommandStack::record`]
    pub fn detached(index: usize, edge: Edge) -> Self {
        Self {
            edge: edge.id,
            removed: Some((index, edge)),
        }
    }
}

impl GraphCommand for RemoveEdge {
    fn description(&self) -> &str {
        "Disconnect"
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), CommandError> {
        let removed = graph
            .take_edge(self.edge)
            .ok_or(GraphError::EdgeNotFound(self.edge))?;
        self.removed = Some(removed);
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), CommandError> {
        let (index, edge) = self
            .removed
            .take()
            .ok_or_else(|| CommandError::InvalidOperation("edge was never removed".to_string()))?;
        if !graph.restore_edge(index, edge) {
            return Err(CommandError::InvalidOperation(format!(
                "cannot restore edge {}: endpoint missing",
                self.edge
            )));
        }
        Ok(())
    }
}

/// Delete a node together with its incident edges
#[derive(Debug, Clone)]
pub struct RemoveNode {
    node: NodeId,
    removed: Option<RemovedNode>,
}

impl RemoveNode {
    /// Create a delete command
    pub fn new(node: NodeId) -> Self {
        Self { node, removed: None }
    }
}

impl GraphCommand for RemoveNode {
    fn description(&self) -> &str {
        "Delete Node"
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), CommandError> {
        let removed = graph
            .take_node(self.node)
            .ok_or(GraphError::NodeNotFound(self.node))?;
        self.removed = Some(removed);
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), CommandError> {
        let removed = self
            .removed
            .take()
            .ok_or_else(|| CommandError::InvalidOperation("node was never removed".to_string()))?;
        graph.restore_node(removed);
        Ok(())
    }
}

/// Several commands applied and reverted as one history entry
pub struct Compound {
    description: String,
    commands: Vec<Box<dyn GraphCommand>>,
}

impl Compound {
    /// Group commands; they execute in order and undo in reverse
    pub fn new(description: impl Into<String>, commands: Vec<Box<dyn GraphCommand>>) -> Self {
        Self {
            description: description.into(),
            commands,
        }
    }
}

impl GraphCommand for Compound {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), CommandError> {
        for i in 0..self.commands.len() {
            if let Err(err) = self.commands[i].execute(graph) {
                // Roll back what already ran so the group stays atomic.
                for done in self.commands[..i].iter_mut().rev() {
                    if let Err(rollback) = done.undo(graph) {
                        tracing::warn!("rollback of {} failed: {rollback}", done.description());
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), CommandError> {
        for command in self.commands.iter_mut().rev() {
            command.undo(graph)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compound")
            .field("description", &self.description)
            .field("commands", &self.commands.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::GraphDocument;
    use crate::events::Hooks;
    use crate::graph::NodeOverrides;
    use crate::ids::SequentialIds;
    use crate::node::{NodeRegistry, NodeType};
    use crate::port::PortSpec;
    use std::sync::Arc;

    struct Fixture {
        graph: Graph,
        nodes: Vec<NodeId>,
    }

    impl Fixture {
        fn new(count: usize) -> Self {
            let mut registry = NodeRegistry::new();
            registry
                .register(
                    "pass",
                    NodeType::new("Pass")
                        .with_input(PortSpec::any("in"))
                        .with_output(PortSpec::any("out")),
                )
                .unwrap();
            let mut graph = Graph::with_id_generator(Hooks::new(), Arc::new(SequentialIds::new()));
            let nodes = (0..count)
                .map(|i| {
                    graph
                        .add_node(&registry, "pass", NodeOverrides::default().at(i as f32 * 200.0, 0.0))
                        .unwrap()
                })
                .collect();
            Self { graph, nodes }
        }

        fn add_edge(&self, from: usize, to: usize) -> AddEdge {
            let from = self.graph.node(self.nodes[from]).unwrap();
            let to = self.graph.node(self.nodes[to]).unwrap();
            AddEdge::new(from.id, from.outputs[0].id, to.id, to.inputs[0].id)
        }

        fn connect(&mut self, history: &mut CommandStack, from: usize, to: usize) {
            let cmd = self.add_edge(from, to);
            history.exec(&mut self.graph, cmd).unwrap();
        }

        fn snapshot(&self) -> GraphDocument {
            self.graph.to_document()
        }
    }

    #[test]
    fn exec_undo_redo_move() {
        let mut fx = Fixture::new(1);
        let mut history = CommandStack::new();
        let node = fx.nodes[0];

        history.exec(&mut fx.graph, MoveNode::new(node, [0.0, 0.0], [50.0, 60.0])).unwrap();
        assert_eq!(fx.graph.node(node).unwrap().position, [50.0, 60.0]);
        assert_eq!(history.undo_description(), Some("Move Node"));

        assert!(history.undo(&mut fx.graph).unwrap());
        assert_eq!(fx.graph.node(node).unwrap().position, [0.0, 0.0]);
        assert!(history.can_redo());

        assert!(history.redo(&mut fx.graph).unwrap());
        assert_eq!(fx.graph.node(node).unwrap().position, [50.0, 60.0]);
    }

    #[test]
    fn undo_and_redo_on_empty_history_are_noops() {
        let mut fx = Fixture::new(1);
        let mut history = CommandStack::new();
        let before = fx.snapshot();

        assert!(!history.undo(&mut fx.graph).unwrap());
        assert!(!history.redo(&mut fx.graph).unwrap());
        assert_eq!(fx.snapshot(), before);
    }

    #[test]
    fn new_command_clears_redo() {
        let mut fx = Fixture::new(1);
        let mut history = CommandStack::new();
        let node = fx.nodes[0];

        history.exec(&mut fx.graph, MoveNode::new(node, [0.0, 0.0], [1.0, 1.0])).unwrap();
        history.undo(&mut fx.graph).unwrap();
        history.exec(&mut fx.graph, MoveNode::new(node, [0.0, 0.0], [2.0, 2.0])).unwrap();

        assert!(!history.can_redo());
        assert!(!history.redo(&mut fx.graph).unwrap());
        assert_eq!(fx.graph.node(node).unwrap().position, [2.0, 2.0]);
    }

    #[test]
    fn add_edge_undo_finds_edge_by_endpoints() {
        let mut fx = Fixture::new(2);
        let mut history = CommandStack::new();
        let cmd = fx.add_edge(0, 1);

        history.exec(&mut fx.graph, cmd).unwrap();
        assert_eq!(fx.graph.edge_count(), 1);
        history.undo(&mut fx.graph).unwrap();
        assert_eq!(fx.graph.edge_count(), 0);
        history.redo(&mut fx.graph).unwrap();
        assert_eq!(fx.graph.edge_count(), 1);
    }

    #[test]
    fn remove_edge_restores_same_id() {
        let mut fx = Fixture::new(2);
        let mut history = CommandStack::new();
        fx.connect(&mut history, 0, 1);
        let edge = fx.graph.edges().next().unwrap().id;

        let cmd = RemoveEdge::new(&fx.graph, edge).unwrap();
        history.exec(&mut fx.graph, cmd).unwrap();
        assert!(fx.graph.edge(edge).is_none());

        history.undo(&mut fx.graph).unwrap();
        assert!(fx.graph.edge(edge).is_some());
        assert!(RemoveEdge::new(&fx.graph, fx.graph.id_generator().edge_id()).is_none());
    }

    #[test]
    fn remove_node_undo_restores_every_incident_edge() {
        let mut fx = Fixture::new(3);
        let mut history = CommandStack::new();
        fx.connect(&mut history, 0, 1);
        fx.connect(&mut history, 1, 2);
        fx.connect(&mut history, 0, 2);
        let before = fx.snapshot();

        history.exec(&mut fx.graph, RemoveNode::new(fx.nodes[1])).unwrap();
        assert_eq!(fx.graph.node_count(), 2);
        assert_eq!(fx.graph.edge_count(), 1);

        history.undo(&mut fx.graph).unwrap();
        assert_eq!(fx.snapshot(), before);
    }

    #[test]
    fn removing_missing_node_fails_without_recording() {
        let mut fx = Fixture::new(1);
        let mut history = CommandStack::new();
        let ghost = fx.graph.id_generator().node_id();

        let err = history.exec(&mut fx.graph, RemoveNode::new(ghost)).unwrap_err();
        assert!(matches!(err, CommandError::Graph(GraphError::NodeNotFound(id)) if id == ghost));
        assert!(!history.can_undo());
    }

    #[test]
    fn undo_all_then_redo_all_is_identity() {
        let mut fx = Fixture::new(3);
        let mut history = CommandStack::new();
        let (a, b, c) = (fx.nodes[0], fx.nodes[1], fx.nodes[2]);
        let start = fx.snapshot();

        fx.connect(&mut history, 0, 1);
        history.exec(&mut fx.graph, MoveNode::new(b, [200.0, 0.0], [220.0, 40.0])).unwrap();
        fx.connect(&mut history, 1, 2);
        history.exec(&mut fx.graph, ResizeNode::new(c, [160.0, 60.0], [300.0, 200.0])).unwrap();
        history.exec(&mut fx.graph, RemoveNode::new(a)).unwrap();
        let end = fx.snapshot();
        let n = history.undo_depth();
        assert_eq!(n, 5);

        for _ in 0..n {
            assert!(history.undo(&mut fx.graph).unwrap());
        }
        assert!(!history.undo(&mut fx.graph).unwrap());
        assert_eq!(fx.snapshot().nodes, start.nodes);
        assert_eq!(fx.graph.edge_count(), 0);

        for _ in 0..n {
            assert!(history.redo(&mut fx.graph).unwrap());
        }
        assert!(!history.redo(&mut fx.graph).unwrap());
        assert_eq!(fx.snapshot(), end);
    }

    #[test]
    fn redo_keeps_edge_id_for_later_disconnect() {
        let mut fx = Fixture::new(2);
        let mut history = CommandStack::new();
        fx.connect(&mut history, 0, 1);
        let edge = fx.graph.edges().next().unwrap().id;
        let cmd = RemoveEdge::new(&fx.graph, edge).unwrap();
        history.exec(&mut fx.graph, cmd).unwrap();
        let end = fx.snapshot();

        assert!(history.undo(&mut fx.graph).unwrap());
        assert!(history.undo(&mut fx.graph).unwrap());
        assert_eq!(fx.graph.edge_count(), 0);

        assert!(history.redo(&mut fx.graph).unwrap());
        assert!(fx.graph.edge(edge).is_some());
        assert!(history.redo(&mut fx.graph).unwrap());
        assert_eq!(fx.graph.edge_count(), 0);
        assert_eq!(fx.snapshot(), end);
        assert_eq!(history.undo_depth(), 2);

        history.undo(&mut fx.graph).unwrap();
        assert!(fx.graph.edge(edge).is_some());
    }

    #[test]
    fn replace_connection_replays_after_full_undo() {
        let mut fx = Fixture::new(3);
        let mut history = CommandStack::new();
        fx.connect(&mut history, 0, 2);
        let old = fx.graph.edges().next().unwrap().id;
        let replace = Compound::new(
            "Replace Connection",
            vec![
                Box::new(RemoveEdge::new(&fx.graph, old).unwrap()) as Box<dyn GraphCommand>,
                Box::new(fx.add_edge(1, 2)),
            ],
        );
        history.exec(&mut fx.graph, replace).unwrap();
        let end = fx.snapshot();

        while history.undo(&mut fx.graph).unwrap() {}
        assert_eq!(fx.graph.edge_count(), 0);
        while history.redo(&mut fx.graph).unwrap() {}

        assert_eq!(history.undo_depth(), 2);
        assert_eq!(fx.snapshot(), end);
    }

    #[test]
    fn recorded_command_is_not_executed_again() {
        let mut fx = Fixture::new(2);
        let mut history = CommandStack::new();
        fx.connect(&mut history, 0, 1);
        let edge = fx.graph.edges().next().unwrap().id;
        history.exec(&mut fx.graph, MoveNode::new(fx.nodes[0], [0.0, 0.0], [5.0, 5.0])).unwrap();
        history.undo(&mut fx.graph).unwrap();
        assert!(history.can_redo());

        let (index, taken) = fx.graph.take_edge(edge).unwrap();
        history.record(Box::new(RemoveEdge::detached(index, taken)));
        assert_eq!(history.undo_description(), Some("Disconnect"));
        assert!(!history.can_redo());
        assert_eq!(fx.graph.edge_count(), 0);

        history.undo(&mut fx.graph).unwrap();
        assert!(fx.graph.edge(edge).is_some());
        history.redo(&mut fx.graph).unwrap();
        assert_eq!(fx.graph.edge_count(), 0);
    }

    #[test]
    fn compound_undoes_in_reverse_as_one_entry() {
        let mut fx = Fixture::new(3);
        let mut history = CommandStack::new();
        fx.connect(&mut history, 0, 2);
        let old = fx.graph.edges().next().unwrap().id;
        let before = fx.snapshot();

        let replace = Compound::new(
            "Replace Connection",
            vec![
                Box::new(RemoveEdge::new(&fx.graph, old).unwrap()) as Box<dyn GraphCommand>,
                Box::new(fx.add_edge(1, 2)),
            ],
        );
        history.exec(&mut fx.graph, replace).unwrap();
        assert_eq!(fx.graph.edge_count(), 1);
        assert_eq!(fx.graph.edges().next().unwrap().from_node, fx.nodes[1]);
        assert_eq!(history.undo_depth(), 2);

        history.undo(&mut fx.graph).unwrap();
        assert_eq!(fx.snapshot(), before);
    }

    #[test]
    fn compound_rolls_back_on_failure() {
        let mut fx = Fixture::new(2);
        let mut history = CommandStack::new();
        let node = fx.nodes[0];
        let ghost = fx.graph.id_generator().node_id();
        let before = fx.snapshot();

        let group = Compound::new(
            "Broken",
            vec![
                Box::new(MoveNode::new(node, [0.0, 0.0], [9.0, 9.0])) as Box<dyn GraphCommand>,
                Box::new(RemoveNode::new(ghost)),
            ],
        );
        assert!(history.exec(&mut fx.graph, group).is_err());
        assert_eq!(fx.snapshot(), before);
        assert!(!history.can_undo());
    }

    #[test]
    fn history_depth_is_bounded() {
        let mut fx = Fixture::new(1);
        let mut history = CommandStack::with_max_depth(3);
        for i in 0..5 {
            let to = [i as f32, 0.0];
            history.exec(&mut fx.graph, MoveNode::new(fx.nodes[0], [0.0, 0.0], to)).unwrap();
        }
        assert_eq!(history.undo_depth(), 3);
        history.clear();
        assert!(!history.can_undo());
    }
}
