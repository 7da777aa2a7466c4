// SPDX-License-Identifier: MIT OR Apache-2.0
//! The editor facade.
//!
//! [`GraphEditor`] wires one registry, hook bus, graph, history, controller
//! and runner together and forwards host input to the right component.

use crate::builtin::register_builtins;
use crate::command::{AddEdge, CommandStack, RemoveNode};
use crate::config::EditorConfig;
use crate::controller::{Controller, PointerEvent};
use crate::document::GraphDocument;
use crate::error::{CommandError, DocumentError, GraphError, NodeExecutionError, RegistryError};
use crate::events::Hooks;
use crate::geometry::node_rect;
use crate::graph::{Graph, NodeOverrides};
use crate::ids::{IdGenerator, NodeId, PortId, RandomIds};
use crate::node::{NodeRegistry, NodeType};
use crate::runner::{Runner, TickInfo};
use egui::{Key, Modifiers, Pos2, Rect};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A complete graph editing session
pub struct GraphEditor {
    config: EditorConfig,
    registry: NodeRegistry,
    hooks: Hooks,
    ids: Arc<dyn IdGenerator>,
    graph: Graph,
    history: CommandStack,
    controller: Controller,
    runner: Runner,
}

impl GraphEditor {
    /// Create an editor with the built-in node types and random ids
    pub fn new(config: EditorConfig) -> Result<Self, RegistryError> {
        Self::with_id_generator(config, Arc::new(RandomIds))
    }

    /// Create an editor minting ids from `ids`
    pub fn with_id_generator(config: EditorConfig, ids: Arc<dyn IdGenerator>) -> Result<Self, RegistryError> {
        let config = config.sanitized();
        let mut registry = NodeRegistry::new();
        register_builtins(&mut registry, config.nodes.default_size)?;

        let hooks = Hooks::new();
        let graph = Graph::with_id_generator(hooks.clone(), Arc::clone(&ids)).with_min_node_size(config.nodes.min_size);
        let controller = Controller::new(config.viewport.to_viewport())
            .with_resize_handle(config.nodes.resize_handle)
            .with_wheel_zoom_base(config.viewport.wheel_zoom_base);
        let mut runner = Runner::new(hooks.clone(), config.runner.cycles_per_tick);
        if config.runner.autorun {
            runner.start();
        }

        Ok(Self {
            history: CommandStack::with_max_depth(config.history.max_depth),
            config,
            registry,
            hooks,
            ids,
            graph,
            controller,
            runner,
        })
    }

    /// Active settings
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Registered node types
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Register an additional node type
    pub fn register_type(&mut self, type_name: impl Into<String>, def: NodeType) -> Result<(), RegistryError> {
        self.registry.register(type_name, def)
    }

    /// The notification bus shared by every component
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// The graph being edited
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Direct mutable access to the graph, bypassing history
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Undo history
    pub fn history(&self) -> &CommandStack {
        &self.history
    }

    /// Interaction state
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Mutable interaction state
    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    /// Execution scheduler
    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Create a node of a registered type
    pub fn add_node(&mut self, type_name: &str, overrides: NodeOverrides) -> Result<NodeId, GraphError> {
        self.graph.add_node(&self.registry, type_name, overrides)
    }

    /// Delete a node and its edges as an undoable step
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<(), CommandError> {
        self.controller.cancel_gesture(&mut self.graph);
        self.history.exec(&mut self.graph, RemoveNode::new(node_id))?;
        self.controller.clear_selection();
        Ok(())
    }

    /// Connect two ports as an undoable step
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Result<(), CommandError> {
        self.history.exec(
            &mut self.graph,
            AddEdge::new(from_node, from_port, to_node, to_port),
        )
    }

    /// Serialize the graph
    pub fn to_document(&self) -> GraphDocument {
        self.graph.to_document()
    }

    /// Replace the graph with a document's contents.
    ///
    /// History, selection and any gesture in progress are discarded. On error
    /// the current graph is left untouched.
    pub fn load_document(&mut self, document: &GraphDocument) -> Result<(), DocumentError> {
        let graph = Graph::from_document(document, &self.registry, self.hooks.clone(), Arc::clone(&self.ids))?
            .with_min_node_size(self.config.nodes.min_size);

        self.controller.cancel_gesture(&mut self.graph);
        self.controller.clear_selection();
        self.history.clear();
        self.graph = graph;
        tracing::info!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "loaded document"
        );
        Ok(())
    }

    /// Begin ticking on host frames
    pub fn start(&mut self) {
        self.runner.start();
    }

    /// Stop ticking
    pub fn stop(&mut self) {
        self.runner.stop();
    }

    /// Check if the runner is active
    pub fn is_running(&self) -> bool {
        self.runner.is_running()
    }

    /// Host per-frame callback
    pub fn frame(&mut self, now: Duration) -> Option<TickInfo> {
        self.runner.frame(&mut self.graph, &self.registry, now)
    }

    /// Run cycles synchronously, whether or not the runner is started
    pub fn step(&mut self, cycles: u32, dt: f32) -> Vec<NodeExecutionError> {
        self.runner.step(&mut self.graph, &self.registry, cycles, dt)
    }

    /// Forward a pointer press
    pub fn pointer_down(&mut self, event: PointerEvent) {
        self.controller
            .pointer_down(event, &mut self.graph);
    }

    /// Forward a pointer move
    pub fn pointer_move(&mut self, event: PointerEvent) {
        self.controller.pointer_move(event, &mut self.graph);
    }

    /// Forward a pointer release
    pub fn pointer_up(&mut self, event: PointerEvent) {
        self.controller
            .pointer_up(event, &mut self.graph, &mut self.history);
    }

    /// Forward a wheel scroll
    pub fn wheel(&mut self, delta_y: f32, pos: Pos2) -> bool {
        self.controller.wheel(delta_y, pos)
    }

    /// Forward a key press
    pub fn key_pressed(&mut self, key: Key, modifiers: Modifiers) -> bool {
        self.controller
            .key_pressed(key, modifiers, &mut self.graph, &mut self.history)
    }

    /// Undo the last command. During a rewire this only puts the detached edge back.
    pub fn undo(&mut self) -> Result<bool, CommandError> {
        let rewiring = self.controller.is_rewiring();
        self.controller.cancel_gesture(&mut self.graph);
        if rewiring {
            return Ok(true);
        }
        self.history.undo(&mut self.graph)
    }

    /// Redo the last undone command. During a rewire this only cancels it.
    pub fn redo(&mut self) -> Result<bool, CommandError> {
        let rewiring = self.controller.is_rewiring();
        self.controller.cancel_gesture(&mut self.graph);
        if rewiring {
            return Ok(false);
        }
        self.history.redo(&mut self.graph)
    }

    /// Let each node's behavior paint inside its on-screen rectangle
    pub fn draw_nodes(&self, painter: &egui::Painter) {
        let viewport = self.controller.viewport();
        for node in self.graph.nodes() {
            let Ok(def) = self.registry.lookup(&node.node_type) else {
                continue;
            };
            let world = node_rect(node);
            let screen = Rect::from_min_max(viewport.world_to_screen(world.min), viewport.world_to_screen(world.max));
            def.behavior.on_draw(node, painter, screen);
        }
    }
}

impl fmt::Debug for GraphEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphEditor")
            .field("config", &self.config)
            .field("graph", &self.graph)
            .field("history", &self.history)
            .field("controller", &self.controller)
            .field("runner", &self.runner)
            .finish_non_exhaustive()
    }
}
