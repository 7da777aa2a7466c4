// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer gesture state machine.
//!
//! The controller turns raw pointer, wheel and key input into graph
//! mutations. Live feedback (dragging, resizing) writes to the graph
//! directly; the finished gesture is recorded as a single command so that
//! undo sees one entry per user action.

use crate::command::{AddEdge, CommandStack, Compound, GraphCommand, MoveNode, RemoveEdge, RemoveNode, ResizeNode};
use crate::edge::Edge;
use crate::geometry::{find_node_at, find_port_at, port_anchor, resize_handle_rect, PortHit, Viewport, RESIZE_HANDLE};
use crate::graph::Graph;
use crate::ids::{NodeId, PortId};
use crate::port::PortDirection;
use egui::{CursorIcon, Key, Modifiers, PointerButton, Pos2, Vec2};
use indexmap::IndexSet;

/// Default base of the exponential wheel zoom
pub const WHEEL_ZOOM_BASE: f32 = 1.0015;

/// A connection being dragged out of an output port
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDrag {
    /// Source node
    pub from_node: NodeId,
    /// Source output port
    pub from_port: PortId,
    /// Live pointer position (screen space)
    pub pointer: Pos2,
    /// Edge detached from an input to start this drag, with its former
    /// insertion-order position. Put back if the gesture is cancelled.
    pub detached: Option<(usize, Edge)>,
}

/// The gesture in progress; exactly one at a time
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    /// No gesture
    #[default]
    Idle,
    /// Panning the view
    Panning {
        /// Last pointer position (screen space)
        last: Pos2,
    },
    /// Dragging a node
    DraggingNode {
        /// The dragged node
        node: NodeId,
        /// Pointer minus node position at grab time (world space)
        grab_offset: Vec2,
        /// Node position when the drag began
        start: [f32; 2],
    },
    /// Resizing a node from its bottom-right handle
    ResizingNode {
        /// The resized node
        node: NodeId,
        /// Node size when the resize began
        start_size: [f32; 2],
        /// Pointer position when the resize began (world space)
        start_pointer: Pos2,
    },
    /// Dragging out a new connection
    Connecting(ConnectionDrag),
}

impl Gesture {
    /// Check if no gesture is active
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// A pointer press, move or release
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Pointer position (screen space)
    pub pos: Pos2,
    /// Button involved
    pub button: PointerButton,
    /// Modifier keys held
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Primary button event without modifiers
    pub fn primary(pos: Pos2) -> Self {
        Self {
            pos,
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
        }
    }

    /// Replace the button
    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    /// Replace the modifiers
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Interaction state: viewport, selection and the active gesture
#[derive(Debug, Clone)]
pub struct Controller {
    viewport: Viewport,
    selection: IndexSet<NodeId>,
    gesture: Gesture,
    hovered_port: Option<PortHit>,
    over_resize_handle: bool,
    resize_handle: f32,
    wheel_zoom_base: f32,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl Controller {
    /// Create a controller over a viewport
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            selection: IndexSet::new(),
            gesture: Gesture::Idle,
            hovered_port: None,
            over_resize_handle: false,
            resize_handle: RESIZE_HANDLE,
            wheel_zoom_base: WHEEL_ZOOM_BASE,
        }
    }

    /// Set the side length of the resize handle (world units)
    pub fn with_resize_handle(mut self, size: f32) -> Self {
        self.resize_handle = size;
        self
    }

    /// Set the base of the exponential wheel zoom
    pub fn with_wheel_zoom_base(mut self, base: f32) -> Self {
        self.wheel_zoom_base = base;
        self
    }

    /// The view transform
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Mutable view transform
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// The active gesture
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Check if a connection drag is carrying an edge detached from an input
    pub fn is_rewiring(&self) -> bool {
        matches!(
            &self.gesture,
            Gesture::Connecting(ConnectionDrag { detached: Some(_), .. })
        )
    }

    /// Port under the pointer after the last move
    pub fn hovered_port(&self) -> Option<PortHit> {
        self.hovered_port
    }

    /// Selected nodes, in selection order
    pub fn selection(&self) -> &IndexSet<NodeId> {
        &self.selection
    }

    /// Check if a node is selected
    pub fn is_selected(&self, node_id: NodeId) -> bool {
        self.selection.contains(&node_id)
    }

    /// Select a node, optionally keeping the existing selection
    pub fn select_node(&mut self, node_id: NodeId, additive: bool) {
        if !additive {
            self.selection.clear();
        }
        self.selection.insert(node_id);
    }

    /// Clear selection
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Handle a pointer press
    pub fn pointer_down(&mut self, event: PointerEvent, graph: &mut Graph) {
        if !self.gesture.is_idle() {
            self.cancel_gesture(graph);
        }

        if event.button == PointerButton::Middle {
            self.gesture = Gesture::Panning { last: event.pos };
            return;
        }

        let world = self.viewport.screen_to_world(event.pos);

        if let Some(hit) = find_port_at(graph, world) {
            match hit.direction {
                PortDirection::Output => {
                    self.gesture = Gesture::Connecting(ConnectionDrag {
                        from_node: hit.node,
                        from_port: hit.port,
                        pointer: event.pos,
                        detached: None,
                    });
                    return;
                }
                PortDirection::Input => {
                    if self.start_rewire(hit, event.pos, graph) {
                        return;
                    }
                }
            }
        }

        let Some(node_id) = find_node_at(graph, world) else {
            self.selection.clear();
            self.gesture = Gesture::Panning { last: event.pos };
            return;
        };
        let Some(node) = graph.node(node_id) else {
            return;
        };

        if resize_handle_rect(node, self.resize_handle).contains(world) {
            self.gesture = Gesture::ResizingNode {
                node: node_id,
                start_size: node.size,
                start_pointer: world,
            };
            return;
        }

        let start = node.position;
        self.select_node(node_id, event.modifiers.shift);
        self.gesture = Gesture::DraggingNode {
            node: node_id,
            grab_offset: world - Pos2::new(start[0], start[1]),
            start,
        };
    }

    /// Detach the edge feeding an input and keep dragging it from its source.
    ///
    /// Nothing is recorded until release, so the whole rewire is one history entry.
    fn start_rewire(&mut self, hit: PortHit, pointer: Pos2, graph: &mut Graph) -> bool {
        let Some(edge_id) = graph.incoming_edge(hit.node, hit.port).map(|edge| edge.id) else {
            return false;
        };
        let Some((index, edge)) = graph.take_edge(edge_id) else {
            return false;
        };
        tracing::debug!(edge = %edge_id, "detached edge for rewire");

        self.gesture = Gesture::Connecting(ConnectionDrag {
            from_node: edge.from_node,
            from_port: edge.from_port,
            pointer,
            detached: Some((index, edge)),
        });
        true
    }

    /// Handle a pointer move, with or without a button held
    pub fn pointer_move(&mut self, event: PointerEvent, graph: &mut Graph) {
        let world = self.viewport.screen_to_world(event.pos);
        self.hovered_port = find_port_at(graph, world);
        self.over_resize_handle = find_node_at(graph, world)
            .and_then(|id| graph.node(id))
            .is_some_and(|node| resize_handle_rect(node, self.resize_handle).contains(world));

        let aborted = match &mut self.gesture {
            Gesture::Idle => false,
            Gesture::Panning { last } => {
                self.viewport.pan_by(event.pos - *last);
                *last = event.pos;
                false
            }
            Gesture::DraggingNode { node, grab_offset, .. } => {
                let target = world - *grab_offset;
                graph.set_node_position(*node, [target.x, target.y]).is_err()
            }
            Gesture::ResizingNode {
                node,
                start_size,
                start_pointer,
            } => {
                let delta = world - *start_pointer;
                let size = [start_size[0] + delta.x, start_size[1] + delta.y];
                graph.set_node_size(*node, size).is_err()
            }
            Gesture::Connecting(drag) => {
                drag.pointer = event.pos;
                graph.node(drag.from_node).is_none()
            }
        };

        if aborted {
            tracing::warn!("gesture target disappeared, aborting {:?}", self.gesture);
            self.gesture = Gesture::Idle;
        }
    }

    /// Handle a pointer release, committing the gesture to history
    pub fn pointer_up(&mut self, event: PointerEvent, graph: &mut Graph, history: &mut CommandStack) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle | Gesture::Panning { .. } => {}
            Gesture::DraggingNode { node, start, .. } => {
                let Some(end) = graph.node(node).map(|n| n.position) else {
                    tracing::warn!(node = %node, "dragged node disappeared");
                    return;
                };
                if end != start {
                    commit(history, graph, Box::new(MoveNode::new(node, start, end)));
                }
            }
            Gesture::ResizingNode { node, start_size, .. } => {
                let Some(end) = graph.node(node).map(|n| n.size) else {
                    tracing::warn!(node = %node, "resized node disappeared");
                    return;
                };
                if end != start_size {
                    commit(history, graph, Box::new(ResizeNode::new(node, start_size, end)));
                }
            }
            Gesture::Connecting(drag) => {
                let world = self.viewport.screen_to_world(event.pos);
                let target = find_port_at(graph, world);
                finish_connection(drag, target, graph, history);
            }
        }
    }

    /// Zoom about a screen position. Returns false if the scale was already at a limit.
    pub fn wheel(&mut self, delta_y: f32, pos: Pos2) -> bool {
        let factor = self.wheel_zoom_base.powf(-delta_y);
        self.viewport.zoom_at(factor, pos)
    }

    /// Handle a key press. Returns true if the key was consumed.
    pub fn key_pressed(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        graph: &mut Graph,
        history: &mut CommandStack,
    ) -> bool {
        match key {
            Key::Delete | Key::Backspace => {
                if self.selection.is_empty() {
                    return false;
                }
                self.cancel_gesture(graph);
                self.delete_selected(graph, history);
                true
            }
            Key::Z if modifiers.command => {
                // Undo in the middle of a rewire only reverts the detach.
                let rewiring = self.is_rewiring();
                self.cancel_gesture(graph);
                if rewiring {
                    return true;
                }
                let result = if modifiers.shift {
                    history.redo(graph)
                } else {
                    history.undo(graph)
                };
                if let Err(err) = result {
                    tracing::warn!("history step failed: {err}");
                }
                self.prune_selection(graph);
                true
            }
            Key::Y if modifiers.command => {
                let rewiring = self.is_rewiring();
                self.cancel_gesture(graph);
                if rewiring {
                    return true;
                }
                if let Err(err) = history.redo(graph) {
                    tracing::warn!("redo failed: {err}");
                }
                self.prune_selection(graph);
                true
            }
            Key::Escape => {
                let active = !self.gesture.is_idle();
                self.cancel_gesture(graph);
                active
            }
            _ => false,
        }
    }

    /// Remove every selected node, one history entry each
    pub fn delete_selected(&mut self, graph: &mut Graph, history: &mut CommandStack) {
        for node_id in std::mem::take(&mut self.selection) {
            if graph.node(node_id).is_some() {
                commit(history, graph, Box::new(RemoveNode::new(node_id)));
            }
        }
    }

    fn prune_selection(&mut self, graph: &Graph) {
        self.selection.retain(|id| graph.node(*id).is_some());
    }

    /// Abandon the active gesture, putting a live drag or resize back where it started
    pub fn cancel_gesture(&mut self, graph: &mut Graph) {
        match std::mem::take(&mut self.gesture) {
            Gesture::DraggingNode { node, start, .. } => {
                if graph.set_node_position(node, start).is_err() {
                    tracing::debug!(node = %node, "cancelled drag of a removed node");
                }
            }
            Gesture::ResizingNode { node, start_size, .. } => {
                if graph.set_node_size(node, start_size).is_err() {
                    tracing::debug!(node = %node, "cancelled resize of a removed node");
                }
            }
            Gesture::Connecting(ConnectionDrag {
                detached: Some((index, edge)),
                ..
            }) => {
                let id = edge.id;
                if !graph.restore_edge(index, edge) {
                    tracing::debug!(edge = %id, "cancelled rewire of an edge whose endpoint was removed");
                }
            }
            Gesture::Idle | Gesture::Panning { .. } | Gesture::Connecting(_) => {}
        }
    }

    /// Cursor to show for the current gesture or hover target
    pub fn cursor_icon(&self) -> CursorIcon {
        match &self.gesture {
            Gesture::Panning { .. } => CursorIcon::Move,
            Gesture::DraggingNode { .. } | Gesture::Connecting(_) => CursorIcon::Grabbing,
            Gesture::ResizingNode { .. } => CursorIcon::ResizeNwSe,
            Gesture::Idle if self.hovered_port.is_some() => CursorIcon::Grab,
            Gesture::Idle if self.over_resize_handle => CursorIcon::ResizeNwSe,
            Gesture::Idle => CursorIcon::Default,
        }
    }

    /// Screen-space segment from the source port to the pointer while connecting
    pub fn pending_connection(&self, graph: &Graph) -> Option<(Pos2, Pos2)> {
        let Gesture::Connecting(drag) = &self.gesture else {
            return None;
        };
        let node = graph.node(drag.from_node)?;
        let (direction, index) = node.port_slot(drag.from_port)?;
        let anchor = port_anchor(node, index, direction);
        Some((self.viewport.world_to_screen(anchor), drag.pointer))
    }
}

fn commit(history: &mut CommandStack, graph: &mut Graph, command: Box<dyn GraphCommand>) {
    let description = command.description().to_string();
    if let Err(err) = history.exec_boxed(graph, command) {
        tracing::warn!("{description} failed: {err}");
    }
}

/// Record a released connection drag.
///
/// A plain drag commits a connect (or a replace when the input is occupied).
/// A rewire records its detach and reconnect as one entry; dropped anywhere
/// else it records the detach alone, and dropped back on its own input it
/// restores the edge and records nothing.
fn finish_connection(drag: ConnectionDrag, target: Option<PortHit>, graph: &mut Graph, history: &mut CommandStack) {
    let ConnectionDrag {
        from_node,
        from_port,
        detached,
        ..
    } = drag;
    let connect = target.and_then(|target| connection_command(from_node, from_port, target, graph));

    let Some((index, edge)) = detached else {
        if let Some(command) = connect {
            commit(history, graph, command);
        }
        return;
    };

    if target.is_some_and(|t| t.node == edge.to_node && t.port == edge.to_port) {
        let id = edge.id;
        if !graph.restore_edge(index, edge) {
            tracing::warn!(edge = %id, "could not put back rewired edge");
        }
        return;
    }

    let detach: Box<dyn GraphCommand> = Box::new(RemoveEdge::detached(index, edge));
    let Some(mut command) = connect else {
        history.record(detach);
        return;
    };
    match command.execute(graph) {
        Ok(()) => {
            let rewire = Compound::new("Rewire Connection", vec![detach, command]);
            history.record(Box::new(rewire));
        }
        Err(err) => {
            tracing::warn!("{} failed: {err}", command.description());
            history.record(detach);
        }
    }
}

/// Command connecting a source output to `target`, or `None` if the drop is not a valid connection
fn connection_command(
    from_node: NodeId,
    from_port: PortId,
    target: PortHit,
    graph: &Graph,
) -> Option<Box<dyn GraphCommand>> {
    let Some(source) = graph.node(from_node).and_then(|n| n.port(from_port)) else {
        tracing::warn!(node = %from_node, "connection source disappeared");
        return None;
    };
    let sink = graph.node(target.node).and_then(|n| n.port(target.port))?;
    if !source.can_connect(sink) {
        tracing::debug!(
            from = %source.datatype,
            to = %sink.datatype,
            "rejected incompatible connection"
        );
        return None;
    }
    if graph.find_edge(from_node, from_port, target.node, target.port).is_some() {
        return None;
    }

    let add: Box<dyn GraphCommand> = Box::new(AddEdge::new(from_node, from_port, target.node, target.port));
    let command: Box<dyn GraphCommand> = match graph
        .incoming_edge(target.node, target.port)
        .and_then(|edge| RemoveEdge::new(graph, edge.id))
    {
        Some(remove) => {
            let replace: Vec<Box<dyn GraphCommand>> = vec![Box::new(remove), add];
            Box::new(Compound::new("Replace Connection", replace))
        }
        None => add,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Hooks;
    use crate::graph::{NodeOverrides, MIN_NODE_SIZE};
    use crate::ids::SequentialIds;
    use crate::node::{NodeRegistry, NodeType};
    use crate::port::PortSpec;
    use std::sync::Arc;

    // Identity viewport, so screen and world coordinates coincide.
    // Nodes are 160x60; inputs sit at x-8..x, outputs at x+160..x+168,
    // the first port row spans y+28..y+42.
    struct Scene {
        graph: Graph,
        history: CommandStack,
        controller: Controller,
        a: NodeId,
        b: NodeId,
        c: NodeId,
    }

    const A_OUT: Pos2 = Pos2::new(164.0, 35.0);
    const B_IN: Pos2 = Pos2::new(296.0, 35.0);
    const C_IN: Pos2 = Pos2::new(296.0, 235.0);
    const C_OUT: Pos2 = Pos2::new(464.0, 235.0);
    const A_BODY: Pos2 = Pos2::new(50.0, 20.0);
    const A_HANDLE: Pos2 = Pos2::new(155.0, 55.0);
    const EMPTY: Pos2 = Pos2::new(700.0, 700.0);

    impl Scene {
        fn new() -> Self {
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
            let mut add = |x, y| {
                graph
                    .add_node(&registry, "pass", NodeOverrides::default().at(x, y))
                    .unwrap()
            };
            let a = add(0.0, 0.0);
            let b = add(300.0, 0.0);
            let c = add(300.0, 200.0);
            Self {
                graph,
                history: CommandStack::new(),
                controller: Controller::default(),
                a,
                b,
                c,
            }
        }

        fn down(&mut self, pos: Pos2) {
            self.down_with(PointerEvent::primary(pos));
        }

        fn down_with(&mut self, event: PointerEvent) {
            self.controller.pointer_down(event, &mut self.graph);
        }

        fn moved(&mut self, pos: Pos2) {
            self.controller.pointer_move(PointerEvent::primary(pos), &mut self.graph);
        }

        fn up(&mut self, pos: Pos2) {
            self.controller
                .pointer_up(PointerEvent::primary(pos), &mut self.graph, &mut self.history);
        }

        fn drag(&mut self, from: Pos2, to: Pos2) {
            self.down(from);
            self.moved(to);
            self.up(to);
        }

        fn key(&mut self, key: Key, modifiers: Modifiers) -> bool {
            self.controller
                .key_pressed(key, modifiers, &mut self.graph, &mut self.history)
        }

        fn edges(&self) -> Vec<(NodeId, NodeId)> {
            self.graph.edges().map(|e| (e.from_node, e.to_node)).collect()
        }
    }

    fn command() -> Modifiers {
        Modifiers {
            command: true,
            ..Default::default()
        }
    }

    #[test]
    fn click_without_moving_records_nothing() {
        let mut scene = Scene::new();
        scene.drag(A_BODY, A_BODY);

        assert_eq!(scene.history.undo_depth(), 0);
        assert!(scene.controller.is_selected(scene.a));
        assert!(scene.controller.gesture().is_idle());
    }

    #[test]
    fn drag_records_one_move() {
        let mut scene = Scene::new();
        scene.down(A_BODY);
        scene.moved(A_BODY + Vec2::new(10.0, 5.0));
        scene.moved(A_BODY + Vec2::new(40.0, 25.0));
        scene.up(A_BODY + Vec2::new(40.0, 25.0));

        assert_eq!(scene.graph.node(scene.a).unwrap().position, [40.0, 25.0]);
        assert_eq!(scene.history.undo_depth(), 1);
        assert_eq!(scene.history.undo_description(), Some("Move Node"));

        scene.key(Key::Z, command());
        assert_eq!(scene.graph.node(scene.a).unwrap().position, [0.0, 0.0]);
    }

    #[test]
    fn shift_click_extends_selection() {
        let mut scene = Scene::new();
        scene.drag(A_BODY, A_BODY);
        let b_body = Pos2::new(350.0, 20.0);
        scene.down_with(PointerEvent::primary(b_body).with_modifiers(Modifiers::SHIFT));
        scene.up(b_body);
        assert_eq!(scene.controller.selection().len(), 2);

        scene.drag(A_BODY, A_BODY);
        assert_eq!(scene.controller.selection().len(), 1);
    }

    #[test]
    fn connect_output_to_input() {
        let mut scene = Scene::new();
        scene.down(A_OUT);
        assert!(matches!(scene.controller.gesture(), Gesture::Connecting(_)));
        scene.moved(Pos2::new(250.0, 40.0));

        let (from, to) = scene.controller.pending_connection(&scene.graph).unwrap();
        assert_eq!(from, Pos2::new(160.0, 35.0));
        assert_eq!(to, Pos2::new(250.0, 40.0));

        scene.up(B_IN);
        assert_eq!(scene.edges(), vec![(scene.a, scene.b)]);
        assert_eq!(scene.history.undo_description(), Some("Connect"));
        assert!(scene.controller.pending_connection(&scene.graph).is_none());
    }

    #[test]
    fn dropping_on_empty_space_connects_nothing() {
        let mut scene = Scene::new();
        scene.drag(A_OUT, EMPTY);
        assert_eq!(scene.graph.edge_count(), 0);
        assert_eq!(scene.history.undo_depth(), 0);
    }

    #[test]
    fn rewire_moves_an_existing_edge() {
        let mut scene = Scene::new();
        scene.drag(A_OUT, B_IN);

        scene.down(B_IN);
        assert_eq!(scene.graph.edge_count(), 0);
        let Gesture::Connecting(drag) = scene.controller.gesture() else {
            panic!("expected connecting gesture");
        };
        assert_eq!(drag.from_node, scene.a);
        assert!(drag.detached.is_some());
        assert_eq!(scene.history.undo_depth(), 1);

        scene.moved(C_IN);
        scene.up(C_IN);
        assert_eq!(scene.edges(), vec![(scene.a, scene.c)]);
        assert_eq!(scene.history.undo_depth(), 2);
        assert_eq!(scene.history.undo_description(), Some("Rewire Connection"));

        scene.key(Key::Z, command());
        assert_eq!(scene.edges(), vec![(scene.a, scene.b)]);
        scene.key(Key::Z, command());
        assert_eq!(scene.graph.edge_count(), 0);

        scene.key(Key::Y, command());
        scene.key(Key::Y, command());
        assert_eq!(scene.edges(), vec![(scene.a, scene.c)]);
    }

    #[test]
    fn escape_puts_a_detached_edge_back() {
        let mut scene = Scene::new();
        scene.drag(A_OUT, B_IN);
        let edge = scene.graph.edges().next().unwrap().id;

        scene.down(B_IN);
        scene.moved(EMPTY);
        assert_eq!(scene.graph.edge_count(), 0);
        assert!(scene.key(Key::Escape, Modifiers::NONE));

        assert!(scene.graph.edge(edge).is_some());
        assert_eq!(scene.history.undo_depth(), 1);
        assert_eq!(scene.history.undo_description(), Some("Connect"));
    }

    #[test]
    fn undo_during_rewire_only_reverts_the_detach() {
        let mut scene = Scene::new();
        scene.drag(A_OUT, B_IN);
        let edge = scene.graph.edges().next().unwrap().id;

        scene.down(B_IN);
        assert!(scene.controller.is_rewiring());
        assert!(scene.key(Key::Z, command()));

        assert!(scene.controller.gesture().is_idle());
        assert!(scene.graph.edge(edge).is_some());
        assert_eq!(scene.history.undo_description(), Some("Connect"));
    }

    #[test]
    fn dropping_a_detached_edge_on_its_own_input_changes_nothing() {
        let mut scene = Scene::new();
        scene.drag(A_OUT, B_IN);
        let edge = scene.graph.edges().next().unwrap().id;

        scene.drag(B_IN, B_IN);
        assert!(scene.graph.edge(edge).is_some());
        assert_eq!(scene.history.undo_depth(), 1);
    }

    #[test]
    fn rewire_onto_occupied_input_undoes_in_one_step() {
        let mut scene = Scene::new();
        scene.drag(A_OUT, B_IN);
        scene.drag(C_OUT, C_IN);
        let before = scene.graph.to_document();

        scene.drag(B_IN, C_IN);
        assert_eq!(scene.edges(), vec![(scene.a, scene.c)]);
        assert_eq!(scene.history.undo_depth(), 3);

        scene.key(Key::Z, command());
        assert_eq!(scene.graph.to_document(), before);
    }

    #[test]
    fn detached_edge_dropped_in_empty_space_stays_removed() {
        let mut scene = Scene::new();
        scene.drag(A_OUT, B_IN);
        scene.drag(B_IN, EMPTY);

        assert_eq!(scene.graph.edge_count(), 0);
        assert_eq!(scene.history.undo_description(), Some("Disconnect"));
        scene.key(Key::Z, command());
        assert_eq!(scene.edges(), vec![(scene.a, scene.b)]);
    }

    #[test]
    fn occupied_input_is_replaced_in_one_step() {
        let mut scene = Scene::new();
        scene.drag(A_OUT, C_IN);
        scene.drag(C_OUT, B_IN);
        assert_eq!(scene.edges(), vec![(scene.a, scene.c), (scene.c, scene.b)]);

        scene.drag(A_OUT, B_IN);
        assert_eq!(scene.edges(), vec![(scene.a, scene.c), (scene.a, scene.b)]);
        assert_eq!(scene.history.undo_description(), Some("Replace Connection"));

        scene.key(Key::Z, command());
        assert_eq!(scene.edges(), vec![(scene.a, scene.c), (scene.c, scene.b)]);
    }

    #[test]
    fn incompatible_datatypes_are_rejected() {
        let mut registry = NodeRegistry::new();
        registry
            .register(
                "typed",
                NodeType::new("Typed")
                    .with_input(PortSpec::new("in", "string"))
                    .with_output(PortSpec::new("out", "number")),
            )
            .unwrap();
        let mut graph = Graph::with_id_generator(Hooks::new(), Arc::new(SequentialIds::new()));
        graph.add_node(&registry, "typed", NodeOverrides::default()).unwrap();
        graph
            .add_node(&registry, "typed", NodeOverrides::default().at(300.0, 0.0))
            .unwrap();
        let mut history = CommandStack::new();
        let mut controller = Controller::default();

        controller.pointer_down(PointerEvent::primary(A_OUT), &mut graph);
        controller.pointer_up(PointerEvent::primary(B_IN), &mut graph, &mut history);

        assert_eq!(graph.edge_count(), 0);
        assert!(!history.can_undo());
    }

    #[test]
    fn resize_from_handle_is_floored_and_recorded() {
        let mut scene = Scene::new();
        scene.down(A_HANDLE);
        assert!(matches!(scene.controller.gesture(), Gesture::ResizingNode { .. }));

        scene.moved(A_HANDLE + Vec2::new(40.0, 20.0));
        assert_eq!(scene.graph.node(scene.a).unwrap().size, [200.0, 80.0]);

        scene.moved(A_HANDLE - Vec2::new(500.0, 500.0));
        scene.up(A_HANDLE - Vec2::new(500.0, 500.0));
        assert_eq!(scene.graph.node(scene.a).unwrap().size, MIN_NODE_SIZE);
        assert_eq!(scene.history.undo_description(), Some("Resize Node"));
        assert_eq!(scene.graph.node(scene.a).unwrap().position, [0.0, 0.0]);
    }

    #[test]
    fn empty_canvas_pans_and_clears_selection() {
        let mut scene = Scene::new();
        scene.drag(A_BODY, A_BODY);
        scene.down(EMPTY);
        assert!(scene.controller.selection().is_empty());
        scene.moved(EMPTY + Vec2::new(15.0, -5.0));
        scene.up(EMPTY + Vec2::new(15.0, -5.0));

        assert_eq!(scene.controller.viewport().offset, Vec2::new(15.0, -5.0));
        assert_eq!(scene.history.undo_depth(), 0);
    }

    #[test]
    fn middle_button_pans_over_nodes() {
        let mut scene = Scene::new();
        scene.down_with(PointerEvent::primary(A_BODY).with_button(PointerButton::Middle));
        assert!(matches!(scene.controller.gesture(), Gesture::Panning { .. }));
        assert_eq!(scene.controller.cursor_icon(), CursorIcon::Move);
        scene.moved(A_BODY + Vec2::new(5.0, 5.0));
        assert_eq!(scene.graph.node(scene.a).unwrap().position, [0.0, 0.0]);
    }

    #[test]
    fn wheel_zoom_keeps_point_under_cursor() {
        let mut scene = Scene::new();
        let cursor = Pos2::new(123.0, 456.0);
        let before = scene.controller.viewport().screen_to_world(cursor);

        assert!(scene.controller.wheel(-120.0, cursor));
        assert!(scene.controller.viewport().scale > 1.0);
        let after = scene.controller.viewport().screen_to_world(cursor);
        assert!((before - after).length() < 1e-3);
    }

    #[test]
    fn delete_removes_selection_and_undo_restores_edges() {
        let mut scene = Scene::new();
        scene.drag(A_OUT, B_IN);
        scene.drag(A_OUT, C_IN);
        let before = scene.graph.to_document();

        scene.drag(A_BODY, A_BODY);
        assert!(scene.key(Key::Delete, Modifiers::NONE));
        assert!(scene.graph.node(scene.a).is_none());
        assert_eq!(scene.graph.edge_count(), 0);
        assert!(scene.controller.selection().is_empty());

        scene.key(Key::Z, command());
        assert_eq!(scene.graph.to_document(), before);
        assert!(!scene.key(Key::Delete, Modifiers::NONE));
    }

    #[test]
    fn redo_bindings() {
        let mut scene = Scene::new();
        scene.drag(A_OUT, B_IN);
        scene.key(Key::Z, command());
        assert_eq!(scene.graph.edge_count(), 0);

        let shift_command = Modifiers {
            shift: true,
            ..command()
        };
        scene.key(Key::Z, shift_command);
        assert_eq!(scene.graph.edge_count(), 1);

        scene.key(Key::Z, command());
        scene.key(Key::Y, command());
        assert_eq!(scene.graph.edge_count(), 1);
    }

    #[test]
    fn escape_reverts_live_drag() {
        let mut scene = Scene::new();
        scene.down(A_BODY);
        scene.moved(A_BODY + Vec2::new(100.0, 100.0));
        assert_eq!(scene.graph.node(scene.a).unwrap().position, [100.0, 100.0]);

        assert!(scene.key(Key::Escape, Modifiers::NONE));
        assert_eq!(scene.graph.node(scene.a).unwrap().position, [0.0, 0.0]);
        assert!(scene.controller.gesture().is_idle());
        scene.up(A_BODY + Vec2::new(100.0, 100.0));
        assert_eq!(scene.history.undo_depth(), 0);
    }

    #[test]
    fn undo_during_drag_cancels_it_first() {
        let mut scene = Scene::new();
        scene.drag(A_OUT, B_IN);
        scene.down(A_BODY);
        scene.moved(A_BODY + Vec2::new(30.0, 0.0));

        scene.key(Key::Z, command());
        assert!(scene.controller.gesture().is_idle());
        assert_eq!(scene.graph.node(scene.a).unwrap().position, [0.0, 0.0]);
        assert_eq!(scene.graph.edge_count(), 0);
    }

    #[test]
    fn node_removed_mid_drag_aborts_silently() {
        let mut scene = Scene::new();
        scene.down(A_BODY);
        scene.graph.remove_node(scene.a);

        scene.moved(A_BODY + Vec2::new(10.0, 10.0));
        assert!(scene.controller.gesture().is_idle());
        scene.up(A_BODY + Vec2::new(10.0, 10.0));
        assert_eq!(scene.history.undo_depth(), 0);
    }

    #[test]
    fn hover_cursor_feedback() {
        let mut scene = Scene::new();
        scene.moved(A_OUT);
        assert_eq!(scene.controller.hovered_port().unwrap().node, scene.a);
        assert_eq!(scene.controller.cursor_icon(), CursorIcon::Grab);

        scene.moved(A_HANDLE);
        assert_eq!(scene.controller.cursor_icon(), CursorIcon::ResizeNwSe);

        scene.moved(EMPTY);
        assert_eq!(scene.controller.cursor_icon(), CursorIcon::Default);
    }
}
