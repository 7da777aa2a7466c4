// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node and port bounds, hit testing, and the screen/world viewport.
//!
//! Everything here is a pure function of node geometry. Rendering and the
//! controller share these so what is drawn is exactly what is clickable.

use crate::graph::Graph;
use crate::ids::{NodeId, PortId};
use crate::node::Node;
use crate::port::{Port, PortDirection};
use egui::{Pos2, Rect, Vec2};

/// Width of a port's hit region, sticking out of the node's side
pub const PORT_PAD: f32 = 8.0;
/// Vertical distance between consecutive ports
pub const PORT_ROW: f32 = 20.0;
/// Offset of the first port below the node's top edge
pub const PORT_TOP: f32 = 28.0;
/// Height of a port's hit region
pub const PORT_HEIGHT: f32 = 14.0;
/// Default side length of the resize handle, in world units
pub const RESIZE_HANDLE: f32 = 10.0;

/// Default zoom limits
pub const MIN_SCALE: f32 = 0.25;
/// Default zoom limits
pub const MAX_SCALE: f32 = 3.0;

/// Bounding rectangle of a node in world space
pub fn node_rect(node: &Node) -> Rect {
    Rect::from_min_size(
        Pos2::new(node.position[0], node.position[1]),
        Vec2::new(node.size[0], node.size[1]),
    )
}

/// Hit region of the `index`-th port in `direction`, in world space
pub fn port_rect(node: &Node, index: usize, direction: PortDirection) -> Rect {
    let y = node.position[1] + PORT_TOP + index as f32 * PORT_ROW;
    let x = match direction {
        PortDirection::Input => node.position[0] - PORT_PAD,
        PortDirection::Output => node.position[0] + node.size[0],
    };
    Rect::from_min_size(Pos2::new(x, y), Vec2::new(PORT_PAD, PORT_HEIGHT))
}

/// Point on the node border where edges attach to a port
pub fn port_anchor(node: &Node, index: usize, direction: PortDirection) -> Pos2 {
    let rect = port_rect(node, index, direction);
    match direction {
        PortDirection::Input => rect.right_center(),
        PortDirection::Output => rect.left_center(),
    }
}

/// Square handle at the node's bottom-right corner
pub fn resize_handle_rect(node: &Node, handle: f32) -> Rect {
    let max = node_rect(node).max;
    Rect::from_min_max(max - Vec2::splat(handle), max)
}

/// Check whether a world point lies on a node
pub fn hit_test_node(node: &Node, world: Pos2) -> bool {
    node_rect(node).contains(world)
}

/// A port found under the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortHit {
    /// Owning node
    pub node: NodeId,
    /// The port
    pub port: PortId,
    /// Input or output
    pub direction: PortDirection,
    /// Index within the node's ports of that direction
    pub index: usize,
}

/// Topmost node containing a world point (last inserted wins)
pub fn find_node_at(graph: &Graph, world: Pos2) -> Option<NodeId> {
    graph
        .nodes()
        .rev()
        .find(|node| hit_test_node(node, world))
        .map(|node| node.id)
}

/// Topmost port whose hit region contains a world point
pub fn find_port_at(graph: &Graph, world: Pos2) -> Option<PortHit> {
    graph.nodes().rev().find_map(|node| {
        let hit = |ports: &[Port], direction: PortDirection| {
            ports.iter().enumerate().find_map(|(index, port)| {
                port_rect(node, index, direction)
                    .contains(world)
                    .then_some(PortHit {
                        node: node.id,
                        port: port.id,
                        direction,
                        index,
                    })
            })
        };
        hit(&node.inputs, PortDirection::Input).or_else(|| hit(&node.outputs, PortDirection::Output))
    })
}

/// Screen/world transform with clamped zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Screen-space translation
    pub offset: Vec2,
    /// Screen pixels per world unit
    pub scale: f32,
    /// Smallest allowed scale
    pub min_scale: f32,
    /// Largest allowed scale
    pub max_scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(MIN_SCALE, MAX_SCALE)
    }
}

impl Viewport {
    /// Identity viewport with the given zoom limits
    pub fn new(min_scale: f32, max_scale: f32) -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0_f32.clamp(min_scale, max_scale),
            min_scale,
            max_scale,
        }
    }

    /// Convert a screen position to world space
    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        ((screen.to_vec2() - self.offset) / self.scale).to_pos2()
    }

    /// Convert a world position to screen space
    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        (world.to_vec2() * self.scale + self.offset).to_pos2()
    }

    /// Translate by a screen-space delta
    pub fn pan_by(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Set the scale (clamped) keeping the offset
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale.clamp(self.min_scale, self.max_scale);
    }

    /// Zoom by `factor` about a screen point, keeping the world point under
    /// it fixed. Returns false if the clamped scale did not change.
    pub fn zoom_at(&mut self, factor: f32, cursor: Pos2) -> bool {
        let previous = self.scale;
        let next = (previous * factor).clamp(self.min_scale, self.max_scale);
        if next == previous {
            return false;
        }
        let world = self.screen_to_world(cursor);
        self.offset = cursor.to_vec2() - world.to_vec2() * next;
        self.scale = next;
        true
    }
}
