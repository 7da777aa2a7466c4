// SPDX-License-Identifier: MIT OR Apache-2.0
//! Double-buffered port value store.
//!
//! One buffer is "current" and only read during a cycle; the other is "next"
//! and only written. Swapping promotes next to current and empties the new
//! next, so reads inside a cycle always observe the previous cycle's writes.

use crate::ids::{NodeId, PortId};
use crate::port::PortValue;
use std::collections::HashMap;

/// Key of a value slot: the producing node and its output port
pub type ValueKey = (NodeId, PortId);

/// Two value maps with a flip flag
#[derive(Debug, Clone, Default)]
pub struct ValueBuffers {
    a: HashMap<ValueKey, PortValue>,
    b: HashMap<ValueKey, PortValue>,
    b_is_current: bool,
}

impl ValueBuffers {
    /// Create empty buffers
    pub fn new() -> Self {
        Self::default()
    }

    /// The readable buffer
    pub fn current(&self) -> &HashMap<ValueKey, PortValue> {
        if self.b_is_current {
            &self.b
        } else {
            &self.a
        }
    }

    /// The writable buffer
    pub fn next(&self) -> &HashMap<ValueKey, PortValue> {
        if self.b_is_current {
            &self.a
        } else {
            &self.b
        }
    }

    /// Read a value produced during the previous cycle
    pub fn read(&self, key: &ValueKey) -> Option<&PortValue> {
        self.current().get(key)
    }

    /// Write a value that becomes visible after the next swap
    pub fn write(&mut self, key: ValueKey, value: PortValue) {
        let next = if self.b_is_current {
            &mut self.a
        } else {
            &mut self.b
        };
        next.insert(key, value);
    }

    /// Promote next to current and empty the new next buffer
    pub fn swap(&mut self) {
        self.b_is_current = !self.b_is_current;
        if self.b_is_current {
            self.a.clear();
        } else {
            self.b.clear();
        }
    }

    /// Drop every value produced by a node
    pub fn forget_node(&mut self, node_id: NodeId) {
        self.a.retain(|(node, _), _| *node != node_id);
        self.b.retain(|(node, _), _| *node != node_id);
    }

    /// Empty both buffers
    pub fn clear(&mut self) {
        self.a.clear();
        self.b.clear();
    }
}
