// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dataflow graph editor core.
//!
//! This crate provides everything an interactive node editor needs except
//! the pixels:
//! - Typed nodes with named input/output ports
//! - A double-buffered, cycle-based runner
//! - A pointer gesture controller (pan, drag, connect, resize)
//! - Command-based undo/redo
//! - JSON documents and RON settings
//!
//! ## Architecture
//!
//! The [`Graph`] owns nodes, edges and the port value buffers. The
//! [`Runner`] executes every node once per cycle, reading values from the
//! previous cycle and writing the next, then swaps the buffers. The
//! [`Controller`] resolves pointer input into gestures and records finished
//! gestures on the [`CommandStack`]. All of them report through a shared
//! [`Hooks`] bus. [`GraphEditor`] bundles the lot.

pub mod buffer;
pub mod builtin;
pub mod command;
pub mod config;
pub mod controller;
pub mod document;
pub mod edge;
pub mod editor;
pub mod error;
pub mod events;
pub mod geometry;
pub mod graph;
pub mod ids;
pub mod node;
pub mod port;
pub mod runner;

pub use command::{CommandStack, GraphCommand};
pub use config::EditorConfig;
pub use controller::{Controller, Gesture, PointerEvent};
pub use document::GraphDocument;
pub use edge::Edge;
pub use editor::GraphEditor;
pub use error::{CommandError, ConfigError, DocumentError, GraphError, NodeExecutionError, RegistryError};
pub use events::{EventKind, GraphEvent, Hooks, SubscriptionId};
pub use geometry::Viewport;
pub use graph::{Graph, NodeOverrides};
pub use ids::{EdgeId, IdGenerator, NodeId, PortId, RandomIds, SequentialIds};
pub use node::{Node, NodeBehavior, NodeRegistry, NodeState, NodeType};
pub use port::{Port, PortDirection, PortSpec, PortValue};
pub use runner::{ExecutionContext, Runner, TickInfo};
