// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cycle-based graph execution.
//!
//! One cycle runs every node's behavior once, in graph insertion order, then
//! swaps the value buffers exactly once. Because writes land in the next
//! buffer, every node in a cycle sees the same snapshot of upstream values no
//! matter where it sits in the iteration order.

use crate::buffer::ValueBuffers;
use crate::edge::Edge;
use crate::error::NodeExecutionError;
use crate::events::{GraphEvent, Hooks};
use crate::graph::{read_input, Graph};
use crate::ids::{EdgeId, NodeId, PortId};
use crate::node::NodeRegistry;
use crate::port::{Port, PortValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

/// Payload of `runner:tick`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickInfo {
    /// Host timestamp of the frame
    pub time: Duration,
    /// Seconds since the previous frame, 0 on the first
    pub dt: f32,
    /// Whether the runner is running
    pub running: bool,
    /// Cycles executed this frame
    pub cycles_per_tick: u32,
}

/// What a node behavior can see and do during one execution
pub struct ExecutionContext<'a> {
    node_id: NodeId,
    node_type: &'a str,
    inputs: &'a [Port],
    outputs: &'a [Port],
    edges: &'a IndexMap<EdgeId, Edge>,
    values: &'a mut ValueBuffers,
    dt: f32,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn new(
        node_id: NodeId,
        node_type: &'a str,
        inputs: &'a [Port],
        outputs: &'a [Port],
        edges: &'a IndexMap<EdgeId, Edge>,
        values: &'a mut ValueBuffers,
        dt: f32,
    ) -> Self {
        Self {
            node_id,
            node_type,
            inputs,
            outputs,
            edges,
            values,
            dt,
        }
    }

    /// Seconds elapsed since the previous tick
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// The executing node
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The executing node's type name
    pub fn node_type(&self) -> &str {
        self.node_type
    }

    /// Read the previous cycle's value on an input.
    ///
    /// An unknown name falls back to the first input port.
    pub fn get_input(&self, port_name: &str) -> Option<PortValue> {
        let port = resolve_port(self.inputs, port_name)?;
        read_input(self.edges, self.values, self.node_id, port).cloned()
    }

    /// Write a value on an output; readers see it next cycle.
    ///
    /// An unknown name falls back to the first output port.
    pub fn set_output(&mut self, port_name: &str, value: impl Into<PortValue>) {
        if let Some(port) = resolve_port(self.outputs, port_name) {
            self.values.write((self.node_id, port), value.into());
        }
    }
}

fn resolve_port(ports: &[Port], name: &str) -> Option<PortId> {
    if let Some(port) = ports.iter().find(|p| p.name == name) {
        return Some(port.id);
    }
    let first = ports.first()?;
    tracing::trace!(requested = name, used = %first.name, "port name not found, using first port");
    Some(first.id)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RunnerState {
    Idle,
    Running { last_tick: Option<Duration> },
}

/// Drives repeated execution cycles over a graph
#[derive(Debug)]
pub struct Runner {
    state: RunnerState,
    cycles_per_tick: u32,
    hooks: Hooks,
}

impl Runner {
    /// Create an idle runner
    pub fn new(hooks: Hooks, cycles_per_tick: u32) -> Self {
        Self {
            state: RunnerState::Idle,
            cycles_per_tick: cycles_per_tick.max(1),
            hooks,
        }
    }

    /// Whether the frame loop is active
    pub fn is_running(&self) -> bool {
        matches!(self.state, RunnerState::Running { .. })
    }

    /// Cycles executed per frame
    pub fn cycles_per_tick(&self) -> u32 {
        self.cycles_per_tick
    }

    /// Change cycles per frame (at least 1); applies from the next frame
    pub fn set_cycles_per_tick(&mut self, cycles: u32) {
        self.cycles_per_tick = cycles.max(1);
    }

    /// Run `cycles` full cycles synchronously.
    ///
    /// Node failures are reported on the `error` channel and returned, but
    /// never stop the cycle or the buffer swap.
    pub fn step(
        &self,
        graph: &mut Graph,
        registry: &NodeRegistry,
        cycles: u32,
        dt: f32,
    ) -> Vec<NodeExecutionError> {
        let mut failures = Vec::new();

        for _ in 0..cycles.max(1) {
            let order: Vec<NodeId> = graph.node_ids().collect();
            for node_id in order {
                if let Some(err) = execute_node(graph, registry, node_id, dt) {
                    tracing::warn!(node = %err.node, node_type = %err.node_type, "{}", err.message);
                    self.hooks.emit(&mut GraphEvent::Error(&err));
                    failures.push(err);
                }
            }
            graph.swap_buffers();
        }

        failures
    }

    /// Begin ticking. No-op if already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.state = RunnerState::Running { last_tick: None };
        tracing::info!(cycles_per_tick = self.cycles_per_tick, "runner started");
        self.hooks.emit(&mut GraphEvent::RunnerStart);
    }

    /// Stop ticking and forget the timestamp baseline. No-op if not running.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.state = RunnerState::Idle;
        tracing::info!("runner stopped");
        self.hooks.emit(&mut GraphEvent::RunnerStop);
    }

    /// Host per-frame callback.
    ///
    /// Returns the tick record, or `None` when the runner is idle.
    pub fn frame(&mut self, graph: &mut Graph, registry: &NodeRegistry, now: Duration) -> Option<TickInfo> {
        let RunnerState::Running { last_tick } = self.state else {
            return None;
        };

        let dt = last_tick.map_or(0.0, |last| now.saturating_sub(last).as_secs_f32());
        self.state = RunnerState::Running { last_tick: Some(now) };

        let cycles = self.cycles_per_tick;
        self.step(graph, registry, cycles, dt);

        let info = TickInfo {
            time: now,
            dt,
            running: true,
            cycles_per_tick: cycles,
        };
        self.hooks.emit(&mut GraphEvent::RunnerTick(info));
        Some(info)
    }
}

fn execute_node(
    graph: &mut Graph,
    registry: &NodeRegistry,
    node_id: NodeId,
    dt: f32,
) -> Option<NodeExecutionError> {
    let node_type = graph.node(node_id)?.node_type.clone();
    let Ok(def) = registry.lookup(&node_type) else {
        tracing::trace!(node = %node_id, node_type = %node_type, "skipping node of unregistered type");
        return None;
    };
    let behavior = &def.behavior;
    let (state, mut ctx) = graph.execution_parts(node_id, dt)?;

    let message = match panic::catch_unwind(AssertUnwindSafe(|| behavior.on_execute(state, &mut ctx))) {
        Ok(Ok(())) => return None,
        Ok(Err(err)) => err.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };

    Some(NodeExecutionError {
        node: node_id,
        node_type,
        message,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "node behavior panicked".to_string()
    }
}
