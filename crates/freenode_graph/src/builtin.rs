// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types registered by every editor.

use crate::error::RegistryError;
use crate::node::{BehaviorResult, Node, NodeBehavior, NodeRegistry, NodeState, NodeType};
use crate::port::{PortSpec, PortValue};
use crate::runner::ExecutionContext;
use egui::{Align2, Color32, FontId, Rect, Vec2};
use serde_json::Value;

/// Free text that echoes its input in upper case
pub const NOTE: &str = "core/Note";
/// Emits the value stored in its state
pub const CONSTANT: &str = "core/Constant";
/// Emits 1, 2, 3, ... one step per cycle
pub const COUNTER: &str = "core/Counter";
/// Sums two numbers
pub const ADD: &str = "core/Add";
/// Keeps the last value it received
pub const LOG: &str = "core/Log";

/// Register every built-in type. Types without their own size use `default_size`.
pub fn register_builtins(registry: &mut NodeRegistry, default_size: [f32; 2]) -> Result<(), RegistryError> {
    let [w, h] = default_size;

    registry.register(
        NOTE,
        NodeType::new("Note")
            .with_size(180.0, 80.0)
            .with_input(PortSpec::any("in"))
            .with_output(PortSpec::any("out"))
            .with_behavior(Note),
    )?;
    registry.register(
        CONSTANT,
        NodeType::new("Constant")
            .with_size(w, h)
            .with_output(PortSpec::any("value"))
            .with_behavior(Constant),
    )?;
    registry.register(
        COUNTER,
        NodeType::new("Counter")
            .with_size(w, h)
            .with_output(PortSpec::new("count", "number"))
            .with_behavior(Counter),
    )?;
    registry.register(
        ADD,
        NodeType::new("Add")
            .with_size(w, h.max(80.0))
            .with_input(PortSpec::new("a", "number"))
            .with_input(PortSpec::new("b", "number"))
            .with_output(PortSpec::new("sum", "number"))
            .with_behavior(Add),
    )?;
    registry.register(
        LOG,
        NodeType::new("Log")
            .with_size(w, h)
            .with_input(PortSpec::any("in"))
            .with_behavior(Log),
    )?;

    tracing::debug!(types = registry.len(), "registered built-in node types");
    Ok(())
}

struct Note;

impl NodeBehavior for Note {
    fn on_create(&self, state: &mut NodeState) {
        state.insert("text".into(), "hello".into());
    }

    fn on_execute(&self, state: &mut NodeState, ctx: &mut ExecutionContext<'_>) -> BehaviorResult {
        let elapsed = state.get("elapsed").and_then(Value::as_f64).unwrap_or(0.0) + f64::from(ctx.dt());
        state.insert("elapsed".into(), elapsed.into());

        let text = match ctx.get_input("in") {
            Some(value) => value.to_text(),
            None => state.get("text").and_then(Value::as_str).unwrap_or_default().to_string(),
        };
        // Heartbeat so a running graph visibly changes.
        let heartbeat = (elapsed as u64) % 100;
        ctx.set_output("out", format!("{} · {heartbeat}", text.to_uppercase()));
        Ok(())
    }

    fn on_draw(&self, node: &Node, painter: &egui::Painter, screen_rect: Rect) {
        let text = node.state.get("text").and_then(Value::as_str).unwrap_or("hello");
        painter.text(
            screen_rect.left_top() + Vec2::new(8.0, 40.0),
            Align2::LEFT_TOP,
            text,
            FontId::proportional(11.0),
            Color32::from_gray(220),
        );
    }
}

struct Constant;

impl NodeBehavior for Constant {
    fn on_create(&self, state: &mut NodeState) {
        state.insert("value".into(), 0.into());
    }

    fn on_execute(&self, state: &mut NodeState, ctx: &mut ExecutionContext<'_>) -> BehaviorResult {
        let value = state.get("value").cloned().unwrap_or(Value::Null);
        ctx.set_output("value", value);
        Ok(())
    }
}

struct Counter;

impl NodeBehavior for Counter {
    fn on_create(&self, state: &mut NodeState) {
        state.insert("count".into(), 0.into());
        state.insert("step".into(), 1.into());
    }

    fn on_execute(&self, state: &mut NodeState, ctx: &mut ExecutionContext<'_>) -> BehaviorResult {
        let step = state.get("step").and_then(Value::as_i64).unwrap_or(1);
        let count = state.get("count").and_then(Value::as_i64).unwrap_or(0) + step;
        state.insert("count".into(), count.into());
        ctx.set_output("count", count);
        Ok(())
    }
}

struct Add;

impl NodeBehavior for Add {
    fn on_execute(&self, _state: &mut NodeState, ctx: &mut ExecutionContext<'_>) -> BehaviorResult {
        let operand = |value: Option<PortValue>| -> Result<f64, String> {
            match value {
                None => Ok(0.0),
                Some(v) => v.as_f64().ok_or_else(|| format!("not a number: {}", v.to_text())),
            }
        };
        let sum = operand(ctx.get_input("a"))? + operand(ctx.get_input("b"))?;
        ctx.set_output("sum", sum);
        Ok(())
    }
}

struct Log;

impl NodeBehavior for Log {
    fn on_execute(&self, state: &mut NodeState, ctx: &mut ExecutionContext<'_>) -> BehaviorResult {
        let last = ctx.get_input("in").map_or(Value::Null, |v| v.to_json());
        if !last.is_null() {
            tracing::debug!(node = %ctx.node_id(), value = %last, "log");
        }
        state.insert("last".into(), last);
        Ok(())
    }
}
