// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named notification channels.
//!
//! [`Hooks`] is a cheaply clonable publish/subscribe bus shared by the graph,
//! the runner and the controller. Delivery is synchronous: every handler for
//! an event runs to completion, in registration order, before the next one is
//! invoked and before the emitting call returns. Handlers receive the event
//! mutably, which is how `graph:serialize` observers augment a document after
//! it is built and before it is returned.

use crate::document::GraphDocument;
use crate::edge::Edge;
use crate::error::NodeExecutionError;
use crate::node::Node;
use crate::runner::TickInfo;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Notification channel names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A node was added to the graph
    NodeCreate,
    /// A node's position changed
    NodeMove,
    /// A node's size changed
    NodeResize,
    /// An edge was added
    EdgeCreate,
    /// An edge was removed
    EdgeDelete,
    /// A document was produced from the graph
    GraphSerialize,
    /// A node's execution behavior failed
    Error,
    /// The runner started ticking
    RunnerStart,
    /// The runner stopped ticking
    RunnerStop,
    /// The runner completed a frame
    RunnerTick,
}

impl EventKind {
    /// Wire name of the channel
    pub fn name(self) -> &'static str {
        match self {
            Self::NodeCreate => "node:create",
            Self::NodeMove => "node:move",
            Self::NodeResize => "node:resize",
            Self::EdgeCreate => "edge:create",
            Self::EdgeDelete => "edge:delete",
            Self::GraphSerialize => "graph:serialize",
            Self::Error => "error",
            Self::RunnerStart => "runner:start",
            Self::RunnerStop => "runner:stop",
            Self::RunnerTick => "runner:tick",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A notification together with its payload
#[derive(Debug)]
pub enum GraphEvent<'a> {
    /// `node:create`
    NodeCreate(&'a Node),
    /// `node:move`
    NodeMove(&'a Node),
    /// `node:resize`
    NodeResize(&'a Node),
    /// `edge:create`
    EdgeCreate(&'a Edge),
    /// `edge:delete`
    EdgeDelete(&'a Edge),
    /// `graph:serialize`; handlers may edit the document
    GraphSerialize(&'a mut GraphDocument),
    /// `error`
    Error(&'a NodeExecutionError),
    /// `runner:start`
    RunnerStart,
    /// `runner:stop`
    RunnerStop,
    /// `runner:tick`
    RunnerTick(TickInfo),
}

impl GraphEvent<'_> {
    /// Channel this event is delivered on
    pub fn kind(&self) -> EventKind {
        match self {
            Self::NodeCreate(_) => EventKind::NodeCreate,
            Self::NodeMove(_) => EventKind::NodeMove,
            Self::NodeResize(_) => EventKind::NodeResize,
            Self::EdgeCreate(_) => EventKind::EdgeCreate,
            Self::EdgeDelete(_) => EventKind::EdgeDelete,
            Self::GraphSerialize(_) => EventKind::GraphSerialize,
            Self::Error(_) => EventKind::Error,
            Self::RunnerStart => EventKind::RunnerStart,
            Self::RunnerStop => EventKind::RunnerStop,
            Self::RunnerTick(_) => EventKind::RunnerTick,
        }
    }
}

/// Handle returned by [`Hooks::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&mut GraphEvent<'_>) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
}

#[derive(Default)]
struct HooksInner {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

/// Shared notification bus
#[derive(Clone, Default)]
pub struct Hooks {
    inner: Arc<HooksInner>,
}

impl Hooks {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a channel
    pub fn on<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&mut GraphEvent<'_>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.subscriptions.write().push(Subscription {
            id,
            kind,
            handler: Arc::new(handler),
        });
        id
    }

    /// Unsubscribe. Returns false if the id was not subscribed.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.inner.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    /// Number of handlers listening on a channel
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.kind == kind)
            .count()
    }

    /// Deliver an event to every subscriber of its channel, in order
    pub fn emit(&self, event: &mut GraphEvent<'_>) {
        let kind = event.kind();
        // Snapshot so handlers may (un)subscribe without deadlocking.
        let handlers: Vec<Handler> = self
            .inner
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| Arc::clone(&s.handler))
            .collect();

        for handler in handlers {
            handler(&mut *event);
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("subscriptions", &self.inner.subscriptions.read().len())
            .finish()
    }
}
