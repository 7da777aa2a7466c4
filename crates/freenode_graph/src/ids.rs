// SPDX-License-Identifier: MIT OR Apache-2.0
//! Identifiers for nodes, ports and edges, and the service that mints them.
//!
//! Every id is a UUID newtype. The graph never creates ids on its own; it asks
//! the [`IdGenerator`] it was built with, so tests can plug in
//! [`SequentialIds`] and get stable, predictable ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a node
    NodeId
);
uuid_id!(
    /// Unique identifier for a port
    PortId
);
uuid_id!(
    /// Unique identifier for an edge
    EdgeId
);

/// Source of fresh identifiers for graph entities
pub trait IdGenerator: Send + Sync {
    /// Produce a UUID never handed out before by this generator
    fn next_uuid(&self) -> Uuid;

    /// Mint a node id
    fn node_id(&self) -> NodeId {
        NodeId(self.next_uuid())
    }

    /// Mint a port id
    fn port_id(&self) -> PortId {
        PortId(self.next_uuid())
    }

    /// Mint an edge id
    fn edge_id(&self) -> EdgeId {
        EdgeId(self.next_uuid())
    }
}

/// Random v4 UUIDs. The default generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Deterministic ids built from a counter, starting at 1.
#[derive(Debug)]
pub struct SequentialIds {
    counter: AtomicU64,
}

impl SequentialIds {
    /// Create a generator whose first id is `1`
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Create a generator whose first id is `first`
    pub fn starting_at(first: u64) -> Self {
        Self {
            counter: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIds {
    fn next_uuid(&self) -> Uuid {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Uuid::from_u128(u128::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_are_predictable() {
        let ids = SequentialIds::new();
        assert_eq!(ids.node_id(), NodeId(Uuid::from_u128(1)));
        assert_eq!(ids.port_id(), PortId(Uuid::from_u128(2)));
        assert_eq!(ids.edge_id(), EdgeId(Uuid::from_u128(3)));
    }

    #[test]
    fn random_ids_do_not_repeat() {
        let ids = RandomIds;
        assert_ne!(ids.node_id(), ids.node_id());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = NodeId(Uuid::from_u128(7));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", Uuid::from_u128(7)));
    }
}
