// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::ids::{IdGenerator, PortId};
use serde::{Deserialize, Serialize};

/// Datatype tag that is compatible with every other tag
pub const ANY_DATATYPE: &str = "any";

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    #[serde(rename = "in")]
    Input,
    /// Output port
    #[serde(rename = "out")]
    Output,
}

/// Check whether two nominal datatype tags may be wired together.
///
/// `"any"` on either side matches everything; otherwise the tags must be equal.
pub fn datatypes_compatible(from: &str, to: &str) -> bool {
    from == ANY_DATATYPE || to == ANY_DATATYPE || from == to
}

/// Port template carried by a node type definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port name
    pub name: String,
    /// Nominal datatype tag
    pub datatype: String,
}

impl PortSpec {
    /// Create a port spec with an explicit datatype tag
    pub fn new(name: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datatype: datatype.into(),
        }
    }

    /// Create a port spec accepting any datatype
    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, ANY_DATATYPE)
    }
}

/// A port on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Unique port ID
    pub id: PortId,
    /// Port name, unique within its node and direction
    pub name: String,
    /// Nominal datatype tag
    #[serde(default = "default_datatype")]
    pub datatype: String,
    /// Port direction
    #[serde(rename = "dir")]
    pub direction: PortDirection,
}

fn default_datatype() -> String {
    ANY_DATATYPE.to_string()
}

impl Port {
    /// Create a new port
    pub fn new(
        id: PortId,
        name: impl Into<String>,
        datatype: impl Into<String>,
        direction: PortDirection,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            datatype: datatype.into(),
            direction,
        }
    }

    /// Instantiate a port from its spec, minting a fresh id
    pub fn from_spec(spec: &PortSpec, direction: PortDirection, ids: &dyn IdGenerator) -> Self {
        Self::new(ids.port_id(), spec.name.clone(), spec.datatype.clone(), direction)
    }

    /// Check if a connection from this port to `other` is valid
    pub fn can_connect(&self, other: &Port) -> bool {
        self.direction == PortDirection::Output
            && other.direction == PortDirection::Input
            && datatypes_compatible(&self.datatype, &other.datatype)
    }
}

/// Value carried between ports during execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// 2D vector
    Vector2([f32; 2]),
    /// String
    String(String),
    /// Arbitrary structured data
    Json(serde_json::Value),
}

impl PortValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Bool(v) => Some(f64::from(u8::from(*v))),
            Self::Json(v) => v.as_f64(),
            Self::Vector2(_) | Self::String(_) => None,
        }
    }

    /// String view of the value, if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Json(v) => v.as_str(),
            _ => None,
        }
    }

    /// Convert to a JSON value, e.g. for storing in a node's state bag
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(v) => serde_json::Value::from(*v),
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Float(v) => serde_json::Value::from(*v),
            Self::Vector2(v) => serde_json::json!([v[0], v[1]]),
            Self::String(v) => serde_json::Value::from(v.as_str()),
            Self::Json(v) => v.clone(),
        }
    }

    /// Render the value as display text
    pub fn to_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Json(serde_json::Value::String(s)) => s.clone(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Vector2(v) => format!("({}, {})", v[0], v[1]),
            Self::Json(v) => v.to_string(),
        }
    }
}

impl From<f64> for PortValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for PortValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for PortValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for PortValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for PortValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<serde_json::Value> for PortValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}
