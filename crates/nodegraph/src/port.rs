// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a port, unique within its owning node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortId(pub u32);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address of a port inside a node system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortRef {
    /// Owning node
    pub node: NodeId,
    /// Port on that node
    pub port: PortId,
}

impl PortRef {
    /// Create a port reference
    pub fn new(node: NodeId, port: PortId) -> Self {
        Self { node, port }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.node, self.port)
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
    /// Port that can both receive and emit values
    Both,
}

impl PortDirection {
    /// Whether the port carries the input flag
    pub fn is_input(self) -> bool {
        matches!(self, Self::Input | Self::Both)
    }

    /// Whether the port carries the output flag
    pub fn is_output(self) -> bool {
        matches!(self, Self::Output | Self::Both)
    }
}

/// Data type that can flow through ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortType {
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// String value
    String,
    /// Any type (for generic nodes)
    Any,
}

impl PortType {
    /// Check if this type can connect to another type
    pub fn can_connect_to(self, other: PortType) -> bool {
        if self == Self::Any || other == Self::Any || self == other {
            return true;
        }

        // Numeric conversions
        matches!(
            (self, other),
            (Self::Int, Self::Float) | (Self::Float, Self::Int)
        )
    }

    /// Check if a value may travel through a port of this type
    pub fn accepts(self, value: &PortValue) -> bool {
        self.can_connect_to(value.port_type())
    }
}

/// A port on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port ID, unique within the node
    pub id: PortId,
    /// Port name
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Data type
    pub port_type: PortType,
    /// Whether multiple connections are allowed
    pub multi_connect: bool,
}

impl Port {
    /// Create a new port
    pub fn new(
        id: u32,
        name: impl Into<String>,
        port_type: PortType,
        direction: PortDirection,
    ) -> Self {
        let multi_connect = direction == PortDirection::Output;
        Self {
            id: PortId(id),
            name: name.into(),
            direction,
            port_type,
            multi_connect,
        }
    }

    /// Create a new input port (single connection)
    pub fn input(id: u32, name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(id, name, port_type, PortDirection::Input)
    }

    /// Create a new output port
    pub fn output(id: u32, name: impl Into<String>, port_type: PortType) -> Self {
        // Outputs can have multiple connections by default
        Self::new(id, name, port_type, PortDirection::Output)
    }

    /// Override the multiplicity flag
    pub fn with_multi_connect(mut self, multi_connect: bool) -> Self {
        self.multi_connect = multi_connect;
        self
    }

    /// Whether a connection between `self` and `other` has a valid direction.
    ///
    /// Exactly one side must carry the output flag and the other side the
    /// input flag. A port shares its own direction, so it is never suitable
    /// for itself; connecting a [`PortRef`] to itself is rejected by
    /// [`NodeSystem::connect`](crate::NodeSystem::connect).
    pub fn is_suitable(&self, other: &Port) -> bool {
        let (a, b) = (self.direction, other.direction);
        (a.is_output() && !b.is_output() && b.is_input())
            || (b.is_output() && !a.is_output() && a.is_input())
    }

    /// Check if a connection to another port is valid (direction and type)
    pub fn can_connect(&self, other: &Port) -> bool {
        self.is_suitable(other) && self.port_type.can_connect_to(other.port_type)
    }
}

/// Value that travels along connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    String(String),
}

impl PortValue {
    /// Get the port type for this value
    pub fn port_type(&self) -> PortType {
        match self {
            Self::Bool(_) => PortType::Bool,
            Self::Int(_) => PortType::Int,
            Self::Float(_) => PortType::Float,
            Self::String(_) => PortType::String,
        }
    }
}

impl From<&str> for PortValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PortValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PortValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for PortValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl fmt::Display for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
        }
    }
}
