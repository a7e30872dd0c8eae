// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.

use crate::port::{Port, PortId, PortRef, PortValue};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Identifier of a node, unique within its node system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Value sources
    Input,
    /// Value sinks
    Output,
    /// Logic/flow control
    Logic,
    /// Utility nodes
    Utility,
    /// Custom/user-defined
    Custom,
}

/// A value arriving at one of a node's input ports
#[derive(Debug, Clone, Copy)]
pub struct PortPush<'a> {
    /// Port the value was pushed from
    pub source: PortRef,
    /// Port on the receiving node
    pub target: PortId,
    /// Pushed value
    pub value: &'a PortValue,
}

/// Values a node emits on its own output ports while handling a push
#[derive(Debug, Default)]
pub struct Outbox {
    pushes: Vec<(PortId, PortValue)>,
}

impl Outbox {
    /// Create an empty outbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a value on one of the node's output ports
    pub fn push(&mut self, port: PortId, value: impl Into<PortValue>) {
        self.pushes.push((port, value.into()));
    }

    /// Whether nothing was queued
    pub fn is_empty(&self) -> bool {
        self.pushes.is_empty()
    }

    /// Take the queued values in emission order
    pub fn drain(&mut self) -> std::vec::Drain<'_, (PortId, PortValue)> {
        self.pushes.drain(..)
    }
}

/// Error raised by a node while handling a push
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Value of an unexpected type arrived
    #[error("Port {port} expected {expected}, got {got}")]
    TypeMismatch {
        /// Receiving port
        port: PortId,
        /// Expected type name
        expected: &'static str,
        /// Received value
        got: PortValue,
    },

    /// Push arrived on a port the node does not handle
    #[error("Unexpected push on port {0}")]
    UnexpectedPort(PortId),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

/// Per-kind node behaviour.
///
/// Implementors declare their port shape once, react to pushes and persist
/// their fields as JSON.
pub trait NodeBehavior: Any + fmt::Debug {
    /// Type discriminator written to graph documents
    fn kind(&self) -> &'static str;

    /// Ports created when the node is constructed
    fn ports(&self) -> Vec<Port>;

    /// Called when a value arrives at one of the node's input ports
    fn on_port_pushed(&mut self, push: PortPush<'_>, outbox: &mut Outbox) -> Result<(), NodeError>;

    /// Persistent fields
    fn save_fields(&self) -> serde_json::Value;

    /// Upcast for typed access
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed access
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A node instance in a node system
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    ports: Vec<Port>,
    behavior: Box<dyn NodeBehavior>,
}

impl Node {
    /// Create a node, fixing its port set from the behaviour's shape
    pub fn new(id: NodeId, behavior: Box<dyn NodeBehavior>) -> Self {
        let ports = behavior.ports();
        debug_assert!(
            ports
                .iter()
                .enumerate()
                .all(|(i, p)| ports[..i].iter().all(|q| q.id != p.id)),
            "duplicate port id on node kind {}",
            behavior.kind()
        );
        Self { id, ports, behavior }
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Type discriminator
    pub fn kind(&self) -> &'static str {
        self.behavior.kind()
    }

    /// All ports, in declaration order
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Get a port by ID
    pub fn port(&self, port_id: PortId) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == port_id)
    }

    /// Reference to one of this node's ports
    pub fn port_ref(&self, port_id: PortId) -> PortRef {
        PortRef::new(self.id, port_id)
    }

    /// Node behaviour
    pub fn behavior(&self) -> &dyn NodeBehavior {
        self.behavior.as_ref()
    }

    /// Mutable node behaviour
    pub fn behavior_mut(&mut self) -> &mut dyn NodeBehavior {
        self.behavior.as_mut()
    }
}

/// Constructor turning saved fields into a behaviour
pub type NodeFactory = fn(serde_json::Value) -> Result<Box<dyn NodeBehavior>, serde_json::Error>;

/// Node type definition
#[derive(Debug, Clone)]
pub struct NodeType {
    /// Type discriminator
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Constructor
    pub factory: NodeFactory,
}

impl NodeType {
    /// Describe a kind whose fields are its serde representation.
    ///
    /// Missing or `null` fields fall back to `T::default()`.
    pub fn of<T>(
        id: impl Into<String>,
        name: impl Into<String>,
        category: NodeCategory,
        description: impl Into<String>,
    ) -> Self
    where
        T: NodeBehavior + DeserializeOwned + Default,
    {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: description.into(),
            factory: build_from_fields::<T>,
        }
    }

    /// Build a behaviour from saved fields
    pub fn build(&self, fields: serde_json::Value) -> Result<Box<dyn NodeBehavior>, serde_json::Error> {
        (self.factory)(fields)
    }
}

fn build_from_fields<T>(fields: serde_json::Value) -> Result<Box<dyn NodeBehavior>, serde_json::Error>
where
    T: NodeBehavior + DeserializeOwned + Default,
{
    if fields.is_null() {
        return Ok(Box::new(T::default()));
    }
    Ok(Box::new(serde_json::from_value::<T>(fields)?))
}

/// Registry of available node types
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type, replacing any type with the same ID
    pub fn register(&mut self, node_type: NodeType) {
        if self.types.contains_key(&node_type.id) {
            tracing::debug!("Replacing node type {}", node_type.id);
        }
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Whether a discriminator is known
    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create a behaviour with default fields
    pub fn create(&self, type_id: &str) -> Option<Box<dyn NodeBehavior>> {
        self.create_with_fields(type_id, serde_json::Value::Null)
            .and_then(Result::ok)
    }

    /// Create a behaviour from saved fields.
    ///
    /// Returns `None` for unknown discriminators.
    pub fn create_with_fields(
        &self,
        type_id: &str,
        fields: serde_json::Value,
    ) -> Option<Result<Box<dyn NodeBehavior>, serde_json::Error>> {
        self.get(type_id).map(|t| t.build(fields))
    }
}
