// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node system containing nodes and connections.

use crate::connection::Connection;
use crate::node::{Node, NodeBehavior, NodeId};
use crate::port::{Port, PortRef};
use indexmap::IndexMap;

/// A node graph: ordered nodes plus the connections between their ports
#[derive(Debug, Default)]
pub struct NodeSystem {
    /// Nodes in insertion order
    nodes: IndexMap<NodeId, Node>,
    /// Connections in creation order
    connections: Vec<Connection>,
}

impl NodeSystem {
    /// Create a new empty system
    pub fn new() -> Self {
        Self::default()
    }

    /// ID the next added node will receive.
    ///
    /// One past the highest ID in use. Once `u32::MAX` is taken, the lowest
    /// unused ID is handed out instead. `None` when every ID is taken.
    pub fn next_node_id(&self) -> Option<NodeId> {
        match self.nodes.keys().max() {
            None => Some(NodeId(0)),
            Some(max) => match max.0.checked_add(1) {
                Some(next) => Some(NodeId(next)),
                None => (0..=u32::MAX)
                    .map(NodeId)
                    .find(|id| !self.nodes.contains_key(id)),
            },
        }
    }

    /// Add a node with the next free ID.
    ///
    /// Returns `None`, leaving the system untouched, when no ID is free.
    pub fn add_node(&mut self, behavior: Box<dyn NodeBehavior>) -> Option<NodeId> {
        let Some(id) = self.next_node_id() else {
            tracing::warn!("No free node ID for {} node", behavior.kind());
            return None;
        };
        tracing::debug!("Adding {} node {}", behavior.kind(), id);
        self.nodes.insert(id, Node::new(id, behavior));
        Some(id)
    }

    /// Add a node with a fixed ID, as read from a document.
    ///
    /// Fails with the behaviour handed back if the ID is already taken.
    pub(crate) fn insert_node(
        &mut self,
        id: NodeId,
        behavior: Box<dyn NodeBehavior>,
    ) -> Result<(), Box<dyn NodeBehavior>> {
        if self.nodes.contains_key(&id) {
            return Err(behavior);
        }
        self.nodes.insert(id, Node::new(id, behavior));
        Ok(())
    }

    /// Remove a node and every connection touching its ports
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(&node_id)?;
        let before = self.connections.len();
        self.connections.retain(|c| !c.involves_node(node_id));
        tracing::debug!(
            "Removed node {} and {} connection(s)",
            node_id,
            before - self.connections.len()
        );
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Typed access to a node's behaviour
    pub fn behavior<T: NodeBehavior>(&self, node_id: NodeId) -> Option<&T> {
        self.node(node_id)?.behavior().as_any().downcast_ref::<T>()
    }

    /// Typed mutable access to a node's behaviour
    pub fn behavior_mut<T: NodeBehavior>(&mut self, node_id: NodeId) -> Option<&mut T> {
        self.node_mut(node_id)?
            .behavior_mut()
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Get all nodes, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs, in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Resolve a port reference to a live port
    pub fn port(&self, port: PortRef) -> Option<&Port> {
        self.node(port.node)?.port(port.port)
    }

    /// Connect two ports.
    ///
    /// The order of `a` and `b` does not matter.
    pub fn connect(&mut self, a: PortRef, b: PortRef) -> Result<(), ConnectionError> {
        let connection = Connection::new(a, b);
        self.validate(&connection)?;
        tracing::debug!("Connecting {}", connection);
        self.connections.push(connection);
        Ok(())
    }

    /// Check that a connection could be added without breaking any invariant
    pub fn validate(&self, connection: &Connection) -> Result<(), ConnectionError> {
        let (a, b) = (connection.a, connection.b);
        if a == b {
            return Err(ConnectionError::SelfConnection(a));
        }

        let port_a = self.resolve(a)?;
        let port_b = self.resolve(b)?;

        if !port_a.is_suitable(port_b) {
            return Err(ConnectionError::UnsuitableDirections(a, b));
        }
        if !port_a.port_type.can_connect_to(port_b.port_type) {
            return Err(ConnectionError::IncompatibleTypes(a, b));
        }
        if a.node == b.node {
            return Err(ConnectionError::SelfLoop(a.node));
        }
        if self.connections.iter().any(|c| c.same_endpoints(connection)) {
            return Err(ConnectionError::AlreadyConnected(a, b));
        }

        // Check for existing connection to single-connection ports
        for (port_ref, port) in [(a, port_a), (b, port_b)] {
            if !port.multi_connect && self.connections.iter().any(|c| c.involves_port(port_ref)) {
                return Err(ConnectionError::PortAlreadyConnected(port_ref));
            }
        }

        Ok(())
    }

    fn resolve(&self, port: PortRef) -> Result<&Port, ConnectionError> {
        let node = self
            .node(port.node)
            .ok_or(ConnectionError::NodeNotFound(port.node))?;
        node.port(port.port).ok_or(ConnectionError::PortNotFound(port))
    }

    /// Add a connection read from a document, after validation
    pub(crate) fn push_connection(&mut self, connection: Connection) -> Result<(), ConnectionError> {
        self.validate(&connection)?;
        self.connections.push(connection);
        Ok(())
    }

    /// Remove the connection between two ports, in either order
    pub fn disconnect(&mut self, a: PortRef, b: PortRef) -> Option<Connection> {
        let target = Connection::new(a, b);
        let index = self
            .connections
            .iter()
            .position(|c| c.same_endpoints(&target))?;
        Some(self.connections.remove(index))
    }

    /// Remove every connection touching a port
    pub fn disconnect_port(&mut self, port: PortRef) -> usize {
        let before = self.connections.len();
        self.connections.retain(|c| !c.involves_port(port));
        before - self.connections.len()
    }

    /// Get all connections, in creation order
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Get connections touching a specific port, in creation order
    pub fn connections_of(&self, port: PortRef) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.involves_port(port))
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.involves_node(node_id))
    }

    /// Ports connected to `port`, in connection order
    pub fn peers(&self, port: PortRef) -> impl Iterator<Item = PortRef> + '_ {
        self.connections.iter().filter_map(move |c| c.other(port))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// Error when creating a connection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(PortRef),

    /// Both endpoints are the same port
    #[error("Cannot connect port {0} to itself")]
    SelfConnection(PortRef),

    /// Directions do not pair an output with an input
    #[error("Ports {0} and {1} do not pair an output with an input")]
    UnsuitableDirections(PortRef, PortRef),

    /// Incompatible port types
    #[error("Incompatible port types between {0} and {1}")]
    IncompatibleTypes(PortRef, PortRef),

    /// Self-loop not allowed
    #[error("Self-loop not allowed on node {0}")]
    SelfLoop(NodeId),

    /// The two ports are already connected
    #[error("Ports {0} and {1} are already connected")]
    AlreadyConnected(PortRef, PortRef),

    /// Port is already connected
    #[error("Port already connected: {0}")]
    PortAlreadyConnected(PortRef),
}
