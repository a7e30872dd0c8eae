// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.
//!
//! A connection is an unordered pair of ports. Its textual form is
//! `"<nodeA>x<portA>-<nodeB>x<portB>"`, which is also how connections are
//! stored in graph documents.

use crate::node::NodeId;
use crate::port::{PortId, PortRef};
use std::fmt;
use std::str::FromStr;

/// A connection between two ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    /// First endpoint, as created
    pub a: PortRef,
    /// Second endpoint, as created
    pub b: PortRef,
}

impl Connection {
    /// Create a new connection
    pub fn new(a: PortRef, b: PortRef) -> Self {
        Self { a, b }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.a.node == node_id || self.b.node == node_id
    }

    /// Check if this connection involves a specific port
    pub fn involves_port(&self, port: PortRef) -> bool {
        self.a == port || self.b == port
    }

    /// The endpoint opposite to `port`, if `port` is one of the endpoints
    pub fn other(&self, port: PortRef) -> Option<PortRef> {
        if self.a == port {
            Some(self.b)
        } else if self.b == port {
            Some(self.a)
        } else {
            None
        }
    }

    /// Whether both connections join the same two ports, in any order
    pub fn same_endpoints(&self, other: &Connection) -> bool {
        (self.a == other.a && self.b == other.b) || (self.a == other.b && self.b == other.a)
    }

    /// Endpoints in ascending order, for order-independent comparison
    pub fn normalized(&self) -> (PortRef, PortRef) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}

/// Error when a connection string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseConnectionError {
    /// Not exactly two endpoints separated by `-`
    #[error("Expected two endpoints separated by '-', found {0}")]
    EndpointCount(usize),

    /// Endpoint is not `<node>x<port>`
    #[error("Malformed endpoint '{0}'")]
    MalformedEndpoint(String),

    /// Identifier is not an unsigned integer
    #[error("Invalid id '{0}'")]
    InvalidId(String),
}

fn parse_id(text: &str) -> Result<u32, ParseConnectionError> {
    text.trim()
        .parse()
        .map_err(|_| ParseConnectionError::InvalidId(text.to_string()))
}

impl FromStr for PortRef {
    type Err = ParseConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (node, port) = s
            .split_once('x')
            .ok_or_else(|| ParseConnectionError::MalformedEndpoint(s.to_string()))?;
        Ok(PortRef::new(NodeId(parse_id(node)?), PortId(parse_id(port)?)))
    }
}

impl FromStr for Connection {
    type Err = ParseConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let halves: Vec<&str> = s.split('-').collect();
        match halves.as_slice() {
            [a, b] => Ok(Connection::new(a.parse()?, b.parse()?)),
            other => Err(ParseConnectionError::EndpointCount(other.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(node: u32, port: u32) -> PortRef {
        PortRef::new(NodeId(node), PortId(port))
    }

    #[test]
    fn test_format() {
        let connection = Connection::new(port(0, 1), port(12, 0));
        assert_eq!(connection.to_string(), "0x1-12x0");
    }

    #[test]
    fn test_parse() {
        let connection: Connection = "3x0-4x2".parse().unwrap();
        assert_eq!(connection.a, port(3, 0));
        assert_eq!(connection.b, port(4, 2));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "3x0".parse::<Connection>(),
            Err(ParseConnectionError::EndpointCount(1))
        );
        assert_eq!(
            "3x0-4x1-5x2".parse::<Connection>(),
            Err(ParseConnectionError::EndpointCount(3))
        );
        assert_eq!(
            "30-4x1".parse::<Connection>(),
            Err(ParseConnectionError::MalformedEndpoint("30".into()))
        );
        assert_eq!(
            "ax0-4x1".parse::<Connection>(),
            Err(ParseConnectionError::InvalidId("a".into()))
        );
        assert!("-1x0-4x1".parse::<Connection>().is_err());
    }

    #[test]
    fn test_endpoint_queries() {
        let connection = Connection::new(port(0, 1), port(1, 0));
        assert_eq!(connection.other(port(0, 1)), Some(port(1, 0)));
        assert_eq!(connection.other(port(1, 0)), Some(port(0, 1)));
        assert_eq!(connection.other(port(2, 0)), None);
        assert!(connection.involves_node(NodeId(1)));
        assert!(!connection.involves_port(port(1, 1)));

        let reversed = Connection::new(port(1, 0), port(0, 1));
        assert!(connection.same_endpoints(&reversed));
        assert_eq!(connection.normalized(), reversed.normalized());
    }
}
