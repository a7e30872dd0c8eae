// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed node-graph execution engine.
//!
//! ## Architecture
//!
//! The framework is built on a generic graph model with:
//! - Typed, directional ports with a multiplicity flag
//! - Nodes whose behaviour is a [`NodeBehavior`] trait object
//! - A [`NodeSystem`] owning nodes and port-to-port connections
//! - A [`NodeRegistry`] mapping type discriminators to constructors
//! - A [`Runner`] that propagates pushed values along connections
//! - JSON graph documents with tolerant loading
//!
//! ```
//! use nodegraph::graphs::signal::{create_signal_registry, Constant, Recorder};
//! use nodegraph::{NodeSystem, PortRef, PortValue, Runner};
//!
//! let mut system = NodeSystem::new();
//! let source = system.add_node(Box::new(Constant::new("x"))).unwrap();
//! let sink = system.add_node(Box::new(Recorder::new("sink"))).unwrap();
//! system
//!     .connect(PortRef::new(source, Constant::VALUE), PortRef::new(sink, Recorder::IN))
//!     .unwrap();
//!
//! Runner::default()
//!     .push(&mut system, PortRef::new(source, Constant::VALUE), PortValue::from("x"))
//!     .unwrap();
//! assert_eq!(system.behavior::<Recorder>(sink).unwrap().received().len(), 1);
//!
//! let json = system.to_json().unwrap();
//! let (restored, report) = NodeSystem::from_json(&json, &create_signal_registry()).unwrap();
//! assert!(report.is_clean());
//! assert_eq!(restored.connection_count(), 1);
//! ```

pub mod node;
pub mod port;
pub mod connection;
pub mod graph;
pub mod serialization;
pub mod evaluation;
pub mod graphs;

pub use node::{Node, NodeBehavior, NodeError, NodeId, NodeRegistry, NodeType, Outbox, PortPush};
pub use port::{Port, PortDirection, PortId, PortRef, PortType, PortValue};
pub use connection::{Connection, ParseConnectionError};
pub use graph::{ConnectionError, NodeSystem};
pub use serialization::{DocumentError, GraphDocument, LoadReport, NodeRecord};
pub use evaluation::{CyclePolicy, PropagationError, PropagationReport, Runner, RunnerConfig};
