// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation: propagating pushed values along connections.
//!
//! A push travels from an output-capable port to every port connected to
//! it, in connection order. Receiving nodes may push further values, which
//! are propagated before the next sibling delivery, so the delivery order
//! matches a depth-first walk. Work is kept on an explicit deque rather than
//! the call stack, and every pending delivery remembers which nodes emitted
//! on the way to it. A feedback loop is a node emitting again while handling
//! a delivery it caused itself; re-entry that emits nothing terminates and is
//! not treated as a loop.

use crate::graph::NodeSystem;
use crate::node::{NodeError, NodeId, Outbox, PortPush};
use crate::port::{PortRef, PortType, PortValue};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::rc::Rc;

/// Default bound on deliveries per push
pub const DEFAULT_MAX_DELIVERIES: usize = 10_000;

/// What to do when a node emits while handling a delivery it caused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CyclePolicy {
    /// Abort the push with an error
    #[default]
    Error,
    /// Drop the node's emissions and carry on
    Skip,
    /// No detection; only the delivery limit stops a loop
    Allow,
}

/// Runner settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Feedback loop handling
    pub cycle_policy: CyclePolicy,
    /// Maximum deliveries in one push
    pub max_deliveries: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cycle_policy: CyclePolicy::default(),
            max_deliveries: DEFAULT_MAX_DELIVERIES,
        }
    }
}

/// One value handed to one node
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Port the value left from
    pub source: PortRef,
    /// Port the value arrived at
    pub target: PortRef,
    /// Delivered value
    pub value: PortValue,
}

/// Everything that happened during one push
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropagationReport {
    /// Deliveries in the order they were performed
    pub deliveries: Vec<Delivery>,
    /// Deliveries dropped by [`CyclePolicy::Skip`], never handed to a node
    pub skipped: Vec<Delivery>,
}

impl PropagationReport {
    /// Deliveries that reached a given node
    pub fn delivered_to(&self, node: NodeId) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter().filter(move |d| d.target.node == node)
    }
}

/// Error during propagation
#[derive(Debug, thiserror::Error)]
pub enum PropagationError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(PortRef),

    /// Values can only leave through output-capable ports
    #[error("Port {0} cannot emit values")]
    NotAnOutput(PortRef),

    /// Value does not fit the port type
    #[error("Port {port} of type {expected:?} cannot carry {value}")]
    TypeMismatch {
        /// Emitting port
        port: PortRef,
        /// Port type
        expected: PortType,
        /// Rejected value
        value: PortValue,
    },

    /// A node emitted again while handling a delivery it caused
    #[error("Cycle detected: {path:?} -> {target}")]
    CycleDetected {
        /// Nodes that emitted on the way to the delivery, oldest first
        path: Vec<NodeId>,
        /// Port whose delivery made the node emit again
        target: PortRef,
    },

    /// Too many deliveries in one push
    #[error("Delivery limit of {0} exceeded")]
    DeliveryLimitExceeded(usize),

    /// A node failed while handling a push
    #[error("Node {node} failed: {source}")]
    Node {
        /// Failing node
        node: NodeId,
        /// Node error
        #[source]
        source: NodeError,
    },
}

/// Pending delivery on the work deque
struct Pending {
    source: PortRef,
    target: PortRef,
    value: PortValue,
    lineage: Rc<Vec<NodeId>>,
}

/// Propagates pushed values through a node system
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    /// Create a runner with the given settings
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Runner settings
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Push a value out of `source` and propagate it until nothing is left
    /// to deliver.
    pub fn push(
        &self,
        system: &mut NodeSystem,
        source: PortRef,
        value: PortValue,
    ) -> Result<PropagationReport, PropagationError> {
        let mut report = PropagationReport::default();
        let mut work = VecDeque::new();

        let lineage = Rc::new(vec![source.node]);
        let fanout = self.fan_out(system, source, value, &lineage)?;
        schedule(&mut work, fanout);

        while let Some(pending) = work.pop_front() {
            if report.deliveries.len() >= self.config.max_deliveries {
                return Err(PropagationError::DeliveryLimitExceeded(self.config.max_deliveries));
            }

            let node_id = pending.target.node;
            let node = system
                .node_mut(node_id)
                .ok_or(PropagationError::NodeNotFound(node_id))?;

            let mut outbox = Outbox::new();
            let push = PortPush {
                source: pending.source,
                target: pending.target.port,
                value: &pending.value,
            };
            node.behavior_mut()
                .on_port_pushed(push, &mut outbox)
                .map_err(|source| PropagationError::Node { node: node_id, source })?;

            tracing::trace!("Delivered {} from {} to {}", pending.value, pending.source, pending.target);
            report.deliveries.push(Delivery {
                source: pending.source,
                target: pending.target,
                value: pending.value,
            });

            if outbox.is_empty() {
                continue;
            }

            let cyclic = pending.lineage.contains(&node_id);
            if cyclic && self.config.cycle_policy == CyclePolicy::Error {
                return Err(PropagationError::CycleDetected {
                    path: pending.lineage.to_vec(),
                    target: pending.target,
                });
            }

            let mut chain = Vec::with_capacity(pending.lineage.len() + 1);
            chain.extend_from_slice(&pending.lineage);
            chain.push(node_id);
            let lineage = Rc::new(chain);

            let mut emitted = Vec::new();
            for (port, value) in outbox.drain() {
                let from = PortRef::new(node_id, port);
                emitted.extend(self.fan_out(system, from, value, &lineage)?);
            }

            if cyclic && self.config.cycle_policy == CyclePolicy::Skip {
                tracing::warn!("Skipping {} cyclic delivery(ies) from node {}", emitted.len(), node_id);
                report.skipped.extend(emitted.into_iter().map(|p| Delivery {
                    source: p.source,
                    target: p.target,
                    value: p.value,
                }));
                continue;
            }
            schedule(&mut work, emitted);
        }

        tracing::debug!(
            "Push from {} made {} deliveries ({} skipped)",
            source,
            report.deliveries.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Deliveries for one value leaving one port, in connection order
    fn fan_out(
        &self,
        system: &NodeSystem,
        source: PortRef,
        value: PortValue,
        lineage: &Rc<Vec<NodeId>>,
    ) -> Result<Vec<Pending>, PropagationError> {
        let node = system
            .node(source.node)
            .ok_or(PropagationError::NodeNotFound(source.node))?;
        let port = node
            .port(source.port)
            .ok_or(PropagationError::PortNotFound(source))?;

        if !port.direction.is_output() {
            return Err(PropagationError::NotAnOutput(source));
        }
        if !port.port_type.accepts(&value) {
            return Err(PropagationError::TypeMismatch {
                port: source,
                expected: port.port_type,
                value,
            });
        }

        let mut pending = Vec::new();
        for target in system.peers(source) {
            // Only input-capable peers receive; a Both port may sit on either side
            if !system.port(target).is_some_and(|p| p.direction.is_input()) {
                continue;
            }
            pending.push(Pending {
                source,
                target,
                value: value.clone(),
                lineage: Rc::clone(lineage),
            });
        }
        Ok(pending)
    }
}

/// Put new deliveries at the front of the deque, keeping their order
fn schedule(work: &mut VecDeque<Pending>, pending: Vec<Pending>) {
    for item in pending.into_iter().rev() {
        work.push_front(item);
    }
}
