// SPDX-License-Identifier: MIT OR Apache-2.0
//! Signal graph: general-purpose nodes that emit, forward, count, route and
//! record pushed values.

use crate::node::{NodeBehavior, NodeCategory, NodeError, NodeRegistry, NodeType, Outbox, PortPush};
use crate::port::{Port, PortId, PortType, PortValue};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Create the signal graph node registry
pub fn create_signal_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    registry.register(NodeType::of::<Constant>(
        Constant::KIND,
        "Constant",
        NodeCategory::Input,
        "Emits its stored value whenever triggered",
    ));
    registry.register(NodeType::of::<Relay>(
        Relay::KIND,
        "Relay",
        NodeCategory::Utility,
        "Forwards every value unchanged",
    ));
    registry.register(NodeType::of::<Counter>(
        Counter::KIND,
        "Counter",
        NodeCategory::Utility,
        "Counts pushes and emits the running total",
    ));
    registry.register(NodeType::of::<Branch>(
        Branch::KIND,
        "Branch",
        NodeCategory::Logic,
        "Routes values to True or False depending on the last condition",
    ));
    registry.register(NodeType::of::<Recorder>(
        Recorder::KIND,
        "Recorder",
        NodeCategory::Output,
        "Keeps every value it receives",
    ));

    registry
}

fn fields_of<T: Serialize>(node: &T) -> serde_json::Value {
    serde_json::to_value(node).unwrap_or(serde_json::Value::Null)
}

/// Emits `value` on `Value` whenever anything arrives on `Trigger`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constant {
    /// Emitted value
    pub value: PortValue,
}

impl Constant {
    /// Type discriminator
    pub const KIND: &'static str = "constant";
    /// Trigger input
    pub const TRIGGER: PortId = PortId(0);
    /// Value output
    pub const VALUE: PortId = PortId(1);

    /// Create a constant node
    pub fn new(value: impl Into<PortValue>) -> Self {
        Self { value: value.into() }
    }
}

impl Default for Constant {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl NodeBehavior for Constant {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::input(Self::TRIGGER.0, "Trigger", PortType::Any).with_multi_connect(true),
            Port::output(Self::VALUE.0, "Value", PortType::Any),
        ]
    }

    fn on_port_pushed(&mut self, _push: PortPush<'_>, outbox: &mut Outbox) -> Result<(), NodeError> {
        outbox.push(Self::VALUE, self.value.clone());
        Ok(())
    }

    fn save_fields(&self) -> serde_json::Value {
        fields_of(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Forwards values from `In` to `Out`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relay {}

impl Relay {
    /// Type discriminator
    pub const KIND: &'static str = "relay";
    /// Input
    pub const IN: PortId = PortId(0);
    /// Output
    pub const OUT: PortId = PortId(1);
}

impl NodeBehavior for Relay {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::input(Self::IN.0, "In", PortType::Any),
            Port::output(Self::OUT.0, "Out", PortType::Any),
        ]
    }

    fn on_port_pushed(&mut self, push: PortPush<'_>, outbox: &mut Outbox) -> Result<(), NodeError> {
        outbox.push(Self::OUT, push.value.clone());
        Ok(())
    }

    fn save_fields(&self) -> serde_json::Value {
        fields_of(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Adds `step` to `count` per push and emits the new count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Counter {
    /// Running total
    pub count: i64,
    /// Increment per push
    pub step: i64,
}

impl Counter {
    /// Type discriminator
    pub const KIND: &'static str = "counter";
    /// Input
    pub const IN: PortId = PortId(0);
    /// Count output
    pub const COUNT: PortId = PortId(1);
}

impl Default for Counter {
    fn default() -> Self {
        Self { count: 0, step: 1 }
    }
}

impl NodeBehavior for Counter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::input(Self::IN.0, "In", PortType::Any).with_multi_connect(true),
            Port::output(Self::COUNT.0, "Count", PortType::Int),
        ]
    }

    fn on_port_pushed(&mut self, _push: PortPush<'_>, outbox: &mut Outbox) -> Result<(), NodeError> {
        self.count = self.count.saturating_add(self.step);
        outbox.push(Self::COUNT, self.count);
        Ok(())
    }

    fn save_fields(&self) -> serde_json::Value {
        fields_of(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Routes `In` to `True` or `False` according to the last `Condition`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branch {
    /// Last condition received
    pub open: bool,
}

impl Branch {
    /// Type discriminator
    pub const KIND: &'static str = "branch";
    /// Value input
    pub const IN: PortId = PortId(0);
    /// Condition input
    pub const CONDITION: PortId = PortId(1);
    /// Output taken while open
    pub const TRUE: PortId = PortId(2);
    /// Output taken while closed
    pub const FALSE: PortId = PortId(3);
}

impl NodeBehavior for Branch {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn ports(&self) -> Vec<Port> {
        vec![
            Port::input(Self::IN.0, "In", PortType::Any),
            Port::input(Self::CONDITION.0, "Condition", PortType::Bool),
            Port::output(Self::TRUE.0, "True", PortType::Any),
            Port::output(Self::FALSE.0, "False", PortType::Any),
        ]
    }

    fn on_port_pushed(&mut self, push: PortPush<'_>, outbox: &mut Outbox) -> Result<(), NodeError> {
        match push.target {
            Self::CONDITION => match push.value {
                PortValue::Bool(open) => {
                    self.open = *open;
                    Ok(())
                }
                other => Err(NodeError::TypeMismatch {
                    port: push.target,
                    expected: "Bool",
                    got: other.clone(),
                }),
            },
            Self::IN => {
                let port = if self.open { Self::TRUE } else { Self::FALSE };
                outbox.push(port, push.value.clone());
                Ok(())
            }
            other => Err(NodeError::UnexpectedPort(other)),
        }
    }

    fn save_fields(&self) -> serde_json::Value {
        fields_of(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Records every value arriving on `In`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recorder {
    /// Label used in logs
    pub label: String,
    #[serde(skip)]
    received: Vec<PortValue>,
}

impl Recorder {
    /// Type discriminator
    pub const KIND: &'static str = "recorder";
    /// Input
    pub const IN: PortId = PortId(0);

    /// Create a labelled recorder
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            received: Vec::new(),
        }
    }

    /// Values received so far, oldest first
    pub fn received(&self) -> &[PortValue] {
        &self.received
    }

    /// Forget received values
    pub fn clear(&mut self) {
        self.received.clear();
    }
}

impl NodeBehavior for Recorder {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn ports(&self) -> Vec<Port> {
        vec![Port::input(Self::IN.0, "In", PortType::Any).with_multi_connect(true)]
    }

    fn on_port_pushed(&mut self, push: PortPush<'_>, _outbox: &mut Outbox) -> Result<(), NodeError> {
        tracing::debug!("Recorder '{}' received {} from {}", self.label, push.value, push.source);
        self.received.push(push.value.clone());
        Ok(())
    }

    fn save_fields(&self) -> serde_json::Value {
        fields_of(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use crate::port::PortRef;

    fn push_to(node: &mut dyn NodeBehavior, target: PortId, value: PortValue) -> Result<Vec<(PortId, PortValue)>, NodeError> {
        let mut outbox = Outbox::new();
        let push = PortPush {
            source: PortRef::new(NodeId(99), PortId(0)),
            target,
            value: &value,
        };
        node.on_port_pushed(push, &mut outbox)?;
        Ok(outbox.drain().collect())
    }

    #[test]
    fn test_registry_contents() {
        let registry = create_signal_registry();
        for kind in ["constant", "relay", "counter", "branch", "recorder"] {
            let behavior = registry.create(kind).unwrap();
            assert_eq!(behavior.kind(), kind);
        }
        assert_eq!(registry.types_in_category(NodeCategory::Logic).count(), 1);
    }

    #[test]
    fn test_constant_emits_value() {
        let mut constant = Constant::new(7_i64);
        let out = push_to(&mut constant, Constant::TRIGGER, PortValue::Bool(true)).unwrap();
        assert_eq!(out, vec![(Constant::VALUE, PortValue::Int(7))]);
    }

    #[test]
    fn test_counter_counts() {
        let mut counter = Counter { count: 10, step: 5 };
        push_to(&mut counter, Counter::IN, PortValue::from("a")).unwrap();
        let out = push_to(&mut counter, Counter::IN, PortValue::from("b")).unwrap();
        assert_eq!(counter.count, 20);
        assert_eq!(out, vec![(Counter::COUNT, PortValue::Int(20))]);
    }

    #[test]
    fn test_branch_routes_on_condition() {
        let mut branch = Branch::default();
        let out = push_to(&mut branch, Branch::IN, PortValue::from("v")).unwrap();
        assert_eq!(out[0].0, Branch::FALSE);

        push_to(&mut branch, Branch::CONDITION, PortValue::Bool(true)).unwrap();
        let out = push_to(&mut branch, Branch::IN, PortValue::from("v")).unwrap();
        assert_eq!(out[0].0, Branch::TRUE);

        assert!(matches!(
            push_to(&mut branch, Branch::CONDITION, PortValue::Int(1)),
            Err(NodeError::TypeMismatch { .. })
        ));
        assert!(matches!(
            push_to(&mut branch, PortId(3), PortValue::Int(1)),
            Err(NodeError::UnexpectedPort(PortId(3)))
        ));
    }

    #[test]
    fn test_recorder_fields_skip_received() {
        let mut recorder = Recorder::new("sink");
        push_to(&mut recorder, Recorder::IN, PortValue::from("x")).unwrap();
        assert_eq!(recorder.received(), &[PortValue::from("x")]);
        assert_eq!(recorder.save_fields(), serde_json::json!({ "label": "sink" }));
    }

    #[test]
    fn test_fields_restore_through_registry() {
        let registry = create_signal_registry();
        let counter = Counter { count: 3, step: 2 };
        let rebuilt = registry
            .create_with_fields(Counter::KIND, counter.save_fields())
            .unwrap()
            .unwrap();
        assert_eq!(rebuilt.as_any().downcast_ref::<Counter>(), Some(&counter));

        let partial = registry
            .create_with_fields(Counter::KIND, serde_json::json!({ "count": 4 }))
            .unwrap()
            .unwrap();
        assert_eq!(
            partial.as_any().downcast_ref::<Counter>(),
            Some(&Counter { count: 4, step: 1 })
        );
    }
}
