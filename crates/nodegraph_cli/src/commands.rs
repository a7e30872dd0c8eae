// SPDX-License-Identifier: MIT OR Apache-2.0
//! CLI commands: inspecting graph documents and pushing values.

use crate::config::{CliSettings, SettingsError};
use nodegraph::graphs::signal::create_signal_registry;
use nodegraph::{
    DocumentError, LoadReport, NodeRegistry, NodeSystem, PortRef, PortValue, PropagationError,
    PropagationReport, Runner,
};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Command errors
#[derive(Debug, Error)]
pub enum CommandError {
    /// Graph document could not be read or written
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Push failed
    #[error("Push failed: {0}")]
    Propagation(#[from] PropagationError),

    /// Settings file could not be written
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Output could not be written
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Result type for commands
pub type Result<T> = std::result::Result<T, CommandError>;

/// Shared state for running commands
pub struct CommandContext {
    registry: NodeRegistry,
    runner: Runner,
}

impl CommandContext {
    /// Build the context from resolved settings
    pub fn new(settings: &CliSettings) -> Self {
        Self {
            registry: create_signal_registry(),
            runner: Runner::new(settings.runner.clone()),
        }
    }

    /// Load a graph document, logging what was dropped
    pub fn load(&self, path: &Path) -> Result<NodeSystem> {
        let (system, report) = NodeSystem::load(path, &self.registry)?;
        log_report(path, &report);
        Ok(system)
    }

    /// `inspect`: list nodes and connections
    pub fn inspect(&self, path: &Path, out: &mut impl Write) -> Result<()> {
        let system = self.load(path)?;
        write_summary(&system, out)?;
        Ok(())
    }

    /// `push`: push a value out of a port, list deliveries and optionally save
    pub fn push(
        &self,
        path: &Path,
        port: PortRef,
        value: &str,
        save: Option<&Path>,
        out: &mut impl Write,
    ) -> Result<PropagationReport> {
        let mut system = self.load(path)?;
        let value = parse_value(value);
        tracing::info!("Pushing {} from {}", value, port);

        let report = self.runner.push(&mut system, port, value)?;
        write_deliveries(&report, out)?;

        if let Some(save) = save {
            system.save(save)?;
            tracing::info!("Saved graph to {}", save.display());
        }
        Ok(report)
    }
}

/// `init-config`: write default settings
pub fn init_config(path: &Path) -> Result<()> {
    CliSettings::default().save(path)?;
    tracing::info!("Wrote default settings to {}", path.display());
    Ok(())
}

/// Interpret a command-line value.
///
/// Accepts a JSON `PortValue` (`{"Int":3}`), a JSON scalar (`3`, `true`,
/// `"text"`), or falls back to the raw text as a string.
pub fn parse_value(text: &str) -> PortValue {
    if let Ok(value) = serde_json::from_str::<PortValue>(text) {
        return value;
    }
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Bool(b)) => PortValue::Bool(b),
        Ok(serde_json::Value::Number(n)) => match n.as_i64() {
            Some(i) => PortValue::Int(i),
            None => PortValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Ok(serde_json::Value::String(s)) => PortValue::String(s),
        _ => PortValue::String(text.to_string()),
    }
}

fn log_report(path: &Path, report: &LoadReport) {
    if report.is_clean() {
        return;
    }
    tracing::warn!(
        "{}: dropped {} node(s) and {} connection(s)",
        path.display(),
        report.dropped_nodes.len(),
        report.dropped_connections.len()
    );
}

fn write_summary(system: &NodeSystem, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{} node(s)", system.node_count())?;
    for node in system.nodes() {
        let ports: Vec<String> = node
            .ports()
            .iter()
            .map(|p| format!("{}:{}({:?})", p.id, p.name, p.direction))
            .collect();
        writeln!(out, "  [{}] {} {}", node.id(), node.kind(), ports.join(" "))?;
    }
    writeln!(out, "{} connection(s)", system.connection_count())?;
    for connection in system.connections() {
        writeln!(out, "  {connection}")?;
    }
    Ok(())
}

fn write_deliveries(report: &PropagationReport, out: &mut impl Write) -> std::io::Result<()> {
    for delivery in &report.deliveries {
        writeln!(out, "{} -> {}: {}", delivery.source, delivery.target, delivery.value)?;
    }
    for skipped in &report.skipped {
        writeln!(out, "{} -> {}: skipped (cycle)", skipped.source, skipped.target)?;
    }
    writeln!(out, "{} delivery(ies)", report.deliveries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodegraph::graphs::signal::Counter;
    use nodegraph::{NodeId, PortId};

    const GRAPH: &str = r#"{
        "nodes": [
            { "id": 0, "type": "constant", "fields": { "value": { "String": "x" } } },
            { "id": 1, "type": "counter" },
            { "id": 2, "type": "recorder", "fields": { "label": "sink" } }
        ],
        "connections": [ "0x1-1x0", "1x1-2x0", "0x1-9x0" ]
    }"#;

    fn write_graph(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("graph.json");
        std::fs::write(&path, GRAPH).unwrap();
        path
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(r#"{"Int":3}"#), PortValue::Int(3));
        assert_eq!(parse_value("3"), PortValue::Int(3));
        assert_eq!(parse_value("2.5"), PortValue::Float(2.5));
        assert_eq!(parse_value("true"), PortValue::Bool(true));
        assert_eq!(parse_value(r#""quoted""#), PortValue::from("quoted"));
        assert_eq!(parse_value("plain text"), PortValue::from("plain text"));
    }

    #[test]
    fn test_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_graph(dir.path());
        let context = CommandContext::new(&CliSettings::default());

        let mut out = Vec::new();
        context.inspect(&path, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("3 node(s)"));
        assert!(text.contains("[1] counter"));
        assert!(text.contains("2 connection(s)"));
        assert!(text.contains("1x1-2x0"));
        assert!(!text.contains("9x0"));
    }

    #[test]
    fn test_push_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_graph(dir.path());
        let saved = dir.path().join("after.json");
        let context = CommandContext::new(&CliSettings::default());

        let mut out = Vec::new();
        let port = PortRef::new(NodeId(0), PortId(1));
        let report = context
            .push(&path, port, "x", Some(&saved), &mut out)
            .unwrap();
        assert_eq!(report.deliveries.len(), 2);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("0x1 -> 1x0: \"x\""));
        assert!(text.contains("1x1 -> 2x0: 1"));

        // Counter state persists through the saved document
        let reloaded = context.load(&saved).unwrap();
        assert_eq!(
            reloaded.behavior::<Counter>(NodeId(1)),
            Some(&Counter { count: 1, step: 1 })
        );
        assert_eq!(reloaded.connection_count(), 2);
    }

    #[test]
    fn test_push_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_graph(dir.path());
        let context = CommandContext::new(&CliSettings::default());

        let mut out = Vec::new();
        let input = PortRef::new(NodeId(2), PortId(0));
        assert!(matches!(
            context.push(&path, input, "x", None, &mut out),
            Err(CommandError::Propagation(PropagationError::NotAnOutput(_)))
        ));
        assert!(matches!(
            context.inspect(&dir.path().join("missing.json"), &mut out),
            Err(CommandError::Document(DocumentError::Io(_)))
        ));
    }

    #[test]
    fn test_init_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodegraph.ron");
        init_config(&path).unwrap();
        assert_eq!(CliSettings::load(&path).unwrap(), CliSettings::default());
    }
}
