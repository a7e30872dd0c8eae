// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command-line arguments and settings files.
//!
//! Settings are stored as RON. Command-line flags (or their environment
//! variables) override what the file says.

use clap::{Parser, Subcommand};
use nodegraph::{PortRef, RunnerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Log filter used when nothing else is configured
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid settings RON
    #[error("Invalid settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer release
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },
}

/// Result type for settings operations
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Persistent CLI settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliSettings {
    /// Format version
    pub version: u32,
    /// `tracing` filter directives
    pub log_filter: String,
    /// Propagation settings
    pub runner: RunnerConfig,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            runner: RunnerConfig::default(),
        }
    }
}

impl CliSettings {
    /// Parse settings from RON text
    pub fn from_ron(content: &str) -> Result<Self> {
        let settings: CliSettings = ron::from_str(content)?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        Ok(settings)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Serialize settings to pretty RON
    pub fn to_ron(&self) -> Result<String> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "nodegraph", version)]
#[command(about = "Inspect node graph documents and push values through them")]
pub struct Cli {
    /// Settings file path (RON)
    #[arg(short, long, env = "NODEGRAPH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, overriding the settings file
    #[arg(long, env = "NODEGRAPH_LOG", global = true)]
    pub log_level: Option<String>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a graph document and list its nodes and connections
    Inspect {
        /// Graph document (JSON)
        graph: PathBuf,
    },

    /// Push a value out of a port and report every delivery
    Push {
        /// Graph document (JSON)
        graph: PathBuf,

        /// Emitting port as `<node>x<port>`
        #[arg(long)]
        port: PortRef,

        /// Value to push: a JSON `PortValue`, a JSON scalar or plain text
        #[arg(long)]
        value: String,

        /// Write the graph, with updated node state, to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Write a settings file with default values
    InitConfig {
        /// Destination (RON)
        path: PathBuf,
    },
}

impl Cli {
    /// Resolve the effective settings: file first, then CLI overrides
    pub fn settings(&self) -> Result<CliSettings> {
        let mut settings = match &self.config {
            Some(path) => CliSettings::load(path)?,
            None => CliSettings::default(),
        };

        if let Some(log_level) = &self.log_level {
            settings.log_filter = log_level.clone();
        }

        Ok(settings)
    }

    /// Log filter to install, even when the settings file is unusable
    pub fn log_filter(&self, settings: Option<&CliSettings>) -> String {
        self.log_level
            .clone()
            .or_else(|| settings.map(|s| s.log_filter.clone()))
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodegraph::{CyclePolicy, NodeId, PortId};

    #[test]
    fn test_default_settings() {
        let settings = CliSettings::default();
        assert_eq!(settings.version, SETTINGS_FORMAT_VERSION);
        assert_eq!(settings.log_filter, "info");
        assert_eq!(settings.runner, RunnerConfig::default());
    }

    #[test]
    fn test_serialization() {
        let mut settings = CliSettings::default();
        settings.runner.cycle_policy = CyclePolicy::Skip;
        let ron_str = settings.to_ron().unwrap();
        assert!(ron_str.contains("CliSettings"));
        let loaded = CliSettings::from_ron(&ron_str).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_settings() {
        let loaded = CliSettings::from_ron("(runner: (max_deliveries: 5))").unwrap();
        assert_eq!(loaded.runner.max_deliveries, 5);
        assert_eq!(loaded.runner.cycle_policy, CyclePolicy::Error);
        assert_eq!(loaded.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_newer_version_rejected() {
        let err = CliSettings::from_ron("(version: 99)").unwrap_err();
        assert!(matches!(err, SettingsError::UnsupportedVersion { found: 99, .. }));
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ron");
        let mut settings = CliSettings::default();
        settings.log_filter = "nodegraph=trace".to_string();
        settings.save(&path).unwrap();
        assert_eq!(CliSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "nodegraph",
            "--log-level",
            "debug",
            "push",
            "graph.json",
            "--port",
            "3x1",
            "--value",
            "hello",
        ])
        .unwrap();
        assert_eq!(cli.log_filter(None), "debug");
        match cli.command {
            Command::Push { port, value, save, .. } => {
                assert_eq!(port, PortRef::new(NodeId(3), PortId(1)));
                assert_eq!(value, "hello");
                assert!(save.is_none());
            }
            other => panic!("expected push, got {other:?}"),
        }

        assert!(Cli::try_parse_from(["nodegraph", "push", "g.json", "--port", "31", "--value", "x"]).is_err());
    }

    fn cli_without_overrides() -> Cli {
        Cli {
            config: None,
            log_level: None,
            command: Command::Inspect {
                graph: PathBuf::from("g.json"),
            },
        }
    }

    #[test]
    fn test_cli_override() {
        let settings = CliSettings {
            log_filter: "warn".into(),
            ..CliSettings::default()
        };

        let mut cli = cli_without_overrides();
        assert_eq!(cli.log_filter(Some(&settings)), "warn");
        assert_eq!(cli.log_filter(None), DEFAULT_LOG_FILTER);
        assert_eq!(cli.settings().unwrap(), CliSettings::default());

        cli.log_level = Some("nodegraph=trace".into());
        assert_eq!(cli.log_filter(Some(&settings)), "nodegraph=trace");
        assert_eq!(cli.settings().unwrap().log_filter, "nodegraph=trace");
    }
}
