// SPDX-License-Identifier: MIT OR Apache-2.0
//! `nodegraph` - command-line front end for node graph documents.
//!
//! Loads JSON graph documents with the built-in signal node kinds, prints
//! their structure and pushes values through them. Runner limits and log
//! filters come from an optional RON settings file.

mod commands;
mod config;

use clap::Parser;
use commands::CommandContext;
use config::{Cli, Command};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_logging(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log filter '{filter}': {e}");
        EnvFilter::new(config::DEFAULT_LOG_FILTER)
    });

    // Logs go to stderr so command output stays clean on stdout
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = cli.settings();
    init_logging(&cli.log_filter(settings.as_ref().ok()));

    tracing::debug!("nodegraph v{}", env!("CARGO_PKG_VERSION"));

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Failed to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };

    let context = CommandContext::new(&settings);
    let mut stdout = std::io::stdout().lock();
    let result = match &cli.command {
        Command::Inspect { graph } => context.inspect(graph, &mut stdout),
        Command::Push {
            graph,
            port,
            value,
            save,
        } => context
            .push(graph, *port, value, save.as_deref(), &mut stdout)
            .map(|_| ()),
        Command::InitConfig { path } => commands::init_config(path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
