// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! prepsync - realtime client for the interview-prep backend.
//!
//! This crate provides the `prepsync` CLI and the services behind it.
//!
//! # Main Components
//!
//! - [`sync`] - WebSocket push channel with bounded reconnect and keepalive
//! - [`cache`] - Session cache kept in step with the REST API, plus its event bus
//! - [`Config`] - TOML configuration with environment overrides
//! - [`Error`] - Error types for all operations
//!
//! # Listening for push events
//!
//! ```rust,ignore
//! use prepsync::sync::{ConnectionConfig, ConnectionManager};
//!
//! let conn = ConnectionManager::new(ConnectionConfig::default());
//! conn.on_progress(|p| println!("{}: {}", p.stage, p.progress));
//! conn.connect();
//! ```

mod app;
pub mod cache;
mod cli;
mod commands;
pub mod config;
mod display;
pub mod env;
pub mod error;
pub mod sync;

pub use app::App;
pub use cli::{Cli, Command, GenerateArgs, OutputFormat, SessionsCommand};
pub use config::Config;
pub use error::{Error, Result};

use std::sync::Arc;

use cache::{LogNotifier, StderrNotifier};

/// Runs one CLI invocation to completion.
pub fn run(cli: Cli) -> Result<()> {
    let mut config = Config::resolve(cli.config.as_deref())?;
    if let Command::Listen {
        session_id: Some(id),
    } = &cli.command
    {
        config.connection.session_id = Some(id.clone());
    }

    if let Command::Config = cli.command {
        return commands::config::run(&config);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        match cli.command {
            Command::Config => commands::config::run(&config),
            Command::Listen { .. } => {
                let app = App::from_config(config, Arc::new(LogNotifier))?;
                let shutdown = async {
                    let _ = tokio::signal::ctrl_c().await;
                };
                commands::listen::run(&app.connection, shutdown).await
            }
            Command::Generate(args) => {
                let app = App::from_config(config, Arc::new(LogNotifier))?;
                commands::generate::run(&app.connection, &args).await
            }
            Command::Sessions(cmd) => {
                let app = App::from_config(config, Arc::new(StderrNotifier))?;
                commands::sessions::run(&app.cache, cmd).await
            }
        }
    })
}
