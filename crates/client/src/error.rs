// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::cache::ApiError;
use crate::sync::TransportError;

/// Errors surfaced by the prepsync commands.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config file not found: {0}\n  hint: create it, or drop --config to use defaults")]
    ConfigNotFound(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("{field} cannot be empty")]
    FieldEmpty { field: &'static str },

    #[error("{context} is required for {operation}")]
    RequiredFor {
        context: &'static str,
        operation: &'static str,
    },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("question {item} not found in session {session}")]
    ItemNotFound { session: String, item: String },

    #[error("could not {0}")]
    OperationFailed(&'static str),

    #[error("could not connect to {url}: {reason}")]
    ConnectFailed { url: String, reason: String },

    #[error("server error: {0}")]
    Server(String),

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("api error: {0}")]
    Api(#[from] ApiError),

    #[error("connection error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Core(#[from] prep_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
