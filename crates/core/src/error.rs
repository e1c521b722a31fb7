// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for prep-core operations.

use thiserror::Error;

/// All possible errors that can occur in prep-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid session type: '{0}'\n  hint: valid types are: job_description, resume")]
    InvalidSessionType(String),

    #[error("invalid session status: '{0}'\n  hint: valid statuses are: New, InProgress, Completed")]
    InvalidStatus(String),

    #[error("invalid question category: '{0}'\n  hint: valid categories are: technical, behavioral, experience")]
    InvalidCategory(String),

    #[error(
        "invalid difficulty: '{0}'\n  hint: valid difficulties are: beginner, intermediate, advanced"
    )]
    InvalidDifficulty(String),

    #[error("invalid generation mode: '{0}'\n  hint: valid modes are: resume, jd, combined")]
    InvalidMode(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Failure to turn a wire payload into a message.
///
/// Always recoverable: the caller logs it and drops the frame.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message has no string 'type' field")]
    MissingType,

    #[error("invalid '{kind}' payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A specialized Result type for prep-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
