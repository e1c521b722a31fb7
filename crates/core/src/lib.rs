// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! prep-core: Shared types for the prepsync client
//!
//! This crate provides the session data model and the push-channel wire
//! codec. It performs no I/O.

pub mod error;
pub mod protocol;
pub mod session;

pub use error::{Error, ParseError, Result};
pub use protocol::{ClientMessage, Envelope, Inbound, ServerMessage};
pub use session::{
    AnswerMap, Category, Difficulty, NewSession, Session, SessionItem, SessionPatch,
    SessionStatus, SessionType,
};
