// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Type-to-handler table for inbound push messages.
//!
//! The router only decides *who* handles a message. Built-in effects
//! (capturing the connection id, recording pongs, logging server errors)
//! belong to the connection manager, which runs them before dispatch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use prep_core::protocol::ServerMessage;
use serde_json::Value;

/// Handler for a known message kind.
pub type Handler = Arc<dyn Fn(&ServerMessage) + Send + Sync>;

/// Handler for kinds with no table entry: receives the wire type and raw data.
pub type FallbackHandler = Arc<dyn Fn(&str, Option<&Value>) + Send + Sync>;

/// Kinds with a slot in the routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Connection,
    ProgressUpdate,
    QuestionsGenerated,
    AnswerSaved,
    AnswerGenerated,
    Error,
    Pong,
}

impl MessageKind {
    /// The table entry for a message, if it has one.
    pub fn of(msg: &ServerMessage) -> Option<Self> {
        match msg {
            ServerMessage::Connection { .. } => Some(MessageKind::Connection),
            ServerMessage::ProgressUpdate(_) => Some(MessageKind::ProgressUpdate),
            ServerMessage::QuestionsGenerated(_) => Some(MessageKind::QuestionsGenerated),
            ServerMessage::AnswerSaved(_) => Some(MessageKind::AnswerSaved),
            ServerMessage::AnswerGenerated(_) => Some(MessageKind::AnswerGenerated),
            ServerMessage::Error(_) => Some(MessageKind::Error),
            ServerMessage::Pong => Some(MessageKind::Pong),
            ServerMessage::Other { .. } => None,
        }
    }

    /// Returns the wire type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Connection => "connection",
            MessageKind::ProgressUpdate => "progress_update",
            MessageKind::QuestionsGenerated => "questions_generated",
            MessageKind::AnswerSaved => "answer_saved",
            MessageKind::AnswerGenerated => "answer_generated",
            MessageKind::Error => "error",
            MessageKind::Pong => "pong",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a message should go.
#[derive(Clone)]
pub enum Route {
    Handler(Handler),
    Fallback(FallbackHandler),
    /// Nobody registered; the message is dropped.
    Unhandled,
}

impl Route {
    /// Invokes the chosen handler, if any. Returns whether one ran.
    pub fn dispatch(&self, msg: &ServerMessage) -> bool {
        match self {
            Route::Handler(handler) => {
                handler(msg);
                true
            }
            Route::Fallback(fallback) => match msg {
                ServerMessage::Other { kind, data } => {
                    fallback(kind, data.as_ref());
                    true
                }
                _ => false,
            },
            Route::Unhandled => false,
        }
    }
}

/// Routing table from message kind to handler.
#[derive(Default, Clone)]
pub struct MessageRouter {
    handlers: HashMap<MessageKind, Handler>,
    fallback: Option<FallbackHandler>,
}

impl MessageRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for `kind`, returning the one it replaces.
    pub fn on(&mut self, kind: MessageKind, handler: Handler) -> Option<Handler> {
        self.handlers.insert(kind, handler)
    }

    /// Removes the handler for `kind`.
    pub fn off(&mut self, kind: MessageKind) -> Option<Handler> {
        self.handlers.remove(&kind)
    }

    /// Registers the handler for kinds outside the table.
    pub fn on_fallback(&mut self, handler: FallbackHandler) {
        self.fallback = Some(handler);
    }

    /// Whether `kind` has a registered handler.
    pub fn has_handler(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Picks the handler for a message.
    ///
    /// Known kinds without a handler are not forwarded to the fallback;
    /// the fallback only sees types the table does not define.
    pub fn route(&self, msg: &ServerMessage) -> Route {
        match MessageKind::of(msg) {
            Some(kind) => match self.handlers.get(&kind) {
                Some(handler) => Route::Handler(Arc::clone(handler)),
                None => Route::Unhandled,
            },
            None => match &self.fallback {
                Some(fallback) => Route::Fallback(Arc::clone(fallback)),
                None => Route::Unhandled,
            },
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
