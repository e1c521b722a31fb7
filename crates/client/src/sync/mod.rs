// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push channel to the interview-prep backend.
//!
//! Keeps one WebSocket connection open, reconnects with a bounded budget,
//! pings on a fixed period and routes inbound messages by type.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ ConnectionManager │────►│  Transport  │────►│   Backend   │
//! │  (state machine)  │◄────│   (trait)   │◄────│   /ws       │
//! └───────────────────┘     └─────────────┘     └─────────────┘
//!          │
//!          ▼
//! ┌───────────────────┐
//! │   MessageRouter   │  (type → handler)
//! └───────────────────┘
//! ```

mod connection;
mod router;
mod transport;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionStatus};
pub use router::{FallbackHandler, Handler, MessageKind, MessageRouter, Route};
pub use transport::{
    Frame, Link, LinkEvent, LinkPeer, LinkWriter, Transport, TransportError, TransportResult,
    WebSocketTransport,
};

#[cfg(test)]
pub(crate) mod test_helpers;
