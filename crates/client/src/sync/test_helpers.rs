// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::time::Instant;

use super::transport::{Frame, Link, LinkPeer, Transport, TransportError, TransportResult};

/// What the mock does with the next open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accept,
    Refuse,
    InvalidUrl,
}

struct MockState {
    script: VecDeque<Outcome>,
    fallback: Outcome,
    peers: VecDeque<LinkPeer>,
    opens: Vec<(String, Instant)>,
}

/// Mock transport for testing without real sockets.
///
/// Cloning shares state, so a test can keep a handle after giving one to
/// the connection manager.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    fn with_fallback(fallback: Outcome) -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(MockState {
                script: VecDeque::new(),
                fallback,
                peers: VecDeque::new(),
                opens: Vec::new(),
            })),
        }
    }

    /// Every open succeeds unless scripted otherwise.
    pub fn accepting() -> Self {
        Self::with_fallback(Outcome::Accept)
    }

    /// Every open fails unless scripted otherwise.
    pub fn refusing() -> Self {
        Self::with_fallback(Outcome::Refuse)
    }

    /// Queue outcomes for the next opens, in order.
    pub fn script(&self, outcomes: &[Outcome]) {
        self.state.lock().unwrap().script.extend(outcomes.iter().copied());
    }

    /// Change what happens once the script runs out.
    pub fn set_fallback(&self, outcome: Outcome) {
        self.state.lock().unwrap().fallback = outcome;
    }

    /// Number of open attempts so far.
    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opens.len()
    }

    /// URLs of all open attempts.
    pub fn urls(&self) -> Vec<String> {
        self.state.lock().unwrap().opens.iter().map(|(u, _)| u.clone()).collect()
    }

    /// When each open attempt happened.
    pub fn open_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().opens.iter().map(|(_, t)| *t).collect()
    }

    /// The server end of the oldest accepted link not yet taken.
    pub fn take_peer(&self) -> LinkPeer {
        self.state
            .lock()
            .unwrap()
            .peers
            .pop_front()
            .expect("no accepted link")
    }
}

impl Transport for MockTransport {
    fn open(&self, url: &str) -> Pin<Box<dyn Future<Output = TransportResult<Link>> + Send + '_>> {
        let url = url.to_string();
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.opens.push((url, Instant::now()));
            let outcome = state.script.pop_front().unwrap_or(state.fallback);
            match outcome {
                Outcome::Accept => {
                    let (link, peer) = Link::pair();
                    state.peers.push_back(peer);
                    Ok(link)
                }
                Outcome::Refuse => Err(TransportError::ConnectionFailed("mock refused".into())),
                Outcome::InvalidUrl => Err(TransportError::InvalidUrl("mock invalid".into())),
            }
        })
    }
}

/// Collects every text frame the client has written so far.
pub fn sent_texts(peer: &mut LinkPeer) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(frame) = peer.try_recv_frame() {
        if let Frame::Text(text) = frame {
            out.push(text);
        }
    }
    out
}
