// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the push connection.
//!
//! Provides a trait-based transport layer that enables:
//! - Real WebSocket connections for production
//! - Mock transports for unit testing
//!
//! A successful [`Transport::open`] yields a [`Link`]: a writer half that
//! accepts outbound frames without blocking, and an event stream of inbound
//! frames followed by exactly one terminal [`LinkEvent::Closed`].

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The endpoint URL could not be built or understood.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

impl TransportError {
    /// Whether a close-driven reconnect can make sense after this error.
    ///
    /// A malformed URL fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::InvalidUrl(_))
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Outbound frame handed to a transport's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// Close the connection gracefully.
    Close,
}

/// Something that happened on an open link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// An inbound text frame.
    Text(String),
    /// The link hit an error; a `Closed` follows.
    Failed(TransportError),
    /// The link is gone. Always the last event.
    Closed,
}

/// Writer half of an open link.
#[derive(Debug, Clone)]
pub struct LinkWriter {
    tx: mpsc::UnboundedSender<Frame>,
}

impl LinkWriter {
    /// Queues a text frame for the transport. Returns false if the link is gone.
    pub fn send_text(&self, text: String) -> bool {
        self.tx.send(Frame::Text(text)).is_ok()
    }

    /// Asks the transport to close the link.
    pub fn close(&self) {
        let _ = self.tx.send(Frame::Close);
    }

    /// Whether the transport side is still accepting frames.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// An open connection as seen by the connection manager.
#[derive(Debug)]
pub struct Link {
    writer: LinkWriter,
    events: mpsc::UnboundedReceiver<LinkEvent>,
}

impl Link {
    /// Creates a connected link and the transport-side end that drives it.
    pub fn pair() -> (Link, LinkPeer) {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let link = Link {
            writer: LinkWriter { tx: frame_tx },
            events: event_rx,
        };
        let peer = LinkPeer {
            events: event_tx,
            frames: frame_rx,
        };
        (link, peer)
    }

    /// Splits into the writer and the inbound event stream.
    pub fn into_parts(self) -> (LinkWriter, mpsc::UnboundedReceiver<LinkEvent>) {
        (self.writer, self.events)
    }
}

/// Transport-side end of a [`Link`].
#[derive(Debug)]
pub struct LinkPeer {
    events: mpsc::UnboundedSender<LinkEvent>,
    frames: mpsc::UnboundedReceiver<Frame>,
}

impl LinkPeer {
    /// Delivers an inbound text frame to the link owner.
    pub fn push_text(&self, text: impl Into<String>) -> bool {
        self.events.send(LinkEvent::Text(text.into())).is_ok()
    }

    /// Reports an error followed by a close.
    pub fn fail(&self, error: TransportError) {
        let _ = self.events.send(LinkEvent::Failed(error));
        let _ = self.events.send(LinkEvent::Closed);
    }

    /// Reports that the link closed.
    pub fn close(&self) {
        let _ = self.events.send(LinkEvent::Closed);
    }

    /// Waits for the next outbound frame. `None` once the writer is dropped.
    pub async fn recv_frame(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }

    /// Takes the next outbound frame if one is already queued.
    pub fn try_recv_frame(&mut self) -> Option<Frame> {
        self.frames.try_recv().ok()
    }

    /// Splits into the event sender and the outbound frame receiver.
    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedSender<LinkEvent>,
        mpsc::UnboundedReceiver<Frame>,
    ) {
        (self.events, self.frames)
    }
}

/// Transport trait for push-connection communication.
///
/// This trait abstracts over the actual transport mechanism, allowing
/// for easy testing with mock implementations.
pub trait Transport: Send + Sync + 'static {
    /// Opens a connection to `url`.
    fn open(&self, url: &str) -> Pin<Box<dyn Future<Output = TransportResult<Link>> + Send + '_>>;
}

/// WebSocket transport implementation using tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    pub fn new() -> Self {
        WebSocketTransport
    }
}

impl Transport for WebSocketTransport {
    fn open(&self, url: &str) -> Pin<Box<dyn Future<Output = TransportResult<Link>> + Send + '_>> {
        let url = url.to_string();
        Box::pin(async move {
            use futures_util::{SinkExt, StreamExt};
            use tokio_tungstenite::tungstenite::{Error as WsError, Message};

            let (ws_stream, _) =
                tokio_tungstenite::connect_async(url.as_str())
                    .await
                    .map_err(|e| match e {
                        WsError::Url(e) => TransportError::InvalidUrl(e.to_string()),
                        other => TransportError::ConnectionFailed(other.to_string()),
                    })?;

            let (mut sink, mut stream) = ws_stream.split();
            let (link, peer) = Link::pair();
            let (events, mut frames) = peer.into_parts();

            let writer_events = events.clone();
            tokio::spawn(async move {
                while let Some(frame) = frames.recv().await {
                    match frame {
                        Frame::Text(text) => {
                            if let Err(e) = sink.send(Message::Text(text.into())).await {
                                let _ = writer_events
                                    .send(LinkEvent::Failed(TransportError::SendFailed(e.to_string())));
                                return;
                            }
                        }
                        Frame::Close => break,
                    }
                }
                // Writer dropped or close requested
                let _ = sink.close().await;
            });

            tokio::spawn(async move {
                loop {
                    match stream.next().await {
                        Some(Ok(Message::Text(text))) => {
                            if events.send(LinkEvent::Text(text.to_string())).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {
                            // Ping/pong frames are answered by tungstenite; binary is unused
                            continue;
                        }
                        Some(Err(e)) => {
                            let _ = events.send(LinkEvent::Failed(TransportError::ReceiveFailed(
                                e.to_string(),
                            )));
                            break;
                        }
                    }
                }
                let _ = events.send(LinkEvent::Closed);
            });

            Ok(link)
        })
    }
}
