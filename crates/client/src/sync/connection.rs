// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push-connection lifecycle: connect, bounded reconnect, keepalive, dispatch.
//!
//! [`ConnectionManager`] owns exactly one logical connection. Its state
//! machine:
//!
//! ```text
//!              connect()                 open ok
//! Disconnected ─────────► Connecting ───────────► Connected
//!      ▲  ▲                    │                      │
//!      │  │ close (budget      │ open failed /        │ transport error
//!      │  │  exhausted)        ▼ error                ▼
//!      │  └──────────────── Error ◄─────────────────  │
//!      │                       │ close                │ close
//!      │                       ▼                      │
//!      └─────────── Disconnected ◄────────────────────┘
//!                          │ attempts < max
//!                          ▼
//!                     Reconnecting ── timer ──► connect()
//! ```
//!
//! Every open attempt gets a fresh epoch. Events from a link whose epoch is
//! no longer current (superseded or manually closed) are ignored.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use prep_core::protocol::{
    self, AnswerGenerated, AnswerSaved, ClientMessage, GenerateQuestions, ProgressUpdate,
    QuestionsGenerated, ServerError, ServerMessage,
};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::router::{MessageKind, MessageRouter};
use super::transport::{LinkEvent, LinkWriter, Transport, TransportError, WebSocketTransport};

/// Characters escaped in the `session_id` query value.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Lifecycle state of the push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// A retry timer is pending.
    Reconnecting,
    Error,
}

impl ConnectionStatus {
    /// Returns the lowercase name used in logs and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Reconnecting => "reconnecting",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Base push endpoint (`ws://` or `wss://`).
    pub url: String,
    /// Correlates the connection with a server-side session.
    pub session_id: Option<String>,
    /// Reconnect automatically when the transport closes.
    pub auto_reconnect: bool,
    /// Reconnect budget; reset by every successful open.
    pub max_reconnect_attempts: u32,
    /// Fixed delay before each reconnect attempt.
    pub reconnect_interval: Duration,
    /// Ping period while connected. Zero disables keepalive.
    pub keepalive_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/websocket/ws".to_string(),
            session_id: None,
            auto_reconnect: true,
            max_reconnect_attempts: 5,
            reconnect_interval: Duration::from_millis(3000),
            keepalive_interval: Duration::from_millis(30_000),
        }
    }
}

impl ConnectionConfig {
    /// Builds the URL to open: the base endpoint plus `session_id`, if set.
    pub fn endpoint_url(&self) -> Result<String, TransportError> {
        let base = self.url.trim();
        let rest = base
            .strip_prefix("ws://")
            .or_else(|| base.strip_prefix("wss://"))
            .ok_or_else(|| {
                TransportError::InvalidUrl(format!("'{}' is not a ws:// or wss:// url", base))
            })?;
        if rest.is_empty() || rest.starts_with('/') {
            return Err(TransportError::InvalidUrl(format!("'{}' has no host", base)));
        }

        match &self.session_id {
            Some(id) => {
                let sep = if base.contains('?') { '&' } else { '?' };
                Ok(format!(
                    "{}{}session_id={}",
                    base,
                    sep,
                    utf8_percent_encode(id, QUERY_VALUE)
                ))
            }
            None => Ok(base.to_string()),
        }
    }
}

type Callback = Arc<dyn Fn() + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&TransportError) + Send + Sync>;
type StatusCallback = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

#[derive(Default, Clone)]
struct Callbacks {
    open: Option<Callback>,
    close: Option<Callback>,
    error: Option<ErrorCallback>,
    status: Option<StatusCallback>,
}

/// A callback to fire once the state lock is released.
enum Notice {
    Status(ConnectionStatus),
    Open,
    Close,
    Error(TransportError),
}

struct ConnState {
    status: ConnectionStatus,
    connection_id: Option<String>,
    reconnect_attempts: u32,
    manual_close: bool,
    epoch: u64,
    writer: Option<LinkWriter>,
    link_task: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
    keepalive: Option<JoinHandle<()>>,
    last_pong: Option<Instant>,
}

impl ConnState {
    fn new() -> Self {
        ConnState {
            status: ConnectionStatus::Disconnected,
            connection_id: None,
            reconnect_attempts: 0,
            manual_close: false,
            epoch: 0,
            writer: None,
            link_task: None,
            reconnect_timer: None,
            keepalive: None,
            last_pong: None,
        }
    }
}

struct Inner<T: Transport> {
    config: ConnectionConfig,
    transport: T,
    state: Mutex<ConnState>,
    router: RwLock<MessageRouter>,
    callbacks: RwLock<Callbacks>,
}

/// Owns one logical push connection.
///
/// Cheap to clone; clones share the same connection. Background tasks keep
/// the connection alive until [`disconnect`](Self::disconnect) is called or
/// the transport closes with no reconnect budget left.
pub struct ConnectionManager<T: Transport = WebSocketTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for ConnectionManager<T> {
    fn clone(&self) -> Self {
        ConnectionManager {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ConnectionManager<WebSocketTransport> {
    /// Create a connection manager over WebSockets.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_transport(config, WebSocketTransport::new())
    }
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a connection manager with a custom transport (for testing).
    pub fn with_transport(config: ConnectionConfig, transport: T) -> Self {
        ConnectionManager {
            inner: Arc::new(Inner {
                config,
                transport,
                state: Mutex::new(ConnState::new()),
                router: RwLock::new(MessageRouter::new()),
                callbacks: RwLock::new(Callbacks::default()),
            }),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Get the current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.lock().status
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Server-assigned id of the current connection, once the handshake arrived.
    pub fn connection_id(&self) -> Option<String> {
        self.inner.state.lock().connection_id.clone()
    }

    /// Reconnect attempts used since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.state.lock().reconnect_attempts
    }

    /// When the last keepalive acknowledgment arrived.
    pub fn last_pong(&self) -> Option<Instant> {
        self.inner.state.lock().last_pong
    }

    // Lifecycle callbacks. Each registration replaces the previous one.

    pub fn on_open(&self, f: impl Fn() + Send + Sync + 'static) {
        self.inner.callbacks.write().open = Some(Arc::new(f));
    }

    pub fn on_close(&self, f: impl Fn() + Send + Sync + 'static) {
        self.inner.callbacks.write().close = Some(Arc::new(f));
    }

    pub fn on_error(&self, f: impl Fn(&TransportError) + Send + Sync + 'static) {
        self.inner.callbacks.write().error = Some(Arc::new(f));
    }

    pub fn on_status_change(&self, f: impl Fn(ConnectionStatus) + Send + Sync + 'static) {
        self.inner.callbacks.write().status = Some(Arc::new(f));
    }

    // Message handlers.

    /// Registers a handler for one kind of inbound message.
    pub fn on_message(&self, kind: MessageKind, f: impl Fn(&ServerMessage) + Send + Sync + 'static) {
        let _ = self.inner.router.write().on(kind, Arc::new(f));
    }

    /// Registers the handler for message types this client does not know.
    pub fn on_unknown(&self, f: impl Fn(&str, Option<&Value>) + Send + Sync + 'static) {
        self.inner.router.write().on_fallback(Arc::new(f));
    }

    pub fn on_progress(&self, f: impl Fn(&ProgressUpdate) + Send + Sync + 'static) {
        self.on_message(MessageKind::ProgressUpdate, move |msg| {
            if let ServerMessage::ProgressUpdate(update) = msg {
                f(update);
            }
        });
    }

    pub fn on_questions_generated(&self, f: impl Fn(&QuestionsGenerated) + Send + Sync + 'static) {
        self.on_message(MessageKind::QuestionsGenerated, move |msg| {
            if let ServerMessage::QuestionsGenerated(batch) = msg {
                f(batch);
            }
        });
    }

    pub fn on_answer_saved(&self, f: impl Fn(&AnswerSaved) + Send + Sync + 'static) {
        self.on_message(MessageKind::AnswerSaved, move |msg| {
            if let ServerMessage::AnswerSaved(saved) = msg {
                f(saved);
            }
        });
    }

    pub fn on_answer_generated(&self, f: impl Fn(&AnswerGenerated) + Send + Sync + 'static) {
        self.on_message(MessageKind::AnswerGenerated, move |msg| {
            if let ServerMessage::AnswerGenerated(generated) = msg {
                f(generated);
            }
        });
    }

    pub fn on_server_error(&self, f: impl Fn(&ServerError) + Send + Sync + 'static) {
        self.on_message(MessageKind::Error, move |msg| {
            if let ServerMessage::Error(err) = msg {
                f(err);
            }
        });
    }

    /// Opens the connection.
    ///
    /// No-op while connected or while an open is already in flight. Must be
    /// called from within a tokio runtime.
    pub fn connect(&self) {
        let inner = &self.inner;
        let mut notices = Vec::new();

        let attempt = {
            let mut st = inner.state.lock();
            if matches!(
                st.status,
                ConnectionStatus::Connected | ConnectionStatus::Connecting
            ) {
                debug!(status = %st.status, "connect ignored");
                return;
            }

            st.manual_close = false;
            st.epoch += 1;
            if let Some(timer) = st.reconnect_timer.take() {
                timer.abort();
            }
            if let Some(task) = st.link_task.take() {
                task.abort();
            }
            if let Some(writer) = st.writer.take() {
                writer.close();
            }

            match inner.config.endpoint_url() {
                Ok(url) => {
                    set_status(inner, &mut st, ConnectionStatus::Connecting, &mut notices);
                    Some((st.epoch, url))
                }
                Err(e) => {
                    warn!(error = %e, "cannot build push endpoint");
                    set_status(inner, &mut st, ConnectionStatus::Error, &mut notices);
                    notices.push(Notice::Error(e));
                    None
                }
            }
        };
        inner.fire(notices);

        let Some((epoch, url)) = attempt else {
            return;
        };
        info!(url = %url, "opening push connection");

        let task = tokio::spawn(run_link(Arc::clone(inner), epoch, url));
        let mut st = inner.state.lock();
        if st.epoch == epoch {
            st.link_task = Some(task);
        } else {
            task.abort();
        }
    }

    #[cfg(test)]
    pub(super) fn epoch(&self) -> u64 {
        self.inner.state.lock().epoch
    }

    /// Runs the body of a reconnect timer scheduled under `epoch`.
    #[cfg(test)]
    pub(super) fn fire_reconnect_timer(&self, epoch: u64) {
        reconnect_due(Arc::clone(&self.inner), epoch);
    }

    /// Closes the connection and cancels any pending reconnect.
    ///
    /// Idempotent. Does not fire the close callback.
    pub fn disconnect(&self) {
        let inner = &self.inner;
        let mut notices = Vec::new();
        {
            let mut st = inner.state.lock();
            st.manual_close = true;
            st.epoch += 1;
            if let Some(timer) = st.reconnect_timer.take() {
                timer.abort();
            }
            if let Some(task) = st.link_task.take() {
                task.abort();
            }
            if let Some(writer) = st.writer.take() {
                writer.close();
            }
            set_status(inner, &mut st, ConnectionStatus::Disconnected, &mut notices);
            st.connection_id = None;
        }
        if !notices.is_empty() {
            info!("push connection closed by client");
        }
        inner.fire(notices);
    }

    /// Writes a message if connected. Returns false, writing nothing, otherwise.
    pub fn send(&self, msg: &ClientMessage) -> bool {
        send_message(&self.inner, msg)
    }

    /// Requests question generation.
    pub fn generate_questions(&self, request: GenerateQuestions) -> bool {
        self.send(&ClientMessage::generate_questions(request))
    }

    /// Saves an answer.
    pub fn save_answer(&self, question_id: impl Into<String>, answer: impl Into<String>) -> bool {
        self.send(&ClientMessage::save_answer(question_id, answer))
    }

    /// Requests a suggested answer for a question.
    pub fn generate_answer(&self, question: impl Into<String>, resume_text: impl Into<String>) -> bool {
        self.send(&ClientMessage::generate_answer(question, resume_text))
    }

    /// Sends a keepalive probe.
    pub fn ping(&self) -> bool {
        self.send(&ClientMessage::ping())
    }
}

impl<T: Transport> Inner<T> {
    fn fire(&self, notices: Vec<Notice>) {
        if notices.is_empty() {
            return;
        }
        let callbacks = self.callbacks.read().clone();
        for notice in notices {
            match notice {
                Notice::Status(status) => {
                    if let Some(f) = &callbacks.status {
                        f(status);
                    }
                }
                Notice::Open => {
                    if let Some(f) = &callbacks.open {
                        f();
                    }
                }
                Notice::Close => {
                    if let Some(f) = &callbacks.close {
                        f();
                    }
                }
                Notice::Error(error) => {
                    if let Some(f) = &callbacks.error {
                        f(&error);
                    }
                }
            }
        }
    }
}

/// Moves to `status`, keeping the keepalive timer and connection id in step.
fn set_status<T: Transport>(
    inner: &Arc<Inner<T>>,
    st: &mut ConnState,
    status: ConnectionStatus,
    notices: &mut Vec<Notice>,
) {
    if st.status == status {
        return;
    }
    let was = st.status;
    st.status = status;
    debug!(from = %was, to = %status, "connection status changed");

    if let Some(timer) = st.keepalive.take() {
        timer.abort();
    }
    if status == ConnectionStatus::Connected && !inner.config.keepalive_interval.is_zero() {
        st.keepalive = Some(spawn_keepalive(
            Arc::downgrade(inner),
            inner.config.keepalive_interval,
        ));
    }
    if status == ConnectionStatus::Disconnected {
        st.connection_id = None;
    }
    notices.push(Notice::Status(status));
}

fn spawn_keepalive<T: Transport>(inner: Weak<Inner<T>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            if !send_message(&inner, &ClientMessage::ping()) {
                debug!("keepalive ping not sent");
            }
        }
    })
}

fn spawn_reconnect<T: Transport>(
    inner: Weak<Inner<T>>,
    epoch: u64,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        reconnect_due(inner, epoch);
    })
}

/// Runs a reconnect timer scheduled under `epoch`.
///
/// A timer from an older epoch has been superseded by a manual connect or
/// disconnect; it must leave the slot and the connection alone.
fn reconnect_due<T: Transport>(inner: Arc<Inner<T>>, epoch: u64) {
    {
        let mut st = inner.state.lock();
        if st.epoch != epoch {
            debug!(epoch, current = st.epoch, "stale reconnect timer ignored");
            return;
        }
        // This task is the pending timer; clear it so connect() won't abort us
        st.reconnect_timer = None;
    }
    ConnectionManager { inner }.connect();
}

fn send_message<T: Transport>(inner: &Inner<T>, msg: &ClientMessage) -> bool {
    let st = inner.state.lock();
    if st.status != ConnectionStatus::Connected {
        debug!(kind = msg.kind(), status = %st.status, "send skipped: not connected");
        return false;
    }
    let Some(writer) = st.writer.as_ref() else {
        return false;
    };
    match msg.encode() {
        Ok(frame) => writer.send_text(frame),
        Err(e) => {
            warn!(kind = msg.kind(), error = %e, "failed to encode message");
            false
        }
    }
}

/// Drives one open attempt and, if it succeeds, the link until it closes.
async fn run_link<T: Transport>(inner: Arc<Inner<T>>, epoch: u64, url: String) {
    let link = match inner.transport.open(&url).await {
        Ok(link) => link,
        Err(e) => {
            let retryable = e.is_retryable();
            handle_error(&inner, epoch, e);
            if retryable {
                handle_close(&inner, epoch);
            }
            return;
        }
    };

    let (writer, mut events) = link.into_parts();
    if !handle_open(&inner, epoch, writer) {
        return;
    }

    while let Some(event) = events.recv().await {
        match event {
            LinkEvent::Text(text) => handle_frame(&inner, epoch, &text),
            LinkEvent::Failed(e) => handle_error(&inner, epoch, e),
            LinkEvent::Closed => break,
        }
    }
    handle_close(&inner, epoch);
}

fn handle_open<T: Transport>(inner: &Arc<Inner<T>>, epoch: u64, writer: LinkWriter) -> bool {
    let mut notices = Vec::new();
    {
        let mut st = inner.state.lock();
        if st.epoch != epoch || st.manual_close {
            writer.close();
            return false;
        }
        st.writer = Some(writer);
        st.reconnect_attempts = 0;
        set_status(inner, &mut st, ConnectionStatus::Connected, &mut notices);
        notices.push(Notice::Open);
    }
    info!("push connection open");
    inner.fire(notices);
    true
}

fn handle_error<T: Transport>(inner: &Arc<Inner<T>>, epoch: u64, error: TransportError) {
    let mut notices = Vec::new();
    {
        let mut st = inner.state.lock();
        if st.epoch != epoch || st.manual_close {
            return;
        }
        warn!(error = %error, "push connection error");
        set_status(inner, &mut st, ConnectionStatus::Error, &mut notices);
        notices.push(Notice::Error(error));
    }
    inner.fire(notices);
}

fn handle_close<T: Transport>(inner: &Arc<Inner<T>>, epoch: u64) {
    let mut notices = Vec::new();
    {
        let mut st = inner.state.lock();
        if st.epoch != epoch || st.manual_close {
            return;
        }
        st.writer = None;
        st.link_task = None;
        set_status(inner, &mut st, ConnectionStatus::Disconnected, &mut notices);
        notices.push(Notice::Close);

        let config = &inner.config;
        if config.auto_reconnect && st.reconnect_attempts < config.max_reconnect_attempts {
            st.reconnect_attempts += 1;
            set_status(inner, &mut st, ConnectionStatus::Reconnecting, &mut notices);
            if let Some(timer) = st.reconnect_timer.take() {
                timer.abort();
            }
            st.reconnect_timer = Some(spawn_reconnect(
                Arc::downgrade(inner),
                epoch,
                config.reconnect_interval,
            ));
            info!(
                attempt = st.reconnect_attempts,
                max = config.max_reconnect_attempts,
                delay_ms = config.reconnect_interval.as_millis() as u64,
                "push connection lost; reconnect scheduled"
            );
        } else if config.auto_reconnect {
            warn!(
                attempts = st.reconnect_attempts,
                "reconnect budget exhausted; call connect() to resume"
            );
        } else {
            info!("push connection closed");
        }
    }
    inner.fire(notices);
}

fn handle_frame<T: Transport>(inner: &Arc<Inner<T>>, epoch: u64, text: &str) {
    let msg = match protocol::decode(text) {
        Ok(inbound) => inbound.message,
        Err(e) => {
            warn!(error = %e, "discarding malformed push frame");
            return;
        }
    };

    {
        let mut st = inner.state.lock();
        if st.epoch != epoch {
            return;
        }
        match &msg {
            ServerMessage::Connection { connection_id } => {
                info!(connection_id = ?connection_id, "push handshake received");
                st.connection_id = connection_id.clone();
            }
            ServerMessage::Pong => {
                st.last_pong = Some(Instant::now());
            }
            ServerMessage::Error(err) => {
                warn!(
                    message = %err.message,
                    error_type = err.error_type.as_deref().unwrap_or("general"),
                    "server reported an error"
                );
            }
            _ => {}
        }
    }

    let route = inner.router.read().route(&msg);
    if !route.dispatch(&msg) {
        debug!(kind = msg.kind(), "no handler for push message");
    }
}
