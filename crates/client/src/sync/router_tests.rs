// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use parking_lot::Mutex;
use yare::parameterized;

fn recorder() -> (Arc<Mutex<Vec<String>>>, Handler) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler: Handler = Arc::new(move |msg: &ServerMessage| {
        sink.lock().push(msg.kind().to_string());
    });
    (seen, handler)
}

#[parameterized(
    connection = { ServerMessage::connection("c"), Some(MessageKind::Connection) },
    progress = { ServerMessage::progress("s", "m", 1.0), Some(MessageKind::ProgressUpdate) },
    error = { ServerMessage::error("e"), Some(MessageKind::Error) },
    pong = { ServerMessage::pong(), Some(MessageKind::Pong) },
    other = { ServerMessage::Other { kind: "x".into(), data: None }, None },
)]
fn message_kind_of(msg: ServerMessage, expected: Option<MessageKind>) {
    assert_eq!(MessageKind::of(&msg), expected);
    if let Some(kind) = expected {
        assert_eq!(kind.as_str(), msg.kind());
    }
}

#[test]
fn routes_known_kind_to_its_handler() {
    let mut router = MessageRouter::new();
    let (seen, handler) = recorder();
    router.on(MessageKind::ProgressUpdate, handler);

    let msg = ServerMessage::progress("analyzing", "", 25.0);
    assert!(router.route(&msg).dispatch(&msg));
    assert_eq!(*seen.lock(), ["progress_update"]);
}

#[test]
fn known_kind_without_handler_is_unhandled() {
    let mut router = MessageRouter::new();
    router.on_fallback(Arc::new(|_: &str, _: Option<&Value>| {
        unreachable!("fallback must not see known kinds")
    }));

    let msg = ServerMessage::pong();
    assert!(matches!(router.route(&msg), Route::Unhandled));
    assert!(!router.route(&msg).dispatch(&msg));
}

#[test]
fn unknown_kind_goes_to_fallback_with_raw_data() {
    let mut router = MessageRouter::new();
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    router.on_fallback(Arc::new(move |kind: &str, data: Option<&Value>| {
        *sink.lock() = Some((kind.to_string(), data.cloned()));
    }));

    let msg = ServerMessage::Other {
        kind: "quota_warning".into(),
        data: Some(serde_json::json!({ "left": 3 })),
    };
    assert!(router.route(&msg).dispatch(&msg));
    assert_eq!(
        *seen.lock(),
        Some((
            "quota_warning".to_string(),
            Some(serde_json::json!({ "left": 3 }))
        ))
    );
}

#[test]
fn unknown_kind_without_fallback_is_unhandled() {
    let router = MessageRouter::new();
    let msg = ServerMessage::Other {
        kind: "x".into(),
        data: None,
    };
    assert!(!router.route(&msg).dispatch(&msg));
}

#[test]
fn fallback_route_ignores_known_kinds() {
    let calls = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&calls);
    let route = Route::Fallback(Arc::new(move |_: &str, _: Option<&Value>| {
        *sink.lock() += 1;
    }));

    assert!(!route.dispatch(&ServerMessage::Pong));
    assert_eq!(*calls.lock(), 0);
}

#[test]
fn registering_again_replaces_handler() {
    let mut router = MessageRouter::new();
    let (first_seen, first) = recorder();
    let (second_seen, second) = recorder();

    assert!(router.on(MessageKind::Error, first).is_none());
    assert!(router.on(MessageKind::Error, second).is_some());

    let msg = ServerMessage::error("boom");
    router.route(&msg).dispatch(&msg);
    assert!(first_seen.lock().is_empty());
    assert_eq!(second_seen.lock().len(), 1);
}

#[test]
fn off_removes_handler() {
    let mut router = MessageRouter::new();
    let (_seen, handler) = recorder();
    router.on(MessageKind::AnswerSaved, handler);
    assert!(router.has_handler(MessageKind::AnswerSaved));

    assert!(router.off(MessageKind::AnswerSaved).is_some());
    assert!(!router.has_handler(MessageKind::AnswerSaved));
}
