// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::VecDeque;

use chrono::{TimeZone, Utc};
use prep_core::{Category, Difficulty, SessionItem, SessionType};
use tokio::sync::oneshot;

use super::*;
use crate::cache::api::{ApiError, ApiFuture, ApiResult};

fn session(id: &str, title: &str) -> Session {
    Session::new(
        id,
        SessionType::Resume,
        title,
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap(),
    )
}

fn with_items(mut s: Session, ids: &[&str]) -> Session {
    for id in ids {
        s.items.push(SessionItem::new(
            *id,
            format!("Question {}", id),
            Category::Technical,
            Difficulty::Intermediate,
            s.created_at,
        ));
    }
    s
}

/// Backend double: keeps its own session list, can fail on demand and can
/// hold calls until the test releases them.
#[derive(Default)]
struct MockApi {
    remote: Mutex<Vec<Session>>,
    failing: Mutex<bool>,
    calls: Mutex<Vec<String>>,
    gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    created: Mutex<u32>,
}

impl MockApi {
    fn with_remote(sessions: Vec<Session>) -> Arc<Self> {
        let api = MockApi::default();
        *api.remote.lock() = sessions;
        Arc::new(api)
    }

    fn fail(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// The next API call waits until the returned sender fires.
    fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().push_back(rx);
        tx
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    async fn enter(&self, call: &str) -> ApiResult<()> {
        self.calls.lock().push(call.to_string());
        let gate = self.gates.lock().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if *self.failing.lock() {
            return Err(ApiError::Status {
                status: 500,
                message: "backend down".into(),
            });
        }
        Ok(())
    }

    fn upsert(&self, id: &str, f: impl FnOnce(&mut Session)) -> Session {
        let mut remote = self.remote.lock();
        if !remote.iter().any(|s| s.id == id) {
            remote.push(session(id, "untitled"));
        }
        let slot = remote.iter_mut().find(|s| s.id == id).unwrap();
        f(slot);
        slot.clone()
    }
}

impl SessionApi for MockApi {
    fn get_sessions(&self, _include_items: bool) -> ApiFuture<'_, Vec<Session>> {
        Box::pin(async move {
            self.enter("get_sessions").await?;
            Ok(self.remote.lock().clone())
        })
    }

    fn create_session<'a>(&'a self, data: &'a NewSession) -> ApiFuture<'a, Session> {
        Box::pin(async move {
            self.enter("create_session").await?;
            let n = {
                let mut created = self.created.lock();
                *created += 1;
                *created
            };
            let mut s = session(&format!("new-{}", n), &data.title);
            s.session_type = data.session_type;
            s.items = data.items.clone();
            self.remote.lock().insert(0, s.clone());
            Ok(s)
        })
    }

    fn update_session<'a>(&'a self, id: &'a str, patch: &'a SessionPatch) -> ApiFuture<'a, Session> {
        Box::pin(async move {
            self.enter("update_session").await?;
            Ok(self.upsert(id, |s| {
                if let Some(title) = &patch.title {
                    s.title = title.clone();
                }
                if let Some(status) = patch.status {
                    s.status = status;
                }
                if let Some(items) = &patch.items {
                    s.items = items.clone();
                }
            }))
        })
    }

    fn update_session_answers<'a>(
        &'a self,
        id: &'a str,
        answers: &'a AnswerMap,
    ) -> ApiFuture<'a, Session> {
        Box::pin(async move {
            self.enter("update_session_answers").await?;
            Ok(self.upsert(id, |s| {
                for item in &mut s.items {
                    if let Some(answer) = answers.get(&item.id) {
                        item.answer = Some(answer.clone());
                    }
                }
            }))
        })
    }

    fn delete_session<'a>(&'a self, id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.enter("delete_session").await?;
            self.remote.lock().retain(|s| s.id != id);
            Ok(())
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn error(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

struct Harness {
    api: Arc<MockApi>,
    cache: Arc<SessionCache<Arc<MockApi>>>,
    events: Arc<Mutex<Vec<SessionEvent>>>,
    notices: Arc<RecordingNotifier>,
}

fn harness(remote: Vec<Session>) -> Harness {
    let api = MockApi::with_remote(remote);
    let bus = Arc::new(EventBus::new());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    bus.subscribe(move |event| sink.lock().push(event.clone()));
    let notices = Arc::new(RecordingNotifier::default());
    let cache = Arc::new(SessionCache::new(
        Arc::clone(&api),
        bus,
        Arc::clone(&notices) as Arc<dyn Notifier>,
    ));
    cache.set_user("user-1");
    Harness {
        api,
        cache,
        events,
        notices,
    }
}

async fn loaded(remote: Vec<Session>) -> Harness {
    let h = harness(remote);
    h.cache.load_sessions().await;
    h
}

fn cached_ids<A: SessionApi>(cache: &SessionCache<A>) -> Vec<String> {
    cache.get_cached_sessions().into_iter().map(|s| s.id).collect()
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn load_replaces_cached_list() {
    let h = harness(vec![session("a", "A"), session("b", "B")]);
    let loaded = h.cache.load_sessions().await;
    assert_eq!(loaded.len(), 2);
    assert_eq!(cached_ids(&h.cache), ["a", "b"]);
    assert_eq!(h.api.calls(), ["get_sessions"]);
}

#[tokio::test]
async fn load_failure_keeps_cache_and_returns_empty() {
    let h = loaded(vec![session("a", "A")]).await;
    h.api.fail(true);

    assert!(h.cache.load_sessions().await.is_empty());
    assert_eq!(cached_ids(&h.cache), ["a"]);
    assert!(h.notices.messages.lock().is_empty());
}

#[tokio::test]
async fn try_load_reports_failure_and_keeps_cache() {
    let h = loaded(vec![session("a", "A")]).await;
    h.api.fail(true);

    assert!(h.cache.try_load_sessions().await.is_err());
    assert_eq!(cached_ids(&h.cache), ["a"]);

    h.api.fail(false);
    let loaded = h.cache.try_load_sessions().await.unwrap();
    assert_eq!(loaded.len(), 1);
}

#[tokio::test]
async fn no_user_means_no_calls() {
    let h = harness(vec![session("a", "A")]);
    h.cache.clear_cache();

    assert!(h.cache.user().is_none());
    assert!(h.cache.load_sessions().await.is_empty());
    assert!(h
        .cache
        .create_session(&NewSession {
            session_type: SessionType::Resume,
            title: "x".into(),
            items: vec![],
        })
        .await
        .is_none());
    assert!(h.cache.update_session("a", &SessionPatch::default()).await.is_none());
    assert!(h.cache.update_session_answers("a", &AnswerMap::new()).await.is_none());
    assert!(!h.cache.delete_session("a").await);
    assert!(h.cache.get_cached_session("a").is_none());
    h.cache.update_multiple_sessions(&[session("a", "A2")]);

    assert!(h.api.calls().is_empty());
    assert!(h.events.lock().is_empty());
}

#[tokio::test]
async fn create_inserts_at_front_and_publishes() {
    let h = loaded(vec![session("a", "A"), session("b", "B")]).await;

    let created = h
        .cache
        .create_session(&NewSession {
            session_type: SessionType::JobDescription,
            title: "Platform Engineer".into(),
            items: vec![],
        })
        .await
        .unwrap();

    assert_eq!(created.id, "new-1");
    assert_eq!(cached_ids(&h.cache), ["new-1", "a", "b"]);
    assert_eq!(*h.events.lock(), [SessionEvent::Created(created)]);
}

#[tokio::test]
async fn create_failure_notifies_and_leaves_cache() {
    let h = loaded(vec![session("a", "A")]).await;
    h.api.fail(true);

    let result = h
        .cache
        .create_session(&NewSession {
            session_type: SessionType::Resume,
            title: "x".into(),
            items: vec![],
        })
        .await;

    assert!(result.is_none());
    assert_eq!(cached_ids(&h.cache), ["a"]);
    assert!(h.events.lock().is_empty());
    assert_eq!(h.notices.messages.lock().len(), 1);
    assert!(h.notices.messages.lock()[0].contains("backend down"));
}

#[tokio::test]
async fn update_replaces_entry_and_publishes_loud_event() {
    let h = loaded(vec![session("a", "A"), session("b", "B")]).await;
    let patch = SessionPatch {
        title: Some("Renamed".into()),
        ..SessionPatch::default()
    };

    let updated = h.cache.update_session("b", &patch).await.unwrap();

    assert_eq!(updated.title, "Renamed");
    assert_eq!(h.cache.get_cached_session("b").unwrap().title, "Renamed");
    assert_eq!(cached_ids(&h.cache), ["a", "b"]);
    assert_eq!(
        *h.events.lock(),
        [SessionEvent::Updated {
            session: updated,
            silent: false
        }]
    );
}

#[tokio::test]
async fn update_failure_notifies() {
    let h = loaded(vec![session("a", "A")]).await;
    h.api.fail(true);

    let patch = SessionPatch {
        title: Some("Renamed".into()),
        ..SessionPatch::default()
    };
    assert!(h.cache.update_session("a", &patch).await.is_none());
    assert_eq!(h.cache.get_cached_session("a").unwrap().title, "A");
    assert_eq!(h.notices.messages.lock().len(), 1);
    assert!(h.events.lock().is_empty());
}

#[tokio::test]
async fn answer_save_publishes_silent_event() {
    let h = loaded(vec![with_items(session("a", "A"), &["q1", "q2"])]).await;
    let mut answers = AnswerMap::new();
    answers.insert("q2".into(), "Shipped the cache layer".into());

    let updated = h.cache.update_session_answers("a", &answers).await.unwrap();

    assert_eq!(updated.answered_count(), 1);
    assert_eq!(h.cache.get_cached_session("a").unwrap().answered_count(), 1);
    assert!(matches!(
        h.events.lock().as_slice(),
        [SessionEvent::Updated { silent: true, .. }]
    ));
}

#[tokio::test]
async fn answer_save_failure_never_notifies() {
    let h = loaded(vec![with_items(session("a", "A"), &["q1"])]).await;
    h.api.fail(true);
    let mut answers = AnswerMap::new();
    answers.insert("q1".into(), "draft".into());

    assert!(h.cache.update_session_answers("a", &answers).await.is_none());

    assert!(h.notices.messages.lock().is_empty());
    assert!(h.events.lock().is_empty());
    assert_eq!(h.cache.get_cached_session("a").unwrap().answered_count(), 0);
    // One attempt, no retry
    assert_eq!(
        h.api.calls().iter().filter(|c| *c == "update_session_answers").count(),
        1
    );
}

#[tokio::test]
async fn delete_removes_and_publishes() {
    let h = loaded(vec![session("a", "A"), session("b", "B")]).await;

    assert!(h.cache.delete_session("a").await);

    assert_eq!(cached_ids(&h.cache), ["b"]);
    assert_eq!(*h.events.lock(), [SessionEvent::Deleted("a".into())]);
}

#[tokio::test]
async fn delete_of_absent_id_changes_nothing() {
    let h = loaded(vec![session("a", "A"), session("b", "B")]).await;

    assert!(h.cache.delete_session("zzz").await);

    assert_eq!(cached_ids(&h.cache), ["a", "b"]);
    assert!(h.events.lock().is_empty());
}

#[tokio::test]
async fn delete_failure_notifies_and_keeps_entry() {
    let h = loaded(vec![session("a", "A")]).await;
    h.api.fail(true);

    assert!(!h.cache.delete_session("a").await);
    assert_eq!(cached_ids(&h.cache), ["a"]);
    assert_eq!(h.notices.messages.lock().len(), 1);
}

#[tokio::test]
async fn batch_update_skips_unknown_ids_and_publishes_once() {
    let h = loaded(vec![session("a", "A"), session("b", "B")]).await;
    let batch = vec![session("b", "B2"), session("ghost", "G")];

    h.cache.update_multiple_sessions(&batch);

    assert_eq!(cached_ids(&h.cache), ["a", "b"]);
    assert_eq!(h.cache.get_cached_session("b").unwrap().title, "B2");
    assert_eq!(*h.events.lock(), [SessionEvent::BatchUpdated(batch)]);
    assert!(h.api.calls().iter().all(|c| c == "get_sessions"));
}

#[tokio::test]
async fn reorder_moves_item_and_persists() {
    let h = loaded(vec![with_items(session("a", "A"), &["q1", "q2", "q3"])]).await;

    let updated = h.cache.reorder_items("a", 2, 0).await.unwrap();

    let order: Vec<_> = updated.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(order, ["q3", "q1", "q2"]);
    let cached = h.cache.get_cached_session("a").unwrap();
    assert_eq!(cached.items[0].id, "q3");
    assert_eq!(h.api.calls().last().map(String::as_str), Some("update_session"));
}

#[tokio::test]
async fn reorder_out_of_range_does_nothing() {
    let h = loaded(vec![with_items(session("a", "A"), &["q1"])]).await;

    assert!(h.cache.reorder_items("a", 0, 5).await.is_none());
    assert!(h.cache.reorder_items("missing", 0, 0).await.is_none());
    assert_eq!(h.api.calls(), ["get_sessions"]);
}

#[tokio::test]
async fn concurrent_updates_last_response_wins() {
    let h = loaded(vec![session("a", "A")]).await;
    let first_gate = h.api.hold_next();
    let second_gate = h.api.hold_next();

    let cache = Arc::clone(&h.cache);
    let first = tokio::spawn(async move {
        let patch = SessionPatch {
            title: Some("first".into()),
            ..SessionPatch::default()
        };
        cache.update_session("a", &patch).await
    });
    settle().await;
    let cache = Arc::clone(&h.cache);
    let second = tokio::spawn(async move {
        let patch = SessionPatch {
            title: Some("second".into()),
            ..SessionPatch::default()
        };
        cache.update_session("a", &patch).await
    });
    settle().await;

    // The server handles both, but the responses arrive out of order
    second_gate.send(()).unwrap();
    second.await.unwrap();
    first_gate.send(()).unwrap();
    first.await.unwrap();

    assert_eq!(h.cache.get_cached_session("a").unwrap().title, "first");
    assert_eq!(h.events.lock().len(), 2);
}

#[tokio::test]
async fn responses_for_previous_user_are_discarded() {
    let h = harness(vec![session("a", "A")]);
    let gate = h.api.hold_next();

    let cache = Arc::clone(&h.cache);
    let load = tokio::spawn(async move { cache.load_sessions().await });
    settle().await;

    h.cache.set_user("user-2");
    gate.send(()).unwrap();

    assert!(load.await.unwrap().is_empty());
    assert!(h.cache.get_cached_sessions().is_empty());
    assert_eq!(h.cache.user().as_deref(), Some("user-2"));
}

#[tokio::test]
async fn switching_user_drops_sessions() {
    let h = loaded(vec![session("a", "A")]).await;

    h.cache.set_user("user-1");
    assert_eq!(cached_ids(&h.cache), ["a"]);

    h.cache.set_user("user-2");
    assert!(h.cache.get_cached_sessions().is_empty());
}

#[tokio::test]
async fn subscribers_can_read_cache_during_delivery() {
    let h = loaded(vec![session("a", "A")]).await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let cache = Arc::clone(&h.cache);
    h.cache.bus().subscribe(move |_| {
        sink.lock().push(cache.get_cached_sessions().len());
    });

    h.cache.delete_session("a").await;

    assert_eq!(*seen.lock(), [0]);
}
