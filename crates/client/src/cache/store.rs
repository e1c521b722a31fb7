// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory cache of the current user's sessions.
//!
//! Every mutation goes to the API first; the cache is only touched once the
//! response arrives, and a [`SessionEvent`] is published afterwards. Failed
//! mutations leave the cache as it was.

use std::sync::Arc;

use parking_lot::Mutex;
use prep_core::{AnswerMap, NewSession, Session, SessionPatch};
use tracing::{debug, info, warn};

use super::api::{ApiResult, SessionApi};
use super::bus::{EventBus, SessionEvent};
use super::notify::Notifier;

#[derive(Default)]
struct CacheState {
    user: Option<String>,
    /// Bumped whenever the user association changes; responses started
    /// under an older generation are dropped.
    generation: u64,
    sessions: Vec<Session>,
}

/// Session list for one user, kept in step with the backend.
pub struct SessionCache<A: SessionApi> {
    api: A,
    bus: Arc<EventBus>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<CacheState>,
}

impl<A: SessionApi> SessionCache<A> {
    pub fn new(api: A, bus: Arc<EventBus>, notifier: Arc<dyn Notifier>) -> Self {
        SessionCache {
            api,
            bus,
            notifier,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Associates the cache with a user. Switching users drops cached sessions.
    pub fn set_user(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        let mut st = self.state.lock();
        if st.user.as_deref() == Some(user_id.as_str()) {
            return;
        }
        debug!(user = %user_id, "cache user set");
        st.user = Some(user_id);
        st.generation += 1;
        st.sessions.clear();
    }

    pub fn user(&self) -> Option<String> {
        self.state.lock().user.clone()
    }

    /// Forgets the sessions and the user association.
    pub fn clear_cache(&self) {
        let mut st = self.state.lock();
        st.user = None;
        st.generation += 1;
        st.sessions.clear();
        debug!("cache cleared");
    }

    /// Snapshot of cached sessions, most recent first.
    pub fn get_cached_sessions(&self) -> Vec<Session> {
        let st = self.state.lock();
        if st.user.is_none() {
            return Vec::new();
        }
        st.sessions.clone()
    }

    pub fn get_cached_session(&self, id: &str) -> Option<Session> {
        let st = self.state.lock();
        st.user.as_ref()?;
        st.sessions.iter().find(|s| s.id == id).cloned()
    }

    /// Replaces the cached list with a full fetch.
    ///
    /// On failure the cache is left alone and an empty list is returned.
    pub async fn load_sessions(&self) -> Vec<Session> {
        match self.try_load_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(error = %e, "failed to load sessions");
                Vec::new()
            }
        }
    }

    /// Like [`load_sessions`](Self::load_sessions), but reports a failed
    /// fetch instead of returning an empty list.
    pub async fn try_load_sessions(&self) -> ApiResult<Vec<Session>> {
        let Some(ticket) = self.ticket() else {
            debug!("load skipped: no user");
            return Ok(Vec::new());
        };

        let sessions = self.api.get_sessions(true).await?;
        let mut st = self.state.lock();
        if st.generation != ticket {
            debug!("discarding sessions fetched for a previous user");
            return Ok(Vec::new());
        }
        st.sessions = sessions.clone();
        info!(count = sessions.len(), "sessions loaded");
        Ok(sessions)
    }

    /// Creates a session and puts it at the front of the cache.
    pub async fn create_session(&self, data: &NewSession) -> Option<Session> {
        let ticket = self.ticket()?;

        let session = match self.api.create_session(data).await {
            Ok(session) => session,
            Err(e) => {
                self.notifier.error(&format!("Failed to create session: {}", e));
                return None;
            }
        };

        {
            let mut st = self.state.lock();
            if st.generation != ticket {
                debug!(id = %session.id, "discarding created session for a previous user");
                return None;
            }
            st.sessions.insert(0, session.clone());
        }
        info!(id = %session.id, "session created");
        self.bus.publish(&SessionEvent::Created(session.clone()));
        Some(session)
    }

    /// Applies a patch. Failures are shown to the user.
    pub async fn update_session(&self, id: &str, patch: &SessionPatch) -> Option<Session> {
        let ticket = self.ticket()?;

        match self.api.update_session(id, patch).await {
            Ok(session) => self.apply_update(ticket, session, false),
            Err(e) => {
                self.notifier.error(&format!("Failed to update session: {}", e));
                None
            }
        }
    }

    /// Saves answers in the background. Failures are logged, never shown,
    /// and not retried.
    pub async fn update_session_answers(&self, id: &str, answers: &AnswerMap) -> Option<Session> {
        let ticket = self.ticket()?;

        match self.api.update_session_answers(id, answers).await {
            Ok(session) => self.apply_update(ticket, session, true),
            Err(e) => {
                warn!(id, error = %e, "autosave failed");
                None
            }
        }
    }

    /// Deletes a session. Returns whether the backend accepted the delete.
    pub async fn delete_session(&self, id: &str) -> bool {
        let Some(ticket) = self.ticket() else {
            return false;
        };

        if let Err(e) = self.api.delete_session(id).await {
            self.notifier.error(&format!("Failed to delete session: {}", e));
            return false;
        }

        let removed = {
            let mut st = self.state.lock();
            if st.generation != ticket {
                debug!(id, "discarding delete for a previous user");
                return true;
            }
            let before = st.sessions.len();
            st.sessions.retain(|s| s.id != id);
            st.sessions.len() != before
        };
        if removed {
            info!(id, "session deleted");
            self.bus.publish(&SessionEvent::Deleted(id.to_string()));
        } else {
            debug!(id, "deleted session was not cached");
        }
        true
    }

    /// Replaces cached entries with the given versions, skipping unknown ids.
    /// Publishes one event carrying the whole input.
    pub fn update_multiple_sessions(&self, sessions: &[Session]) {
        {
            let mut st = self.state.lock();
            if st.user.is_none() {
                return;
            }
            for updated in sessions {
                if let Some(slot) = st.sessions.iter_mut().find(|s| s.id == updated.id) {
                    *slot = updated.clone();
                }
            }
        }
        self.bus.publish(&SessionEvent::BatchUpdated(sessions.to_vec()));
    }

    /// Moves one item of a cached session and saves the new order.
    pub async fn reorder_items(&self, id: &str, from: usize, to: usize) -> Option<Session> {
        let mut session = self.get_cached_session(id)?;
        if !session.move_item(from, to) {
            debug!(id, from, to, "reorder out of range");
            return None;
        }
        let patch = SessionPatch {
            items: Some(session.items),
            ..SessionPatch::default()
        };
        self.update_session(id, &patch).await
    }

    fn ticket(&self) -> Option<u64> {
        let st = self.state.lock();
        st.user.as_ref().map(|_| st.generation)
    }

    fn apply_update(&self, ticket: u64, session: Session, silent: bool) -> Option<Session> {
        {
            let mut st = self.state.lock();
            if st.generation != ticket {
                debug!(id = %session.id, "discarding update for a previous user");
                return None;
            }
            if let Some(slot) = st.sessions.iter_mut().find(|s| s.id == session.id) {
                *slot = session.clone();
            }
        }
        debug!(id = %session.id, silent, "session updated");
        self.bus.publish(&SessionEvent::Updated {
            session: session.clone(),
            silent,
        });
        Some(session)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
