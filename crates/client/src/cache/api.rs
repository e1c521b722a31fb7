// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Backend session API.
//!
//! [`SessionApi`] is the seam the cache talks through; [`HttpSessionApi`]
//! is the production implementation over the REST endpoints.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use prep_core::{AnswerMap, NewSession, Session, SessionPatch};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Characters escaped in a path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Errors from the session API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never got a response.
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body was not what we expected.
    #[error("unexpected response: {0}")]
    Decode(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Boxed future returned by [`SessionApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = ApiResult<T>> + Send + 'a>>;

/// Remote persistence for sessions.
pub trait SessionApi: Send + Sync {
    fn get_sessions(&self, include_items: bool) -> ApiFuture<'_, Vec<Session>>;

    fn create_session<'a>(&'a self, data: &'a NewSession) -> ApiFuture<'a, Session>;

    fn update_session<'a>(&'a self, id: &'a str, patch: &'a SessionPatch) -> ApiFuture<'a, Session>;

    fn update_session_answers<'a>(
        &'a self,
        id: &'a str,
        answers: &'a AnswerMap,
    ) -> ApiFuture<'a, Session>;

    fn delete_session<'a>(&'a self, id: &'a str) -> ApiFuture<'a, ()>;
}

impl<A: SessionApi + ?Sized> SessionApi for Arc<A> {
    fn get_sessions(&self, include_items: bool) -> ApiFuture<'_, Vec<Session>> {
        (**self).get_sessions(include_items)
    }

    fn create_session<'a>(&'a self, data: &'a NewSession) -> ApiFuture<'a, Session> {
        (**self).create_session(data)
    }

    fn update_session<'a>(&'a self, id: &'a str, patch: &'a SessionPatch) -> ApiFuture<'a, Session> {
        (**self).update_session(id, patch)
    }

    fn update_session_answers<'a>(
        &'a self,
        id: &'a str,
        answers: &'a AnswerMap,
    ) -> ApiFuture<'a, Session> {
        (**self).update_session_answers(id, answers)
    }

    fn delete_session<'a>(&'a self, id: &'a str) -> ApiFuture<'a, ()> {
        (**self).delete_session(id)
    }
}

#[derive(Deserialize)]
struct SessionBody {
    session: Session,
}

#[derive(Deserialize)]
struct SessionListBody {
    sessions: Vec<Session>,
}

/// REST client for `{base}/...` session endpoints.
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSessionApi {
    /// Creates a client. `base_url` is the sessions collection, e.g.
    /// `http://localhost:8000/api/sessions`.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(HttpSessionApi {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn session_url(&self, id: &str, suffix: &str) -> String {
        format!(
            "{}/{}{}",
            self.base_url,
            utf8_percent_encode(id, PATH_SEGMENT),
            suffix
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "session api response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason()),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        self.execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Picks the most useful message out of an error body.
fn error_message(body: &str, reason: Option<&str>) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned());
    match detail {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => reason.unwrap_or("request failed").to_string(),
    }
}

impl SessionApi for HttpSessionApi {
    fn get_sessions(&self, include_items: bool) -> ApiFuture<'_, Vec<Session>> {
        Box::pin(async move {
            let request = self
                .client
                .get(format!("{}/", self.base_url))
                .query(&[("include_items", include_items)]);
            let body: SessionListBody = self.fetch(request).await?;
            Ok(body.sessions)
        })
    }

    fn create_session<'a>(&'a self, data: &'a NewSession) -> ApiFuture<'a, Session> {
        Box::pin(async move {
            let request = self.client.post(format!("{}/", self.base_url)).json(data);
            let body: SessionBody = self.fetch(request).await?;
            Ok(body.session)
        })
    }

    fn update_session<'a>(&'a self, id: &'a str, patch: &'a SessionPatch) -> ApiFuture<'a, Session> {
        Box::pin(async move {
            let request = self.client.put(self.session_url(id, "")).json(patch);
            let body: SessionBody = self.fetch(request).await?;
            Ok(body.session)
        })
    }

    fn update_session_answers<'a>(
        &'a self,
        id: &'a str,
        answers: &'a AnswerMap,
    ) -> ApiFuture<'a, Session> {
        Box::pin(async move {
            let request = self
                .client
                .put(self.session_url(id, "/answers"))
                .json(answers);
            let body: SessionBody = self.fetch(request).await?;
            Ok(body.session)
        })
    }

    fn delete_session<'a>(&'a self, id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.execute(self.client.delete(self.session_url(id, "")))
                .await?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
