// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Interview-preparation session types.
//!
//! A [`Session`] is a saved preparation context owned by one user; its
//! [`SessionItem`]s are the question/answer pairs, kept in display order.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// What a session was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// Questions derived from a job description.
    JobDescription,
    /// Questions derived from a resume.
    Resume,
}

impl SessionType {
    /// Returns the string representation used on the wire and in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::JobDescription => "job_description",
            SessionType::Resume => "resume",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "job_description" | "jd" => Ok(SessionType::JobDescription),
            "resume" => Ok(SessionType::Resume),
            _ => Err(Error::InvalidSessionType(s.to_string())),
        }
    }
}

/// Progress of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Created, nothing answered yet.
    #[default]
    New,
    /// Some answers in progress.
    InProgress,
    /// The user marked the session finished.
    Completed,
}

impl SessionStatus {
    /// Returns the string representation used on the wire and in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::New => "New",
            SessionStatus::InProgress => "InProgress",
            SessionStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['_', '-', ' '], "").as_str() {
            "new" => Ok(SessionStatus::New),
            "inprogress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// Kind of interview question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Technical,
    Behavioral,
    Experience,
}

impl Category {
    /// Returns the string representation used on the wire and in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technical => "technical",
            Category::Behavioral => "behavioral",
            Category::Experience => "experience",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "technical" => Ok(Category::Technical),
            "behavioral" => Ok(Category::Behavioral),
            "experience" => Ok(Category::Experience),
            _ => Err(Error::InvalidCategory(s.to_string())),
        }
    }
}

/// How hard a question is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Returns the string representation used on the wire and in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(Error::InvalidDifficulty(s.to_string())),
        }
    }
}

/// A single question/answer pair. Lives and dies with its parent session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionItem {
    pub id: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub category: Category,
    pub difficulty: Difficulty,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl SessionItem {
    /// Creates an unanswered item.
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        category: Category,
        difficulty: Difficulty,
        created_at: DateTime<Utc>,
    ) -> Self {
        SessionItem {
            id: id.into(),
            question: question.into(),
            answer: None,
            category,
            difficulty,
            created_at,
        }
    }

    /// True when the item carries a non-blank answer.
    pub fn is_answered(&self) -> bool {
        self.answer.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}

/// A user's saved interview-preparation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Server-assigned unique identifier.
    pub id: String,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub title: String,
    #[serde(default)]
    pub status: SessionStatus,
    /// Questions in display/priority order.
    #[serde(default)]
    pub items: Vec<SessionItem>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Creates an empty session in the `New` state.
    pub fn new(
        id: impl Into<String>,
        session_type: SessionType,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Session {
            id: id.into(),
            session_type,
            title: title.into(),
            status: SessionStatus::New,
            items: Vec::new(),
            created_at,
        }
    }

    /// Number of items with a non-blank answer.
    pub fn answered_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_answered()).count()
    }

    /// Moves the item at `from` so it ends up at index `to`.
    ///
    /// Returns false (and leaves the order alone) if either index is out of range.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        true
    }
}

/// Payload for creating a session. The server assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub title: String,
    #[serde(default)]
    pub items: Vec<SessionItem>,
}

/// Partial update. `None` fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<SessionItem>>,
}

impl SessionPatch {
    /// True when the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.status.is_none() && self.items.is_none()
    }
}

/// Answers keyed by item id, as sent by the autosave path.
pub type AnswerMap = BTreeMap<String, String>;

/// Parses an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// The backend emits naive timestamps for some records
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s)))
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
