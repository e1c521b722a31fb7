// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push-channel protocol messages and their wire codec.
//!
//! Every frame is a JSON envelope:
//!
//! ```text
//! { "type": "<kind>", "data": { ... }, "timestamp": 1234.5 }
//! ```
//!
//! `type` is required; `data` and `timestamp` are optional. Outbound frames
//! are [`ClientMessage`]s; inbound frames decode into [`ServerMessage`], with
//! every known kind validated into its own variant and anything else kept as
//! [`ServerMessage::Other`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ParseError};
use crate::session::{parse_timestamp, Category, Difficulty, SessionItem};

/// Raw wire envelope, before the payload is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message discriminator.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    /// Top-level fields other than the three above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Creates an envelope with no timestamp or extra fields.
    pub fn new(kind: impl Into<String>, data: Option<Value>) -> Self {
        Envelope {
            kind: kind.into(),
            data,
            timestamp: None,
            extra: Map::new(),
        }
    }

    /// Parses a wire frame into an envelope.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(text)?;
        if !value.get("type").is_some_and(Value::is_string) {
            return Err(ParseError::MissingType);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Serializes the envelope to a wire frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Which inputs question generation should draw on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GenerationMode {
    #[serde(rename = "resume")]
    Resume,
    #[serde(rename = "jd")]
    JobDescription,
    #[default]
    #[serde(rename = "combined")]
    Combined,
}

impl GenerationMode {
    /// Returns the string representation used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Resume => "resume",
            GenerationMode::JobDescription => "jd",
            GenerationMode::Combined => "combined",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_lowercase().as_str() {
            "resume" => Ok(GenerationMode::Resume),
            "jd" | "job_description" => Ok(GenerationMode::JobDescription),
            "combined" => Ok(GenerationMode::Combined),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

/// Knobs for a question generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default = "default_question_count")]
    pub count: u32,
    #[serde(default)]
    pub include_answers: bool,
}

fn default_question_count() -> u32 {
    10
}

impl Default for GenerationOptions {
    fn default() -> Self {
        GenerationOptions {
            mode: GenerationMode::default(),
            count: default_question_count(),
            include_answers: false,
        }
    }
}

/// Payload of a `generate_questions` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateQuestions {
    pub resume_text: String,
    pub job_description: String,
    #[serde(default)]
    pub options: GenerationOptions,
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keepalive probe; answered with `pong`.
    Ping,

    /// Ask the server to generate questions; progress arrives as pushes.
    GenerateQuestions(GenerateQuestions),

    /// Persist an answer; confirmed by `answer_saved`.
    SaveAnswer { question_id: String, answer: String },

    /// Ask for a suggested answer; delivered as `answer_generated`.
    GenerateAnswer {
        question: String,
        resume_text: String,
    },
}

impl ClientMessage {
    /// Creates a Ping message.
    pub fn ping() -> Self {
        ClientMessage::Ping
    }

    /// Creates a GenerateQuestions message.
    pub fn generate_questions(request: GenerateQuestions) -> Self {
        ClientMessage::GenerateQuestions(request)
    }

    /// Creates a SaveAnswer message.
    pub fn save_answer(question_id: impl Into<String>, answer: impl Into<String>) -> Self {
        ClientMessage::SaveAnswer {
            question_id: question_id.into(),
            answer: answer.into(),
        }
    }

    /// Creates a GenerateAnswer message.
    pub fn generate_answer(question: impl Into<String>, resume_text: impl Into<String>) -> Self {
        ClientMessage::GenerateAnswer {
            question: question.into(),
            resume_text: resume_text.into(),
        }
    }

    /// The wire `type` of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Ping => "ping",
            ClientMessage::GenerateQuestions(_) => "generate_questions",
            ClientMessage::SaveAnswer { .. } => "save_answer",
            ClientMessage::GenerateAnswer { .. } => "generate_answer",
        }
    }

    /// Encodes the message as a wire frame stamped with the current time.
    pub fn encode(&self) -> Result<String, ParseError> {
        self.encode_at(Utc::now())
    }

    /// Encodes the message with an explicit timestamp (milliseconds since epoch).
    pub fn encode_at(&self, at: DateTime<Utc>) -> Result<String, ParseError> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.insert("timestamp".into(), Value::from(at.timestamp_millis()));
        }
        Ok(serde_json::to_string(&value)?)
    }

    /// Deserializes the message from JSON. Used by servers and tests.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Stage report for a long-running server task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: String,
    #[serde(default)]
    pub message: String,
    /// Percentage, 0 to 100.
    pub progress: f64,
}

/// A question as produced by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// ISO-8601, with or without an offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl GeneratedQuestion {
    /// Converts into a session item, using `fallback` when `created_at` is
    /// missing or unreadable. Offset-less timestamps are taken as UTC.
    pub fn into_item(self, fallback: DateTime<Utc>) -> SessionItem {
        let created_at = self
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(fallback);
        SessionItem {
            id: self.id,
            question: self.question,
            answer: self.answer,
            category: self.category,
            difficulty: self.difficulty,
            created_at,
        }
    }
}

/// Payload of `questions_generated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionsGenerated {
    pub questions: Vec<GeneratedQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// Payload of `answer_saved`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSaved {
    pub question_id: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<f64>,
}

/// Payload of `answer_generated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerGenerated {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<f64>,
}

/// Payload of a server-side `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Handshake carrying the server-assigned connection id.
    Connection { connection_id: Option<String> },
    ProgressUpdate(ProgressUpdate),
    QuestionsGenerated(QuestionsGenerated),
    AnswerSaved(AnswerSaved),
    AnswerGenerated(AnswerGenerated),
    Error(ServerError),
    /// Keepalive acknowledgment.
    Pong,
    /// Any kind this client does not know about.
    Other { kind: String, data: Option<Value> },
}

impl ServerMessage {
    /// Creates a Connection message.
    pub fn connection(connection_id: impl Into<String>) -> Self {
        ServerMessage::Connection {
            connection_id: Some(connection_id.into()),
        }
    }

    /// Creates a ProgressUpdate message.
    pub fn progress(stage: impl Into<String>, message: impl Into<String>, progress: f64) -> Self {
        ServerMessage::ProgressUpdate(ProgressUpdate {
            stage: stage.into(),
            message: message.into(),
            progress,
        })
    }

    /// Creates an Error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError {
            message: message.into(),
            error_type: None,
        })
    }

    /// Creates a Pong message.
    pub fn pong() -> Self {
        ServerMessage::Pong
    }

    /// The wire `type` of this message.
    pub fn kind(&self) -> &str {
        match self {
            ServerMessage::Connection { .. } => "connection",
            ServerMessage::ProgressUpdate(_) => "progress_update",
            ServerMessage::QuestionsGenerated(_) => "questions_generated",
            ServerMessage::AnswerSaved(_) => "answer_saved",
            ServerMessage::AnswerGenerated(_) => "answer_generated",
            ServerMessage::Error(_) => "error",
            ServerMessage::Pong => "pong",
            ServerMessage::Other { kind, .. } => kind,
        }
    }

    /// Validates an envelope's payload against its kind.
    pub fn from_envelope(envelope: Envelope) -> Result<Self, ParseError> {
        let Envelope {
            kind, data, extra, ..
        } = envelope;

        let message = match kind.as_str() {
            "connection" => {
                let connection_id = data
                    .as_ref()
                    .and_then(|d| d.get("connection_id"))
                    .or_else(|| extra.get("connection_id"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                ServerMessage::Connection { connection_id }
            }
            "progress_update" => ServerMessage::ProgressUpdate(payload(&kind, data)?),
            "questions_generated" => ServerMessage::QuestionsGenerated(payload(&kind, data)?),
            "answer_saved" => ServerMessage::AnswerSaved(payload(&kind, data)?),
            "answer_generated" => ServerMessage::AnswerGenerated(payload(&kind, data)?),
            "error" => ServerMessage::Error(payload(&kind, data)?),
            "pong" => ServerMessage::Pong,
            _ => ServerMessage::Other { kind, data },
        };
        Ok(message)
    }

    /// Builds the wire envelope for this message.
    pub fn to_envelope(&self) -> Result<Envelope, serde_json::Error> {
        let data = match self {
            ServerMessage::Connection { connection_id } => {
                Some(serde_json::json!({ "connection_id": connection_id }))
            }
            ServerMessage::ProgressUpdate(p) => Some(serde_json::to_value(p)?),
            ServerMessage::QuestionsGenerated(q) => Some(serde_json::to_value(q)?),
            ServerMessage::AnswerSaved(a) => Some(serde_json::to_value(a)?),
            ServerMessage::AnswerGenerated(a) => Some(serde_json::to_value(a)?),
            ServerMessage::Error(e) => Some(serde_json::to_value(e)?),
            ServerMessage::Pong => None,
            ServerMessage::Other { data, .. } => data.clone(),
        };
        Ok(Envelope::new(self.kind(), data))
    }

    /// Serializes the message to JSON. Used by servers and tests.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        self.to_envelope()?.to_json()
    }
}

fn payload<T: DeserializeOwned>(kind: &str, data: Option<Value>) -> Result<T, ParseError> {
    let data = data.unwrap_or_else(|| Value::Object(Map::new()));
    serde_json::from_value(data).map_err(|source| ParseError::Payload {
        kind: kind.to_string(),
        source,
    })
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub message: ServerMessage,
    pub timestamp: Option<f64>,
}

/// Decodes one inbound wire frame.
pub fn decode(text: &str) -> Result<Inbound, ParseError> {
    let envelope = Envelope::parse(text)?;
    let timestamp = envelope.timestamp;
    let message = ServerMessage::from_envelope(envelope)?;
    Ok(Inbound { message, timestamp })
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
