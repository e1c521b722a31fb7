// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use prep_core::{AnswerMap, NewSession, Session, SessionPatch};

use crate::cache::{SessionApi, SessionCache};
use crate::cli::{OutputFormat, SessionsCommand};
use crate::display;
use crate::error::{Error, Result};

pub async fn run<A: SessionApi>(cache: &SessionCache<A>, cmd: SessionsCommand) -> Result<()> {
    if cache.user().is_none() {
        return Err(Error::RequiredFor {
            context: "user (set `user` in the config file)",
            operation: "sessions",
        });
    }

    let subscription = cache
        .bus()
        .subscribe(|event| eprintln!("{}", display::event_line(event)));
    let result = execute(cache, cmd).await;
    cache.bus().unsubscribe(subscription);
    result
}

async fn execute<A: SessionApi>(cache: &SessionCache<A>, cmd: SessionsCommand) -> Result<()> {
    match cmd {
        SessionsCommand::List { output } => {
            let sessions = cache.try_load_sessions().await?;
            match output {
                OutputFormat::Text => {
                    if sessions.is_empty() {
                        println!("No sessions.");
                    }
                    for session in &sessions {
                        println!("{}", display::session_line(session));
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sessions)?),
            }
        }

        SessionsCommand::Show { id, output } => {
            let session = load_one(cache, &id).await?;
            match output {
                OutputFormat::Text => print_session(&session),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&session)?),
            }
        }

        SessionsCommand::Create {
            session_type,
            title,
        } => {
            if title.trim().is_empty() {
                return Err(Error::FieldEmpty { field: "title" });
            }
            let data = NewSession {
                session_type,
                title,
                items: Vec::new(),
            };
            let session = cache
                .create_session(&data)
                .await
                .ok_or(Error::OperationFailed("create session"))?;
            println!("{}", session.id);
        }

        SessionsCommand::Rename { id, title } => {
            if title.trim().is_empty() {
                return Err(Error::FieldEmpty { field: "title" });
            }
            let patch = SessionPatch {
                title: Some(title),
                ..SessionPatch::default()
            };
            cache
                .update_session(&id, &patch)
                .await
                .ok_or(Error::OperationFailed("rename session"))?;
        }

        SessionsCommand::Status { id, status } => {
            let patch = SessionPatch {
                status: Some(status),
                ..SessionPatch::default()
            };
            cache
                .update_session(&id, &patch)
                .await
                .ok_or(Error::OperationFailed("update session status"))?;
        }

        SessionsCommand::Answer { id, item, text } => {
            let session = load_one(cache, &id).await?;
            if !session.items.iter().any(|i| i.id == item) {
                return Err(Error::ItemNotFound { session: id, item });
            }
            let mut answers = AnswerMap::new();
            answers.insert(item, text);
            cache
                .update_session_answers(&id, &answers)
                .await
                .ok_or(Error::OperationFailed("save answer"))?;
        }

        SessionsCommand::Reorder { id, from, to } => {
            let session = load_one(cache, &id).await?;
            if from >= session.items.len() || to >= session.items.len() {
                return Err(Error::InvalidSetting {
                    field: "position",
                    reason: format!(
                        "session {} has {} questions (positions are 0-based)",
                        id,
                        session.items.len()
                    ),
                });
            }
            cache
                .reorder_items(&id, from, to)
                .await
                .ok_or(Error::OperationFailed("reorder questions"))?;
        }

        SessionsCommand::Delete { id } => {
            load_one(cache, &id).await?;
            if !cache.delete_session(&id).await {
                return Err(Error::OperationFailed("delete session"));
            }
        }
    }
    Ok(())
}

/// Refreshes the cache and returns the named session.
async fn load_one<A: SessionApi>(cache: &SessionCache<A>, id: &str) -> Result<Session> {
    cache.try_load_sessions().await?;
    cache
        .get_cached_session(id)
        .ok_or_else(|| Error::SessionNotFound(id.to_string()))
}

fn print_session(session: &Session) {
    println!("{}", display::session_line(session));
    println!("created {}", session.created_at.format("%Y-%m-%d %H:%M UTC"));
    for (i, item) in session.items.iter().enumerate() {
        println!();
        println!("{}", display::item_line(i, item));
        if let Some(answer) = &item.answer {
            println!("{}", display::wrap_indented(answer, "   "));
        }
    }
}
