// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use prep_core::protocol::{GeneratedQuestion, ProgressUpdate};
use prep_core::{Session, SessionItem};

use crate::cache::SessionEvent;

/// Maximum line width for wrapped answers (excluding indent).
const WRAP_WIDTH: usize = 96;

/// One-line session summary: `id  [type] status  answered/total  title`.
pub fn session_line(session: &Session) -> String {
    format!(
        "{}  [{}] {}  {}/{}  {}",
        session.id,
        session.session_type,
        session.status,
        session.answered_count(),
        session.items.len(),
        session.title
    )
}

/// Numbered question line with category and difficulty.
pub fn item_line(index: usize, item: &SessionItem) -> String {
    format!(
        "{}. [{}/{}] {}",
        index + 1,
        item.category,
        item.difficulty,
        item.question
    )
}

/// Same as [`item_line`], for questions straight off the push channel.
pub fn question_line(index: usize, question: &GeneratedQuestion) -> String {
    format!(
        "{}. [{}/{}] {}",
        index + 1,
        question.category,
        question.difficulty,
        question.question
    )
}

/// Progress as `[ 40%] stage: message`.
pub fn progress_line(update: &ProgressUpdate) -> String {
    let pct = update.progress.clamp(0.0, 100.0).round() as u32;
    if update.message.is_empty() {
        format!("[{:>3}%] {}", pct, update.stage)
    } else {
        format!("[{:>3}%] {}: {}", pct, update.stage, update.message)
    }
}

/// Short description of a cache event.
pub fn event_line(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Created(s) => format!("created {}", s.id),
        SessionEvent::Updated { session, silent } => {
            if *silent {
                format!("saved {}", session.id)
            } else {
                format!("updated {}", session.id)
            }
        }
        SessionEvent::Deleted(id) => format!("deleted {}", id),
        SessionEvent::BatchUpdated(sessions) => format!("updated {} sessions", sessions.len()),
    }
}

/// Wrap text at word boundaries, indenting every line.
pub fn wrap_indented(content: &str, indent: &str) -> String {
    let mut lines = Vec::new();
    for paragraph in content.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.len() + 1 + word.len() > WRAP_WIDTH {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
        .iter()
        .map(|l| format!("{}{}", indent, l))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
