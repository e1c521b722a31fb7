// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::future::Future;

use prep_core::ServerMessage;

use crate::display;
use crate::error::Result;
use crate::sync::{ConnectionManager, MessageKind, Transport};

/// Print every push event until `shutdown` resolves.
pub async fn run<T: Transport>(
    conn: &ConnectionManager<T>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    conn.on_status_change(|status| eprintln!("status: {}", status));
    conn.on_message(MessageKind::Connection, |msg| {
        if let ServerMessage::Connection { connection_id } = msg {
            println!("connection {}", connection_id.as_deref().unwrap_or("-"));
        }
    });
    conn.on_progress(|update| println!("{}", display::progress_line(update)));
    conn.on_questions_generated(|batch| {
        println!("questions_generated ({})", batch.questions.len());
        for (i, question) in batch.questions.iter().enumerate() {
            println!("{}", display::question_line(i, question));
        }
    });
    conn.on_answer_saved(|saved| println!("answer_saved {}", saved.question_id));
    conn.on_answer_generated(|generated| {
        println!("answer_generated: {}", generated.question);
        println!("{}", display::wrap_indented(&generated.answer, "   "));
    });
    conn.on_server_error(|err| match &err.error_type {
        Some(kind) => println!("error ({}): {}", kind, err.message),
        None => println!("error: {}", err.message),
    });
    conn.on_unknown(|kind, data| match data {
        Some(data) => println!("{} {}", kind, data),
        None => println!("{}", kind),
    });

    conn.connect();
    shutdown.await;
    conn.disconnect();
    Ok(())
}
