// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use prep_core::protocol::{GenerateQuestions, GenerationMode, GenerationOptions, QuestionsGenerated};
use tokio::sync::mpsc;
use tracing::info;

use super::read_text;
use crate::cli::{GenerateArgs, OutputFormat};
use crate::display;
use crate::error::{Error, Result};
use crate::sync::{ConnectionManager, ConnectionStatus, Transport};

enum Progress {
    Opened,
    Closed,
    LinkError { message: String, retryable: bool },
    Failed(String),
    Done(QuestionsGenerated),
}

/// Generate questions over the push channel and print them.
pub async fn run<T: Transport>(conn: &ConnectionManager<T>, args: &GenerateArgs) -> Result<()> {
    let request = build_request(args)?;
    let outcome = request_questions(conn, request, Duration::from_secs(args.timeout)).await;
    conn.disconnect();
    let batch = outcome?;

    match args.output {
        OutputFormat::Text => {
            if batch.questions.is_empty() {
                println!("No questions generated.");
            }
            for (i, question) in batch.questions.iter().enumerate() {
                println!("{}", display::question_line(i, question));
                if let Some(answer) = &question.answer {
                    println!("{}", display::wrap_indented(answer, "   "));
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&batch.questions)?);
        }
    }
    Ok(())
}

/// Reads the input files and checks them against the mode.
pub fn build_request(args: &GenerateArgs) -> Result<GenerateQuestions> {
    let resume_text = read_text(&args.resume, "resume")?;
    let job_description = match &args.job {
        Some(path) => read_text(path, "job description")?,
        None if args.mode == GenerationMode::Resume => String::new(),
        None => {
            return Err(Error::RequiredFor {
                context: "--job",
                operation: "jd and combined modes",
            })
        }
    };

    Ok(GenerateQuestions {
        resume_text,
        job_description,
        options: GenerationOptions {
            mode: args.mode,
            count: args.count,
            include_answers: args.answers,
        },
    })
}

/// Connects, sends the request once the link is open and waits for the result.
///
/// Fails on a server error, once reconnecting has given up, or on timeout.
pub async fn request_questions<T: Transport>(
    conn: &ConnectionManager<T>,
    request: GenerateQuestions,
    timeout: Duration,
) -> Result<QuestionsGenerated> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let events = tx.clone();
    conn.on_open(move || {
        let _ = events.send(Progress::Opened);
    });
    let events = tx.clone();
    conn.on_close(move || {
        let _ = events.send(Progress::Closed);
    });
    let events = tx.clone();
    conn.on_error(move |e| {
        let _ = events.send(Progress::LinkError {
            message: e.to_string(),
            retryable: e.is_retryable(),
        });
    });
    let events = tx.clone();
    conn.on_server_error(move |e| {
        let _ = events.send(Progress::Failed(e.message.clone()));
    });
    let events = tx;
    conn.on_questions_generated(move |batch| {
        let _ = events.send(Progress::Done(batch.clone()));
    });
    conn.on_progress(|update| eprintln!("{}", display::progress_line(update)));

    conn.connect();

    let wait = async {
        let mut sent = false;
        let mut last_error = String::from("connection closed");
        while let Some(event) = rx.recv().await {
            match event {
                Progress::Opened => {
                    if !sent {
                        sent = conn.generate_questions(request.clone());
                        if sent {
                            info!(count = request.options.count, mode = %request.options.mode, "generation requested");
                        }
                    }
                }
                Progress::LinkError { message, retryable } => {
                    last_error = message;
                    // Non-retryable errors are not followed by a close
                    if !retryable {
                        return Err(Error::ConnectFailed {
                            url: conn.config().url.clone(),
                            reason: last_error,
                        });
                    }
                }
                Progress::Closed => {
                    if conn.status() == ConnectionStatus::Disconnected {
                        return Err(Error::ConnectFailed {
                            url: conn.config().url.clone(),
                            reason: last_error,
                        });
                    }
                    // The server drops in-flight work with the link; ask again
                    sent = false;
                }
                Progress::Failed(message) => return Err(Error::Server(message)),
                Progress::Done(batch) => return Ok(batch),
            }
        }
        Err(Error::OperationFailed("receive generated questions"))
    };

    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| Error::Timeout("generated questions"))?
}

#[cfg(test)]
#[path = "generate_tests.rs"]
mod tests;
