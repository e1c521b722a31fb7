// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use prep_core::protocol::GenerationMode;
use prep_core::{SessionStatus, SessionType};

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

const QUICKSTART_HELP: &str = "\
Get started:
  prepsync config                         Show the resolved configuration
  prepsync listen                         Print push events until Ctrl-C
  prepsync generate --resume cv.txt       Generate interview questions
  prepsync sessions list                  List saved sessions";

#[derive(Parser)]
#[command(name = "prepsync", version)]
#[command(about = "Realtime client for the interview-prep backend")]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/prepsync/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the resolved configuration as TOML
    Config,

    /// Connect to the push channel and print every event until Ctrl-C
    #[command(after_help = "Examples:\n  \
        prepsync listen                      Listen without a session\n  \
        prepsync listen --session-id s-42    Correlate with a server session")]
    Listen {
        /// Session to correlate the connection with
        #[arg(long)]
        session_id: Option<String>,
    },

    /// Generate interview questions from a resume and job description
    Generate(GenerateArgs),

    /// Manage saved sessions through the backend API
    #[command(subcommand)]
    Sessions(SessionsCommand),
}

#[derive(Args, Debug, Clone)]
#[command(after_help = "Examples:\n  \
    prepsync generate --resume cv.txt --job jd.txt\n  \
    prepsync generate --resume cv.txt --mode resume --count 5 --answers")]
pub struct GenerateArgs {
    /// Resume text file
    #[arg(long, value_name = "FILE")]
    pub resume: PathBuf,

    /// Job description text file
    #[arg(long, value_name = "FILE")]
    pub job: Option<PathBuf>,

    /// Number of questions to ask for
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=50))]
    pub count: u32,

    /// What to base the questions on: resume, jd, or combined
    #[arg(long, default_value = "combined")]
    pub mode: GenerationMode,

    /// Ask the generator for suggested answers too
    #[arg(long)]
    pub answers: bool,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 300, value_name = "SECS")]
    pub timeout: u64,

    /// Output format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Subcommand)]
pub enum SessionsCommand {
    /// List sessions, most recent first
    List {
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Show one session with its questions
    Show {
        id: String,
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Create an empty session
    Create {
        /// Session type: resume or job_description (jd)
        #[arg(long = "type", default_value = "resume")]
        session_type: SessionType,

        /// Session title
        #[arg(long)]
        title: String,
    },

    /// Rename a session
    Rename { id: String, title: String },

    /// Set a session's status: New, InProgress or Completed
    Status { id: String, status: SessionStatus },

    /// Save an answer to one question (background save; failures are logged)
    Answer {
        id: String,
        /// Question (item) id
        item: String,
        text: String,
    },

    /// Move a question to a new position (0-based)
    Reorder { id: String, from: usize, to: usize },

    /// Delete a session
    Delete { id: String },
}
