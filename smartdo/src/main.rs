//! `smartdo`: describe your tasks in plain language and keep one tidy list.
//!
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/smartdo/config.toml`).
//!
//! ```bash
//! # Merge instructions into the list
//! GEMINI_API_KEY=... cargo run --bin smartdo -- add "dentist friday 3pm, report done"
//!
//! # Show the board
//! cargo run --bin smartdo -- list
//!
//! # Drag a task into today, above another one
//! cargo run --bin smartdo -- move <id> --to today --onto <other-id>
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Local, Utc};
use clap::Parser;
use smartdo_proto::task::TaskId;
use tracing_appender::non_blocking::WorkerGuard;

use smartdo::app::{App, Notice};
use smartdo::config::{AppConfig, CliArgs, Command};
use smartdo::parser::{GeminiParser, HELPER_PROMPT, ParseError};
use smartdo::store::JsonFileStore;
use smartdo::tasks::{Bucket, TaskError, TaskManager};
use smartdo::view::render_board;

/// Errors that stop the CLI before any command runs.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("failed to load tasks: {0}")]
    Load(#[from] TaskError),
    #[error("failed to set up parser: {0}")]
    Parser(#[from] ParseError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let command = cli.command.clone().unwrap_or(Command::List);
    if command == Command::Prompt {
        println!("{HELPER_PROMPT}");
        return ExitCode::SUCCESS;
    }

    let config = match AppConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(data_dir = %config.data_dir.display(), "smartdo starting");
    match run(command, &config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Logs are written to a file so stdout only carries command output.
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("smartdo.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_env("SMARTDO_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run(command: Command, config: &AppConfig) -> Result<ExitCode, StartupError> {
    let store = JsonFileStore::new(config.data_dir.clone());
    let manager = TaskManager::load(store, config.store_key.as_str())?;
    let parser = GeminiParser::new(&config.parser)?;
    let has_key = parser.has_api_key();
    let mut app = App::new(manager, parser);

    let notice = match command {
        Command::Add { text } => {
            if !has_key {
                eprintln!("error: {}", ParseError::MissingApiKey);
                return Ok(ExitCode::FAILURE);
            }
            let Some(notice) = app.submit(&text.join(" "), Utc::now()).await else {
                eprintln!("nothing to submit");
                return Ok(ExitCode::FAILURE);
            };
            if !notice.is_error() {
                println!("{}\n", render_board(app.manager().tasks(), &Local::now(), config.completed_cap));
            }
            notice
        }
        Command::List | Command::Prompt => {
            println!("{}", render_board(app.manager().tasks(), &Local::now(), config.completed_cap));
            return Ok(ExitCode::SUCCESS);
        }
        Command::Done { id } => app.toggle_complete(&TaskId::from(id)),
        Command::Subtask {
            task_id,
            subtask_id,
        } => app.toggle_subtask(&TaskId::from(task_id), &TaskId::from(subtask_id)),
        Command::Delete { id } => app.delete_task(&TaskId::from(id)),
        Command::Move { id, to, onto } => match to.parse::<Bucket>() {
            Ok(bucket) => {
                let onto = onto.map(TaskId::from);
                app.move_task(&TaskId::from(id), bucket, onto.as_ref(), &Local::now())
            }
            Err(e) => Notice::error(e),
        },
        Command::Export { dir } => {
            let dir = dir.unwrap_or_else(|| PathBuf::from("."));
            app.export_to(&dir, Local::now().date_naive())
        }
        Command::Import { path } => app.import_from(&path),
        Command::Clear => app.clear(),
    };

    Ok(report(&notice))
}

fn report(notice: &Notice) -> ExitCode {
    if notice.is_error() {
        eprintln!("{notice}");
        ExitCode::FAILURE
    } else {
        println!("{notice}");
        ExitCode::SUCCESS
    }
}
