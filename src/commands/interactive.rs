//! Interactive mode: a line-oriented command console on stdin.
//!
//! A reader thread parses lines into [`Command`]s. `pause` is applied to the
//! pause token right away, so it reaches a run in flight; every other command
//! is queued and handled by the console loop once the run has stopped.

use std::io::BufRead;
use std::path::Path;

use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::debug;

use crate::config::RunSettings;
use crate::context::ServiceContext;
use crate::run::{PauseToken, RunState, Runner};

const HELP: &str = "\
Commands:
  run, resume      start or continue processing
  pause            stop after the batch in flight
  status           show progress
  failed           list failed files
  retry <path>     mark one failed file for another attempt
  retry-failed     mark every failed file for another attempt
  help             show this text
  quit             exit";

/// A console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start or resume the run loop.
    Run,
    /// Request a cooperative pause.
    Pause,
    /// Print the status summary.
    Status,
    /// List failed files with their errors.
    Failed,
    /// Retry one failed file by path.
    Retry(String),
    /// Retry every failed file.
    RetryFailed,
    /// Print the command list.
    Help,
    /// Leave the console.
    Quit,
    /// Anything unrecognised, kept for the error message.
    Unknown(String),
}

impl Command {
    /// Parses one input line; blank lines yield `None`.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let command = match word {
            "" => return None,
            "run" | "resume" | "start" => Self::Run,
            "pause" | "stop" => Self::Pause,
            "status" => Self::Status,
            "failed" => Self::Failed,
            "retry" if !rest.is_empty() => Self::Retry(rest.to_string()),
            "retry-failed" | "retry-all" => Self::RetryFailed,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        };
        Some(command)
    }
}

/// Execute the interactive console over an already scanned project.
///
/// Stdin reaching EOF behaves like `quit`.
///
/// # Errors
///
/// Currently infallible; the signature matches the other modes.
pub fn run(
    runtime: &Runtime,
    ctx: &ServiceContext,
    settings: &RunSettings,
    root: &Path,
    mut state: RunState,
) -> Result<(), String> {
    let pause = PauseToken::new();
    let runner = Runner::new(ctx, settings, root, &state, pause.clone());
    runner.restore(&mut state);

    println!("codemapper: {} ({} files)", runner.project_name(), state.files().len());
    println!("{HELP}");
    print_status(&state);

    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_reader(pause.clone(), tx);

    runtime.block_on(async {
        while let Some(command) = rx.recv().await {
            debug!(?command, "console command");
            match command {
                Command::Run => {
                    pause.resume();
                    println!("Running. Type `pause` to stop after the current batch.");
                    let outcome = runner.run(&mut state).await;
                    println!("Run {outcome}.");
                    print_status(&state);
                }
                // Applied by the reader thread.
                Command::Pause => {}
                Command::Status => print_status(&state),
                Command::Failed => print_failed(&state),
                Command::Retry(path) => match state.retry_path(&path) {
                    Ok(()) => println!("{path} queued for retry. Type `run` to process it."),
                    Err(e) => println!("{e}"),
                },
                Command::RetryFailed => {
                    let count = state.retry_all_failed();
                    println!("{count} failed files queued for retry.");
                }
                Command::Help => println!("{HELP}"),
                Command::Quit => break,
                Command::Unknown(line) => println!("Unknown command `{line}`. Type `help`."),
            }
        }
    });
    Ok(())
}

/// Reads stdin on a plain thread, outside the runtime.
fn spawn_reader(pause: PauseToken, tx: UnboundedSender<Command>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let Some(command) = Command::parse(&line) else { continue };
            if command == Command::Pause {
                pause.pause();
                println!("Pause requested.");
            }
            if tx.send(command).is_err() {
                return;
            }
        }
        let _ = tx.send(Command::Quit);
    });
}

fn print_status(state: &RunState) {
    let summary = state.summary();
    println!(
        "{summary}; cursor {}/{}; {} diagrams",
        state.cursor(),
        state.files().len(),
        state.diagrams().len()
    );
}

fn print_failed(state: &RunState) {
    let rows: Vec<(&str, &str)> = state
        .failed()
        .map(|(_, f)| (f.path.as_str(), f.error.as_deref().unwrap_or("")))
        .collect();
    if rows.is_empty() {
        println!("No failed files.");
        return;
    }

    let path_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(4).max(4);
    println!("{:<path_width$}  ERROR", "PATH");
    println!("{:-<path_width$}  -----", "");
    for (path, error) in rows {
        println!("{path:<path_width$}  {error}");
    }
}
