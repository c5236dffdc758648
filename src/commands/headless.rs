//! Headless mode: run to completion, Ctrl-C pauses.
//!
//! The first Ctrl-C lets the batch in flight finish, saves progress and
//! exits with a resume hint. A second Ctrl-C exits at once with status 130;
//! the last successful batch is already on disk.

use std::future::Future;
use std::path::Path;

use tokio::runtime::Runtime;
use tracing::warn;

use crate::config::RunSettings;
use crate::context::ServiceContext;
use crate::run::{PauseToken, RunOutcome, RunState, Runner};
use crate::snapshot::{DIAGRAM_FILE, STATE_FILE};

/// How the interrupt watcher stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupts {
    /// The signal source failed before a second interrupt arrived.
    Unavailable,
    Twice,
}

/// Pause on the first interrupt from `next`, then wait for a second one.
async fn watch_interrupts<S, F>(mut next: S, pause: PauseToken) -> Interrupts
where
    S: FnMut() -> F,
    F: Future<Output = std::io::Result<()>>,
{
    if next().await.is_err() {
        return Interrupts::Unavailable;
    }
    warn!("interrupt received; pausing after the current batch (Ctrl-C again to exit now)");
    pause.pause();
    match next().await {
        Ok(()) => Interrupts::Twice,
        Err(_) => Interrupts::Unavailable,
    }
}

/// Execute a headless run over an already scanned project.
///
/// Ctrl-C requests a pause: the batch in flight finishes, progress is
/// saved and the command fails with a resume hint. A second Ctrl-C exits
/// the process immediately.
///
/// # Errors
///
/// Returns an error string if the run was paused or stopped on a failed batch.
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

    let outcome = runtime.block_on(async {
        let interrupt = tokio::spawn(async move {
            if watch_interrupts(tokio::signal::ctrl_c, pause).await == Interrupts::Twice {
                warn!("second interrupt; exiting");
                std::process::exit(130);
            }
        });
        let outcome = runner.run(&mut state).await;
        interrupt.abort();
        outcome
    });

    let summary = state.summary();
    match outcome {
        RunOutcome::Completed => {
            println!("{summary}");
            println!(
                "Wrote {} and {}",
                settings.output_dir.join(DIAGRAM_FILE).display(),
                settings.output_dir.join(STATE_FILE).display()
            );
            Ok(())
        }
        RunOutcome::Paused => Err(format!("paused with {summary}; run again to resume")),
        RunOutcome::Failed(message) => {
            Err(format!("batch failed: {message}\n{summary}; run again to retry the failed files"))
        }
    }
}
