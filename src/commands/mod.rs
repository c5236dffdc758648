//! Command dispatch and handlers.

pub mod headless;
pub mod interactive;

use tokio::runtime::Runtime;

use crate::cli::Cli;
use crate::config::ProviderConfig;
use crate::context::ServiceContext;
use crate::run::RunState;
use crate::scan::scan;

/// Scan the target, build the service context and hand over to the selected mode.
///
/// When `CODEMAPPER_RECORD` is set, every generation call is recorded to
/// that cassette file; `CODEMAPPER_REPLAY` answers them from one instead.
///
/// # Errors
///
/// Returns an error string if the target cannot be scanned, the provider
/// configuration is incomplete, or the run does not complete.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let settings = cli.settings();
    let scanned =
        scan(&cli.target, &settings.extensions, &settings.ignore_dirs).map_err(|e| e.to_string())?;
    let state = RunState::from_scan(scanned);

    let ctx = ServiceContext::from_env(ProviderConfig::from_env)?;
    let runtime = runtime()?;

    if cli.interactive {
        interactive::run(&runtime, &ctx, &settings, &cli.target, state)
    } else {
        headless::run(&runtime, &ctx, &settings, &cli.target, state)
    }
}

fn runtime() -> Result<Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))
}
