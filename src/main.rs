//! Binary entrypoint for the `codemapper` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // Cassettes are selected in commands::dispatch via CODEMAPPER_RECORD / CODEMAPPER_REPLAY.
    match codemapper::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
