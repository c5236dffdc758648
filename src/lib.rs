//! Core library entry for the `codemapper` CLI.
//!
//! `codemapper` walks a source tree and asks a language model for C4
//! diagrams in Mermaid syntax, a few files at a time. Every batch refines an
//! Overview diagram plus one diagram per directory, and progress is saved
//! after each batch so an interrupted run resumes where it stopped.

pub mod adapters;
pub mod batch;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod diagram;
pub mod error;
pub mod generate;
pub mod logging;
pub mod ports;
pub mod run;
pub mod scan;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// A `.env` file in the working directory is loaded first.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or the run does not complete.
pub fn run<I, T>(args: I) -> std::result::Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    // A missing .env is the common case.
    let _ = dotenvy::dotenv();
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    logging::init(cli.verbose, cli.json_log);
    commands::dispatch(&cli)
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_errors_without_target() {
        assert!(run(["codemapper"]).is_err());
    }

    #[test]
    fn run_errors_on_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = run([std::ffi::OsStr::new("codemapper"), missing.as_os_str()]).unwrap_err();
        assert!(err.contains("does not exist"), "{err}");
    }
}
