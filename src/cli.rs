//! CLI argument definitions.

use std::path::PathBuf;

use clap::Parser;

use crate::batch::BatchLimits;
use crate::config::RunSettings;

/// Top-level CLI parser for `codemapper`.
#[derive(Debug, Parser)]
#[command(
    name = "codemapper",
    version,
    about = "Derive C4 architecture diagrams for a codebase, one batch of files at a time"
)]
pub struct Cli {
    /// Project directory to analyse.
    pub target: PathBuf,

    /// Directory receiving diagram.mmd and codemapper_state.json.
    #[arg(short, long, env = "CODEMAPPER_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Maximum number of files per generation call.
    #[arg(long, default_value_t = 8)]
    pub max_files: usize,

    /// Maximum combined size of a multi-file batch, in bytes.
    #[arg(long, default_value_t = 60_000)]
    pub max_batch_bytes: u64,

    /// Files larger than this many bytes are skipped.
    #[arg(long, default_value_t = 100_000)]
    pub max_file_bytes: u64,

    /// Per-file character limit in prompts.
    #[arg(long, default_value_t = 20_000)]
    pub max_file_chars: usize,

    /// Extensions to include, replacing the built-in list (comma separated, no dots).
    #[arg(long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Extra directory names to ignore (comma separated).
    #[arg(long = "ignore", value_delimiter = ',')]
    pub ignore_dirs: Vec<String>,

    /// Start a command console on stdin instead of running to completion.
    #[arg(short, long)]
    pub interactive: bool,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Run settings derived from the flags.
    #[must_use]
    pub fn settings(&self) -> RunSettings {
        let mut settings = RunSettings {
            limits: BatchLimits {
                max_files_per_batch: self.max_files,
                max_batch_bytes: self.max_batch_bytes,
                max_single_file_bytes: self.max_file_bytes,
            },
            max_file_chars: self.max_file_chars,
            output_dir: self.output_dir.clone(),
            ..RunSettings::default()
        };
        if !self.extensions.is_empty() {
            settings.extensions =
                self.extensions.iter().map(|e| e.trim_start_matches('.').to_string()).collect();
        }
        settings.ignore_dirs.extend(self.ignore_dirs.iter().cloned());
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn defaults_match_run_settings() {
        let cli = Cli::parse_from(["codemapper", "./shop"]);
        let settings = cli.settings();

        assert_eq!(cli.target.to_str(), Some("./shop"));
        assert!(!cli.interactive);
        assert_eq!(settings.limits, crate::batch::BatchLimits::default());
        assert_eq!(settings.max_file_chars, 20_000);
    }

    #[test]
    fn flags_override_limits_and_lists() {
        let cli = Cli::parse_from([
            "codemapper",
            "proj",
            "--max-files",
            "3",
            "--ext",
            ".go,rs",
            "--ignore",
            "fixtures",
            "-o",
            "out",
            "-i",
        ]);
        let settings = cli.settings();

        assert_eq!(settings.limits.max_files_per_batch, 3);
        assert_eq!(settings.extensions, vec!["go", "rs"]);
        assert!(settings.ignore_dirs.iter().any(|d| d == "fixtures"));
        assert!(settings.ignore_dirs.iter().any(|d| d == "node_modules"));
        assert_eq!(settings.output_dir.to_str(), Some("out"));
        assert!(cli.interactive);
    }

    #[test]
    fn target_is_required() {
        assert!(Cli::try_parse_from(["codemapper"]).is_err());
    }
}
