//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// fieldeval - corpus-wide extraction accuracy from per-document results
///
/// Reads per-document confusion matrices (one JSON file per document),
/// sums them, and reports precision, recall, F1 and accuracy overall and
/// per extraction field.
///
/// Examples:
///   fieldeval --input ./results
///   fieldeval --input ./results --format markdown --output summary.md
///   fieldeval --input ./results --fail-below 0.9
///   fieldeval --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory containing per-document result files
    #[arg(short, long, value_name = "DIR", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Output file path for the report
    ///
    /// Defaults to the config value (evaluation_report.json).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (json, markdown)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .fieldeval.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Number of result files read concurrently
    #[arg(long, value_name = "NUM", env = "FIELDEVAL_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Maximum number of result files to read
    #[arg(long, value_name = "COUNT")]
    pub max_files: Option<usize>,

    /// Names to exclude while scanning (comma-separated)
    ///
    /// Example: --exclude "archive,tmp"
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Number of lowest-F1 fields to list in the summary
    #[arg(long, value_name = "COUNT")]
    pub worst: Option<usize>,

    /// Fail if overall F1 is below this threshold (0.0 - 1.0)
    ///
    /// Useful for CI pipelines. Exit code 2 when the threshold is missed.
    #[arg(long, value_name = "F1")]
    pub fail_below: Option<f64>,

    /// Generate a default .fieldeval.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// Markdown format
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match self.input {
            Some(ref input) => {
                if !input.exists() {
                    return Err(format!(
                        "Input directory does not exist: {}",
                        input.display()
                    ));
                }
                if !input.is_dir() {
                    return Err(format!(
                        "Input path is not a directory: {}",
                        input.display()
                    ));
                }
            }
            None => return Err("An input directory is required".to_string()),
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.max_files == Some(0) {
            return Err("Max files must be at least 1".to_string());
        }

        if let Some(threshold) = self.fail_below {
            if !(0.0..=1.0).contains(&threshold) {
                return Err("F1 threshold must be between 0.0 and 1.0".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(input: PathBuf) -> Args {
        Args {
            input: Some(input),
            output: None,
            format: None,
            config: None,
            verbose: false,
            quiet: false,
            concurrency: None,
            max_files: None,
            exclude: None,
            worst: None,
            fail_below: None,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(make_args(dir.path().to_path_buf()).validate().is_ok());
    }

    #[test]
    fn test_validation_missing_input() {
        let args = make_args(PathBuf::from("/definitely/not/here"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_threshold_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = make_args(dir.path().to_path_buf());
        args.fail_below = Some(1.5);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = make_args(dir.path().to_path_buf());
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args(PathBuf::from("/nope"));
        args.input = None;
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = make_args(dir.path().to_path_buf());
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "fieldeval",
            "--input",
            "results",
            "--format",
            "markdown",
            "--exclude",
            "a,b",
        ])
        .unwrap();
        assert_eq!(args.format, Some(OutputFormat::Markdown));
        assert_eq!(args.exclude, Some(vec!["a".to_string(), "b".to_string()]));
    }
}
