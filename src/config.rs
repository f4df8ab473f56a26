//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.fieldeval.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".fieldeval.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Number of result files read concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> String {
    "evaluation_report.json".to_string()
}

fn default_concurrency() -> usize {
    8
}

/// Result-file scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum number of result files to read.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// File extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory or file names to exclude. Hidden entries are always skipped.
    #[serde(default)]
    pub excludes: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            extensions: default_extensions(),
            excludes: Vec::new(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_files() -> usize {
    10_000
}

fn default_extensions() -> Vec<String> {
    vec!["json".to_string()]
}

fn default_max_file_size() -> usize {
    16 * 1024 * 1024 // 16MB
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of lowest-F1 fields listed in the Markdown summary.
    #[serde(default = "default_worst_fields")]
    pub worst_fields: usize,

    /// Include the diagnostics section in the Markdown summary.
    #[serde(default = "default_true")]
    pub include_errors: bool,

    /// Decimal places for ratios in the Markdown summary.
    #[serde(default = "default_decimals")]
    pub decimals: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            worst_fields: default_worst_fields(),
            include_errors: true,
            decimals: default_decimals(),
        }
    }
}

fn default_worst_fields() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_decimals() -> usize {
    3
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings when given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }

        if let Some(max_files) = args.max_files {
            self.scanner.max_files = max_files;
        }
        if let Some(ref excludes) = args.exclude {
            self.scanner.excludes = excludes.clone();
        }

        if let Some(worst) = args.worst {
            self.report.worst_fields = worst;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.scanner.extensions, vec!["json"]);
        assert!(config.scanner.excludes.is_empty());
        assert_eq!(config.report.worst_fields, 10);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom.md"
format = "markdown"
concurrency = 2

[scanner]
max_files = 50
excludes = ["archive"]

[report]
decimals = 4
include_errors = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "custom.md");
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert_eq!(config.general.concurrency, 2);
        assert_eq!(config.scanner.max_files, 50);
        assert_eq!(config.scanner.excludes, vec!["archive"]);
        assert_eq!(config.scanner.extensions, vec!["json"]);
        assert_eq!(config.report.decimals, 4);
        assert!(!config.report.include_errors);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[scanner]"));
        assert!(toml_str.contains("[report]"));

        let round: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(round.general.concurrency, default_concurrency());
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[report]\nworst_fields = 3\n",
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.report.worst_fields, 3);
        assert!(config.scanner.excludes.is_empty());
    }
}
