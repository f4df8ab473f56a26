//! fieldeval - corpus-wide extraction evaluation
//!
//! A CLI tool that reads per-document confusion matrices from a directory,
//! aggregates them, and writes a precision/recall/F1 report.
//!
//! Exit codes:
//!   0 - Success (no threshold set, or overall F1 at or above --fail-below)
//!   1 - Runtime error (bad arguments, unreadable input, write failure)
//!   2 - Overall F1 below the --fail-below threshold

use anyhow::{Context, Result};
use chrono::Utc;
use fieldeval::analysis::Aggregator;
use fieldeval::cli::Args;
use fieldeval::config::{Config, CONFIG_FILE_NAME};
use fieldeval::models::{Diagnostic, ReportMetadata, RunReport};
use fieldeval::report;
use fieldeval::scanner::{self, ResultScanner, ScanConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("fieldeval v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_evaluation(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Evaluation failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .fieldeval.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete evaluation workflow. Returns exit code (0 or 2).
async fn run_evaluation(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let input_dir: PathBuf = args
        .input
        .clone()
        .context("An input directory is required")?;

    // Step 1: Discover result files
    let scan_config = ScanConfig::from(&config.scanner);
    let files = ResultScanner::new(input_dir.clone(), scan_config).scan()?;
    info!(
        "Found {} result files in {}",
        files.len(),
        input_dir.display()
    );

    if files.is_empty() {
        warn!("No result files found; the report will be empty");
    }

    // Step 2: Load concurrently
    let progress = (!args.quiet).then(|| new_progress_bar(files.len() as u64));
    let loaded =
        scanner::load_documents(&files, config.general.concurrency, progress.as_ref()).await;
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    // Step 3: Accumulate with a single writer
    let mut aggregator = Aggregator::new();
    let mut files_failed = 0;

    for (file, result) in loaded {
        match result {
            Ok(document) => {
                aggregator.update(
                    document.confusion_matrix.as_ref(),
                    Some(document.doc_id.as_str()),
                );
            }
            Err(e) => {
                files_failed += 1;
                aggregator.record_error(Diagnostic::new(
                    Some(file.doc_id.as_str()),
                    None,
                    format!("{:#}", e),
                ));
            }
        }
    }

    let evaluation = aggregator.compute();
    let overall_f1 = evaluation.overall.f1;

    let run_report = RunReport {
        metadata: ReportMetadata {
            input_dir: input_dir.display().to_string(),
            generated_at: Utc::now(),
            files_scanned: files.len(),
            files_failed,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        evaluation,
    };

    // Step 4: Render and save
    let output_path = PathBuf::from(&config.general.output);
    let content = report::render_report(&run_report, config.general.format, &config.report)?;
    report::write_report(&content, &output_path)?;

    if !args.quiet {
        print_summary(&run_report, config.report.worst_fields.min(5));
        println!("\n✅ Report saved to: {}", output_path.display());
    }

    // Check --fail-below threshold
    if let Some(threshold) = args.fail_below {
        if overall_f1 < threshold {
            eprintln!(
                "\n⛔ Overall F1 {:.3} is below threshold {:.3}. Failing (exit code 2).",
                overall_f1, threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

fn new_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

fn print_summary(run_report: &RunReport, worst: usize) {
    let evaluation = &run_report.evaluation;
    let overall = &evaluation.overall;

    println!("\n📊 Evaluation Summary:");
    println!("   Documents: {}", evaluation.document_count);
    println!(
        "   Precision: {:.3} | Recall: {:.3} | F1: {:.3} | Accuracy: {:.3}",
        overall.precision, overall.recall, overall.f1, overall.accuracy
    );
    println!("   Fields: {}", evaluation.fields.len());

    let weakest = evaluation.worst_fields(worst);
    if !weakest.is_empty() {
        println!("   Weakest fields:");
        for (path, metrics) in weakest {
            println!(
                "     {} {} (F1 {:.3})",
                report::generator::f1_badge(metrics.f1),
                path,
                metrics.f1
            );
        }
    }

    if !evaluation.errors.is_empty() {
        println!("   ⚠️  {} input problem(s) skipped", evaluation.errors.len());
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
