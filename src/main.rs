//! tiff-check - Structural integrity checks for TIFF files.
//!
//! Validates each file given on the command line and exits with success only
//! if every file is structurally valid.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::{debug, error};
use tokio::sync::Semaphore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiff_integrity::{
    config::{Config, OutputFormat},
    Validator, Verdict,
};

/// Outcome for one file on the command line.
#[derive(Debug, Serialize)]
struct FileReport {
    path: String,

    /// Set when the file could not be read at all
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<Verdict>,
}

impl FileReport {
    fn is_valid(&self) -> bool {
        self.verdict.as_ref().is_some_and(|v| v.is_valid)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let validator = Validator::new(config.validator_config());

    // Files are independent; at most `jobs` are held in memory at once.
    // Reports keep the command-line order.
    let semaphore = Arc::new(Semaphore::new(config.jobs));
    let mut tasks = Vec::with_capacity(config.files.len());
    for path in config.files.iter().cloned() {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Failed to schedule validation: {}", e);
                return ExitCode::FAILURE;
            }
        };
        let validator = validator.clone();
        tasks.push(tokio::spawn(async move {
            let report = check_file(validator, path).await;
            drop(permit);
            report
        }));
    }

    let mut reports = Vec::with_capacity(tasks.len());
    for (task, path) in tasks.into_iter().zip(&config.files) {
        let report = match task.await {
            Ok(report) => report,
            Err(e) => FileReport {
                path: path.display().to_string(),
                error: Some(format!("validation task failed: {}", e)),
                verdict: None,
            },
        };
        reports.push(report);
    }

    let printed = match config.format {
        OutputFormat::Text => {
            reports.iter().for_each(print_text);
            true
        }
        OutputFormat::Json => print_json(&reports),
    };

    if printed && reports.iter().all(FileReport::is_valid) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Read one file and validate it off the async runtime.
async fn check_file(validator: Validator, path: PathBuf) -> FileReport {
    let path_str = path.display().to_string();

    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) => {
            return FileReport {
                path: path_str,
                error: Some(e.to_string()),
                verdict: None,
            }
        }
    };

    debug!(path = %path_str, size = data.len(), "validating");

    match tokio::task::spawn_blocking(move || validator.validate(data)).await {
        Ok(verdict) => FileReport {
            path: path_str,
            error: None,
            verdict: Some(verdict),
        },
        Err(e) => FileReport {
            path: path_str,
            error: Some(format!("validation task failed: {}", e)),
            verdict: None,
        },
    }
}

fn print_text(report: &FileReport) {
    match (&report.verdict, &report.error) {
        (Some(verdict), _) => {
            if verdict.is_valid {
                println!("{}: valid", report.path);
            } else {
                println!(
                    "{}: INVALID ({} violation(s))",
                    report.path,
                    verdict.violations.len()
                );
            }
            for violation in &verdict.violations {
                println!("  {}", violation);
            }
            for warning in &verdict.warnings {
                println!("  {}", warning);
            }
        }
        (None, Some(e)) => println!("{}: ERROR {}", report.path, e),
        (None, None) => println!("{}: ERROR no result", report.path),
    }
}

fn print_json(reports: &[FileReport]) -> bool {
    match serde_json::to_string_pretty(reports) {
        Ok(json) => {
            println!("{}", json);
            true
        }
        Err(e) => {
            error!("Failed to serialize report: {}", e);
            false
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tiff_integrity=debug"
    } else {
        "tiff_integrity=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
