//! Command-line configuration for `tiff-check`.
//!
//! Options can be given as flags or through environment variables with the
//! `TIFF_CHECK_` prefix:
//!
//! - `TIFF_CHECK_MAX_CHAIN_LENGTH` - Directories allowed in one chain (default: 10000)
//! - `TIFF_CHECK_MAX_SUBIFD_DEPTH` - Sub-IFD nesting allowed (default: 8)
//! - `TIFF_CHECK_MAX_DIRECTORIES` - Directories allowed per file (default: 65536)
//! - `TIFF_CHECK_FORMAT` - Report format, `text` or `json` (default: text)
//! - `TIFF_CHECK_JOBS` - Files validated concurrently (default: 4)
//!
//! # Example
//!
//! ```ignore
//! use tiff_integrity::config::Config;
//!
//! let config = Config::parse();
//! let validator = Validator::new(config.validator_config());
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::tiff::DEFAULT_MAX_CHAIN_LENGTH;
use crate::validator::{ValidatorConfig, DEFAULT_MAX_DIRECTORIES, DEFAULT_MAX_SUBIFD_DEPTH};

/// Default number of files validated at the same time.
pub const DEFAULT_JOBS: usize = 4;

/// Upper bound for `--jobs`.
pub const MAX_JOBS: usize = 256;

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per file, followed by its findings
    Text,
    /// One JSON document per run
    Json,
}

/// tiff-check - Structural integrity checks for TIFF and BigTIFF files.
///
/// Walks every directory of each file and verifies that all offsets, value
/// ranges and strip/tile data lie inside the file. No pixel data is decoded.
#[derive(Parser, Debug, Clone)]
#[command(name = "tiff-check")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    // =========================================================================
    // Limits
    // =========================================================================
    /// Maximum number of directories in a single IFD chain.
    #[arg(long, default_value_t = DEFAULT_MAX_CHAIN_LENGTH, env = "TIFF_CHECK_MAX_CHAIN_LENGTH")]
    pub max_chain_length: usize,

    /// Maximum nesting depth of sub-IFDs.
    #[arg(long, default_value_t = DEFAULT_MAX_SUBIFD_DEPTH, env = "TIFF_CHECK_MAX_SUBIFD_DEPTH")]
    pub max_subifd_depth: usize,

    /// Maximum number of directories read from one file.
    #[arg(long, default_value_t = DEFAULT_MAX_DIRECTORIES, env = "TIFF_CHECK_MAX_DIRECTORIES")]
    pub max_directories: usize,

    /// Number of files read and validated concurrently.
    ///
    /// Each file is held in memory while it is validated.
    #[arg(short, long, default_value_t = DEFAULT_JOBS, env = "TIFF_CHECK_JOBS")]
    pub jobs: usize,

    // =========================================================================
    // Output
    // =========================================================================
    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "TIFF_CHECK_FORMAT")]
    pub format: OutputFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.files.is_empty() {
            return Err("at least one file is required".to_string());
        }
        if self.jobs == 0 || self.jobs > MAX_JOBS {
            return Err(format!("jobs must be between 1 and {}", MAX_JOBS));
        }
        self.validator_config().validate()
    }

    /// Limits for the library validator.
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            max_chain_length: self.max_chain_length,
            max_subifd_depth: self.max_subifd_depth,
            max_directories: self.max_directories,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
