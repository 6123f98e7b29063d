//! # TIFF Integrity
//!
//! Structural validation of TIFF and BigTIFF files without decoding pixels.
//!
//! TIFF is a pointer-chasing format: directories, tag values and image data
//! are all located through offsets stored elsewhere in the file. This crate
//! walks that structure and reports whether every pointer is self-consistent
//! and every byte range a decoder would touch lies inside the file. Hostile
//! or truncated input never causes out-of-range reads or unbounded loops.
//!
//! ## Architecture
//!
//! - [`io`] - Bounds-checked byte access over the file buffer
//! - [`tiff`] - Header, directory, entry, layout and chain checks
//! - [`validator`] - Drives a run and produces the [`Verdict`]
//! - [`config`] - CLI configuration for the `tiff-check` binary
//!
//! ## Example
//!
//! ```rust,no_run
//! use tiff_integrity::{validate_file, ViolationKind};
//!
//! let verdict = validate_file("scan.tif").unwrap();
//! if !verdict.is_valid {
//!     for violation in verdict.violations_of(ViolationKind::Layout) {
//!         println!("{}", violation);
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod tiff;
pub mod validator;

// Re-export commonly used types
pub use config::{Config, OutputFormat};
pub use error::{ChainError, IfdError, IoError, TiffError, ValueError};
pub use io::ByteSource;
pub use tiff::{
    ByteOrder, FieldType, Ifd, IfdEntry, Location, TiffHeader, TiffTag, Verdict, Violation,
    ViolationCode, ViolationKind, Warning,
};
pub use validator::{
    validate, validate_file, validate_slice, Validator, ValidatorConfig,
    DEFAULT_MAX_DIRECTORIES, DEFAULT_MAX_SUBIFD_DEPTH,
};
