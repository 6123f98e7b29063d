//! Whole-file validation.
//!
//! [`Validator`] drives one run over a file buffer:
//!
//! ```text
//! header ──► main IFD chain ──► per directory: entries, layout, sub-IFDs
//!                                                              │
//!                                    isolated chain per offset ◄┘
//! ```
//!
//! A directory is validated once per run, however many chains reach it.
//!
//! Only a bad header stops the run. Every other problem is recorded and the
//! walk continues as far as the file can still be followed safely.

use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use crate::error::{ChainError, IoError};
use crate::io::ByteSource;
use crate::tiff::{
    ChainGuard, Findings, Ifd, LayoutValidator, Location, TiffHeader, TiffTag, ValueReader,
    Verdict, ViolationCode, DEFAULT_MAX_CHAIN_LENGTH,
};

// =============================================================================
// Configuration
// =============================================================================

/// Default cap on sub-IFD nesting.
pub const DEFAULT_MAX_SUBIFD_DEPTH: usize = 8;

/// Default cap on directories visited in one run.
pub const DEFAULT_MAX_DIRECTORIES: usize = 65_536;

/// Work limits for one validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Maximum directories in a single chain
    pub max_chain_length: usize,

    /// Maximum nesting of sub-IFDs below a main-chain directory
    pub max_subifd_depth: usize,

    /// Maximum directories across all chains of the file
    pub max_directories: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_chain_length: DEFAULT_MAX_CHAIN_LENGTH,
            max_subifd_depth: DEFAULT_MAX_SUBIFD_DEPTH,
            max_directories: DEFAULT_MAX_DIRECTORIES,
        }
    }
}

impl ValidatorConfig {
    /// Validate the limits.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chain_length == 0 {
            return Err("max_chain_length must be at least 1".to_string());
        }
        if self.max_directories == 0 {
            return Err("max_directories must be at least 1".to_string());
        }
        if self.max_directories < self.max_chain_length {
            return Err(format!(
                "max_directories ({}) must not be smaller than max_chain_length ({})",
                self.max_directories, self.max_chain_length
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Structural validator for TIFF and BigTIFF files.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a complete file held in memory.
    pub fn validate(&self, data: impl Into<Bytes>) -> Verdict {
        let source = ByteSource::new(data);
        let mut findings = Findings::new();

        let header = match TiffHeader::read(&source) {
            Ok(header) => header,
            Err(e) => {
                debug!(error = %e, "header rejected");
                findings.violation(ViolationCode::from(&e), Location::Offset(0), e.to_string());
                return findings.into_verdict();
            }
        };

        debug!(
            byte_order = ?header.byte_order,
            bigtiff = header.is_bigtiff,
            first_ifd = header.first_ifd_offset,
            size = source.size(),
            "parsed header"
        );

        let mut walk = Walk {
            source: &source,
            header,
            reader: ValueReader::new(header.byte_order),
            config: &self.config,
            findings,
            directories: 0,
            budget_exhausted: false,
            ancestors: Vec::new(),
            validated: HashMap::new(),
        };

        if walk.check_first_ifd() {
            walk.walk_chain(header.first_ifd_offset, ChainRole::Main, 0);
        }

        let verdict = walk.findings.into_verdict();
        debug!(
            valid = verdict.is_valid,
            violations = verdict.violations.len(),
            warnings = verdict.warnings.len(),
            directories = walk.directories,
            "validation finished"
        );
        verdict
    }

    /// Read a file from disk and validate it.
    pub fn validate_file(&self, path: impl AsRef<Path>) -> Result<Verdict, IoError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| IoError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(self.validate(data))
    }
}

/// Validate a file buffer with the default limits.
pub fn validate(data: impl Into<Bytes>) -> Verdict {
    Validator::default().validate(data)
}

/// Validate a borrowed buffer with the default limits.
pub fn validate_slice(data: &[u8]) -> Verdict {
    validate(Bytes::copy_from_slice(data))
}

/// Read and validate a file with the default limits.
pub fn validate_file(path: impl AsRef<Path>) -> Result<Verdict, IoError> {
    Validator::default().validate_file(path)
}

// =============================================================================
// Traversal
// =============================================================================

/// What the directories of a chain describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainRole {
    /// The top-level chain starting at the header's first offset
    Main,
    /// Reduced-resolution or alternate images (SubIFDs)
    SubImage,
    /// EXIF, GPS or Interoperability metadata
    Metadata,
}

impl ChainRole {
    fn has_image_data(self) -> bool {
        matches!(self, ChainRole::Main | ChainRole::SubImage)
    }
}

/// State of one run.
struct Walk<'a> {
    source: &'a ByteSource,
    header: TiffHeader,
    reader: ValueReader,
    config: &'a ValidatorConfig,
    findings: Findings,

    /// Directories read so far across all chains
    directories: usize,
    budget_exhausted: bool,

    /// Directories of the chains enclosing the current position
    ancestors: Vec<u64>,

    /// Every directory read so far, mapped to whether its layout was checked
    validated: HashMap<u64, bool>,
}

impl Walk<'_> {
    /// The header's first offset must lead somewhere readable.
    fn check_first_ifd(&mut self) -> bool {
        let offset = self.header.first_ifd_offset;
        // The offset field follows the version (and BigTIFF's two extra fields)
        let field = Location::Offset(if self.header.is_bigtiff { 8 } else { 4 });

        let problem = if offset == 0 {
            "first IFD offset is 0".to_string()
        } else if offset < self.header.header_size() {
            format!("first IFD offset {} points into the header", offset)
        } else if let Err(e) = self.source.check_range(offset, self.header.ifd_count_size()) {
            format!("first IFD offset {}: {}", offset, e)
        } else {
            return true;
        };

        self.findings
            .violation(ViolationCode::EmptyChain, field, problem);
        false
    }

    /// Follow one chain of next-IFD offsets from `start`.
    ///
    /// A sub-chain stops at the first directory that was already validated.
    /// The main chain passes through such directories to keep page indices,
    /// checking only what the earlier visit did not.
    fn walk_chain(&mut self, start: u64, role: ChainRole, depth: usize) {
        let mut guard = ChainGuard::new(self.config.max_chain_length);
        let base = self.ancestors.len();
        let mut offset = start;
        let mut index = 0;

        while offset != 0 {
            if let Err(e) = guard.enter(offset) {
                self.chain_violation(&e, offset);
                break;
            }
            // A next-link back into an enclosing chain
            if self.ancestors[..base].contains(&offset) {
                self.chain_violation(&ChainError::Cycle { offset }, offset);
                break;
            }

            let seen = self.validated.get(&offset).copied();
            if role != ChainRole::Main && self.already_validated(offset, role) {
                debug!(offset, ?role, "directory already validated, chain stops");
                break;
            }
            if !self.charge_budget(offset) {
                break;
            }
            let needs_layout = role.has_image_data() && seen != Some(true);
            self.validated
                .insert(offset, needs_layout || seen == Some(true));

            let location = match role {
                ChainRole::Main => Location::Ifd(index),
                ChainRole::SubImage | ChainRole::Metadata => Location::Offset(offset),
            };

            // Entry findings of a revisited directory were recorded the first time
            let mut repeat = Findings::new();
            let sink = if seen.is_some() {
                &mut repeat
            } else {
                &mut self.findings
            };
            let ifd = match Ifd::read(self.source, &self.header, offset, sink) {
                Ok(ifd) => ifd,
                Err(e) => {
                    debug!(offset, error = %e, "directory unreadable, chain stops");
                    if seen.is_none() {
                        self.findings
                            .violation(ViolationCode::from(&e), location, e.to_string());
                    }
                    break;
                }
            };

            if needs_layout {
                LayoutValidator::new(&ifd, self.reader, self.source.size(), location)
                    .validate(&mut self.findings);
            }

            if seen.is_none() {
                self.ancestors.push(offset);
                self.descend(&ifd, depth);
            }

            offset = ifd.next_ifd_offset;
            index += 1;
        }

        self.ancestors.truncate(base);
        debug!(start, ?role, depth, directories = guard.len(), "chain finished");
    }

    /// Walk the sub-directories referenced by `ifd`, each as its own root.
    fn descend(&mut self, ifd: &Ifd, depth: usize) {
        for tag in TiffTag::SUB_DIRECTORY_TAGS {
            let Some(entry) = ifd.get_entry_by_tag(tag) else {
                continue;
            };
            let offsets = match self.reader.read_u64_array(entry) {
                Ok(offsets) => offsets,
                Err(e) => {
                    if entry.value.bytes().is_some() {
                        self.findings.warning(
                            Location::Offset(entry.entry_offset),
                            format!("{} not followed: {}", tag.name(), e),
                        );
                    }
                    continue;
                }
            };

            let role = if tag.points_at_images() {
                ChainRole::SubImage
            } else {
                ChainRole::Metadata
            };

            for sub in offsets.into_iter().filter(|&o| o != 0) {
                if self.budget_exhausted {
                    return;
                }
                if depth >= self.config.max_subifd_depth {
                    let e = ChainError::TooDeep {
                        limit: self.config.max_subifd_depth,
                    };
                    self.chain_violation(&e, sub);
                    continue;
                }
                if self.ancestors.contains(&sub) {
                    self.chain_violation(&ChainError::Cycle { offset: sub }, sub);
                    continue;
                }
                if self.already_validated(sub, role) {
                    debug!(tag = tag.name(), offset = sub, "sub-IFD already validated");
                    continue;
                }
                debug!(tag = tag.name(), offset = sub, depth = depth + 1, "following sub-IFD");
                self.walk_chain(sub, role, depth + 1);
            }
        }
    }

    /// Whether a visit to `offset` in a chain of `role` would find nothing new.
    fn already_validated(&self, offset: u64, role: ChainRole) -> bool {
        match self.validated.get(&offset) {
            Some(&layout_checked) => layout_checked || !role.has_image_data(),
            None => false,
        }
    }

    /// Count one more directory against the run-wide cap.
    fn charge_budget(&mut self, offset: u64) -> bool {
        if self.budget_exhausted {
            return false;
        }
        if self.directories >= self.config.max_directories {
            self.budget_exhausted = true;
            let e = ChainError::BudgetExhausted {
                limit: self.config.max_directories,
            };
            self.chain_violation(&e, offset);
            return false;
        }
        self.directories += 1;
        true
    }

    fn chain_violation(&mut self, error: &ChainError, offset: u64) {
        debug!(offset, error = %error, "chain stopped");
        self.findings.violation(
            ViolationCode::from(error),
            Location::Offset(offset),
            error.to_string(),
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
