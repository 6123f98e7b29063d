//! Validation findings and the final verdict.
//!
//! Every structural problem found during a run becomes a [`Violation`]. The
//! checks never bail out on the first problem: they record it and carry on as
//! far as the file can still be walked safely, so the caller gets the whole
//! diagnostic trail in one pass.
//!
//! # Violation families
//!
//! | Kind     | Scope of the failure                                  |
//! |----------|-------------------------------------------------------|
//! | `Header` | The whole run; nothing after the header is trusted     |
//! | `Ifd`    | One directory; its chain stops there                  |
//! | `Tag`    | One entry; the rest of the directory is still checked |
//! | `Layout` | Image data tags of one directory                      |
//! | `Chain`  | One directory chain; sibling chains still validate    |

use std::fmt;

use serde::Serialize;

use crate::error::{ChainError, IfdError, TiffError};

// =============================================================================
// Violation vocabulary
// =============================================================================

/// Family a violation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationKind {
    #[serde(rename = "HeaderError")]
    Header,
    #[serde(rename = "IFDError")]
    Ifd,
    #[serde(rename = "TagError")]
    Tag,
    #[serde(rename = "LayoutError")]
    Layout,
    #[serde(rename = "ChainError")]
    Chain,
}

impl ViolationKind {
    /// Name of the family as shown in reports.
    pub const fn name(self) -> &'static str {
        match self {
            ViolationKind::Header => "HeaderError",
            ViolationKind::Ifd => "IFDError",
            ViolationKind::Tag => "TagError",
            ViolationKind::Layout => "LayoutError",
            ViolationKind::Chain => "ChainError",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Specific rule a violation breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    // Header
    BadByteOrder,
    UnsupportedVersion,
    BadBigTiffHeader,
    TruncatedHeader,

    // Directory structure
    EntryCountOverflow,
    EmptyChain,
    UnreachableDirectory,
    EmptyDirectory,

    // Entries
    UnknownFieldType,
    ValueSizeOverflow,
    ValueOutOfBounds,

    // Image data layout
    AmbiguousLayout,
    ArrayLengthMismatch,
    DataOutOfBounds,
    ByteCountMismatch,
    MissingRequiredTag,
    InvalidTileDimensions,
    SegmentCountMismatch,
    LayoutTagType,

    // Directory chains
    CyclicChain,
    ChainTooLong,
    SubIfdTooDeep,
}

impl ViolationCode {
    /// The family this rule belongs to.
    pub const fn kind(self) -> ViolationKind {
        use ViolationCode::*;
        match self {
            BadByteOrder | UnsupportedVersion | BadBigTiffHeader | TruncatedHeader => {
                ViolationKind::Header
            }
            EntryCountOverflow | EmptyChain | UnreachableDirectory | EmptyDirectory => {
                ViolationKind::Ifd
            }
            UnknownFieldType | ValueSizeOverflow | ValueOutOfBounds => ViolationKind::Tag,
            AmbiguousLayout | ArrayLengthMismatch | DataOutOfBounds | ByteCountMismatch
            | MissingRequiredTag | InvalidTileDimensions | SegmentCountMismatch
            | LayoutTagType => ViolationKind::Layout,
            CyclicChain | ChainTooLong | SubIfdTooDeep => ViolationKind::Chain,
        }
    }

    /// One-line description of the rule.
    pub const fn summary(self) -> &'static str {
        use ViolationCode::*;
        match self {
            BadByteOrder => "bad byte order marker",
            UnsupportedVersion => "unsupported version",
            BadBigTiffHeader => "malformed BigTIFF header",
            TruncatedHeader => "file too small for header",
            EntryCountOverflow => "entry count overflows directory size",
            EmptyChain => "empty or unreachable directory chain",
            UnreachableDirectory => "directory offset out of file bounds",
            EmptyDirectory => "directory has no entries",
            UnknownFieldType => "unknown type code",
            ValueSizeOverflow => "value size overflow",
            ValueOutOfBounds => "value offset out of file bounds",
            AmbiguousLayout => "ambiguous or missing image-data layout",
            ArrayLengthMismatch => "offset/count array length mismatch",
            DataOutOfBounds => "strip/tile data out of bounds",
            ByteCountMismatch => "declared byte count inconsistent with uncompressed size",
            MissingRequiredTag => "missing required image tag",
            InvalidTileDimensions => "invalid tile dimensions",
            SegmentCountMismatch => "strip/tile count inconsistent with image geometry",
            LayoutTagType => "image-data tag has unusable type",
            CyclicChain => "cyclic or repeated IFD offset",
            ChainTooLong => "directory chain exceeds maximum length",
            SubIfdTooDeep => "sub-IFD nesting exceeds maximum depth",
        }
    }
}

impl From<&TiffError> for ViolationCode {
    fn from(error: &TiffError) -> Self {
        match error {
            TiffError::InvalidMagic(_) => ViolationCode::BadByteOrder,
            TiffError::InvalidVersion(_) => ViolationCode::UnsupportedVersion,
            TiffError::InvalidBigTiffOffsetSize(_) | TiffError::InvalidBigTiffReserved(_) => {
                ViolationCode::BadBigTiffHeader
            }
            TiffError::FileTooSmall { .. } | TiffError::Io(_) => ViolationCode::TruncatedHeader,
        }
    }
}

impl From<&IfdError> for ViolationCode {
    fn from(error: &IfdError) -> Self {
        match error {
            IfdError::Unreachable { .. } => ViolationCode::UnreachableDirectory,
            IfdError::EntryCountOverflow { .. } => ViolationCode::EntryCountOverflow,
            IfdError::NoEntries { .. } => ViolationCode::EmptyDirectory,
        }
    }
}

impl From<&ChainError> for ViolationCode {
    fn from(error: &ChainError) -> Self {
        match error {
            ChainError::Cycle { .. } => ViolationCode::CyclicChain,
            ChainError::TooLong { .. } | ChainError::BudgetExhausted { .. } => {
                ViolationCode::ChainTooLong
            }
            ChainError::TooDeep { .. } => ViolationCode::SubIfdTooDeep,
        }
    }
}

// =============================================================================
// Location
// =============================================================================

/// Where in the file a finding applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Absolute byte offset
    Offset(u64),

    /// Directory by position in the main IFD chain
    Ifd(usize),

    /// One element of a directory's strip/tile arrays
    Segment {
        /// Byte offset of the directory holding the arrays
        ifd_offset: u64,
        /// Index of the strip or tile
        index: usize,
    },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Offset(offset) => write!(f, "offset {}", offset),
            Location::Ifd(index) => write!(f, "IFD #{}", index),
            Location::Segment { ifd_offset, index } => {
                write!(f, "IFD at offset {}, segment {}", ifd_offset, index)
            }
        }
    }
}

// =============================================================================
// Violation / Warning
// =============================================================================

/// A structural problem that makes the file invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Family of the problem
    pub kind: ViolationKind,

    /// Specific rule broken
    pub code: ViolationCode,

    /// Where the problem was found
    pub location: Location,

    /// Human-readable explanation
    pub detail: String,
}

impl Violation {
    /// Create a violation; the kind follows from the code.
    pub fn new(code: ViolationCode, location: Location, detail: impl Into<String>) -> Self {
        Violation {
            kind: code.kind(),
            code,
            location,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {}: {}",
            self.kind,
            self.code.summary(),
            self.location,
            self.detail
        )
    }
}

/// An irregularity that does not make the file invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub location: Location,
    pub detail: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning at {}: {}", self.location, self.detail)
    }
}

// =============================================================================
// Verdict
// =============================================================================

/// Final result of validating one file.
///
/// `is_valid` is true exactly when `violations` is empty. Warnings are
/// reported alongside but never change the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub is_valid: bool,
    pub violations: Vec<Violation>,
    pub warnings: Vec<Warning>,
}

impl Verdict {
    /// Violations of one family, in the order they were found.
    pub fn violations_of(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    /// Whether any violation carries `code`.
    pub fn has(&self, code: ViolationCode) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }
}

// =============================================================================
// Findings
// =============================================================================

/// Accumulates violations and warnings during a run.
#[derive(Debug, Default)]
pub struct Findings {
    violations: Vec<Violation>,
    warnings: Vec<Warning>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation.
    pub fn violation(&mut self, code: ViolationCode, location: Location, detail: impl Into<String>) {
        self.violations.push(Violation::new(code, location, detail));
    }

    /// Record a warning.
    pub fn warning(&mut self, location: Location, detail: impl Into<String>) {
        self.warnings.push(Warning {
            location,
            detail: detail.into(),
        });
    }

    /// Number of violations recorded so far.
    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    /// Seal the findings into an immutable verdict.
    pub fn into_verdict(self) -> Verdict {
        Verdict {
            is_valid: self.violations.is_empty(),
            violations: self.violations,
            warnings: self.warnings,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
