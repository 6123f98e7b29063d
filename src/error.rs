use thiserror::Error;

/// Errors raised when reading from the file buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    /// Requested range exceeds the file bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// `offset + length` does not fit in a 64-bit offset
    #[error("Range overflow: {requested} bytes at offset {offset} exceeds the addressable range")]
    RangeOverflow { offset: u64, requested: u64 },

    /// The file could not be loaded
    #[error("Failed to read {path}: {message}")]
    File { path: String, message: String },
}

/// Errors that can occur when parsing the TIFF header
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TiffError {
    /// I/O error while reading the header
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid byte order marker (not II or MM)
    #[error("Invalid byte order marker: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// Invalid BigTIFF constant field (must be 0)
    #[error("Invalid BigTIFF reserved field: expected 0, got {0}")]
    InvalidBigTiffReserved(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },
}

/// Errors that stop a single directory from being read
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IfdError {
    /// The directory offset does not leave room for the entry count
    #[error("IFD at offset {offset} is unreachable: {source}")]
    Unreachable { offset: u64, source: IoError },

    /// The declared entry count implies a directory larger than the file
    #[error(
        "IFD at offset {offset} declares {entry_count} entries, which overruns the file size of {file_size} bytes"
    )]
    EntryCountOverflow {
        offset: u64,
        entry_count: u64,
        file_size: u64,
    },

    /// The directory declares zero entries
    #[error("IFD at offset {offset} has no entries")]
    NoEntries { offset: u64 },
}

/// Errors that stop traversal of a directory chain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// A directory offset was reached twice from the same root
    #[error("IFD offset {offset} was already visited")]
    Cycle { offset: u64 },

    /// The chain has more directories than the configured cap
    #[error("chain is longer than {limit} directories")]
    TooLong { limit: usize },

    /// Sub-IFDs are nested deeper than the configured cap
    #[error("sub-IFD nesting is deeper than {limit} levels")]
    TooDeep { limit: usize },

    /// The run visited more directories than the configured total
    #[error("file holds more than {limit} directories in total")]
    BudgetExhausted { limit: usize },
}

/// Errors raised when interpreting an entry's value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The entry failed validation, so its value cannot be trusted
    #[error("value of tag {tag} is unavailable")]
    Unavailable { tag: u16 },

    /// The entry's type cannot be read as an unsigned integer
    #[error("tag {tag} has type {field_type}, expected an unsigned integer type")]
    NotUnsigned { tag: u16, field_type: u16 },

    /// The entry holds no values
    #[error("tag {tag} has a count of 0")]
    Empty { tag: u16 },
}
