//! Structural checks for TIFF and BigTIFF files.
//!
//! A file is a header followed by directories (IFDs) linked by offsets. The
//! header picks the byte order (`II` or `MM`) and the offset width: classic
//! files use 32-bit offsets and 12-byte entries, BigTIFF 64-bit offsets and
//! 20-byte entries. Every reader here handles both.
//!
//! An entry's value lives in the entry itself when it fits the 4- or 8-byte
//! slot, otherwise the slot holds an offset to it. Directories may also point
//! at nested directories through SubIFDs, EXIF, GPS and Interoperability
//! tags. All of these offsets come straight from the file, so every hop is
//! bounds-checked and guarded against cycles.
//!
//! Checks never abort on the first problem. Violations and warnings
//! accumulate in a [`Findings`] collector and become a [`Verdict`] at the end.

mod chain;
mod ifd;
mod layout;
mod parser;
mod tags;
mod validation;
mod values;

pub use chain::{ChainGuard, DEFAULT_MAX_CHAIN_LENGTH};
pub use ifd::{Ifd, IfdEntry};
pub use layout::{LayoutValidator, Organization, SegmentTable};
pub use parser::{ByteOrder, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use tags::{FieldType, TiffTag, COMPRESSION_NONE, PLANAR_SEPARATE};
pub use validation::{
    Findings, Location, Verdict, Violation, ViolationCode, ViolationKind, Warning,
};
pub use values::{check_entry, EntryValue, RawEntry, ValueReader};
