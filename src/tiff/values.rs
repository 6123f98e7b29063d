//! TIFF tag value checking and reading.
//!
//! Values can be stored either inline in the IFD entry (when `count * size`
//! fits the 4- or 8-byte slot) or at an offset in the file. [`check_entry`]
//! resolves that choice once per entry and verifies the out-of-line range
//! against the file; everything downstream works with the resolved
//! [`EntryValue`] and never re-derives offsets.

use bytes::Bytes;
use tracing::trace;

use crate::error::ValueError;
use crate::io::ByteSource;

use super::ifd::IfdEntry;
use super::parser::{ByteOrder, TiffHeader};
use super::tags::FieldType;
use super::validation::{Findings, Location, ViolationCode};

// =============================================================================
// EntryValue
// =============================================================================

/// Resolved value of an IFD entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    /// Value bytes stored in the entry's value slot
    Inline(Bytes),

    /// Value bytes stored elsewhere in the file, already bounds-checked
    External { offset: u64, bytes: Bytes },

    /// Unknown field type; the entry is kept but its value is not interpreted
    Opaque,

    /// The value could not be located safely
    Invalid,
}

impl EntryValue {
    /// The value bytes, if the entry resolved to readable data.
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            EntryValue::Inline(bytes) | EntryValue::External { bytes, .. } => Some(bytes),
            EntryValue::Opaque | EntryValue::Invalid => None,
        }
    }
}

// =============================================================================
// Entry checking
// =============================================================================

/// Raw fields of one IFD entry record, before its value is resolved.
#[derive(Debug, Clone, Copy)]
pub struct RawEntry<'a> {
    pub tag_id: u16,
    pub field_type_raw: u16,
    pub count: u64,

    /// The 4- or 8-byte value/offset slot
    pub slot: &'a Bytes,

    /// File offset of the entry record
    pub entry_offset: u64,
}

/// Validate one entry and resolve where its value lives.
///
/// Checks, in order: the type code is known (and legal for this flavour of
/// TIFF), `count * size` does not overflow, and an out-of-line value lies
/// inside the file. Problems are recorded in `findings`; the returned value
/// tells the caller whether the entry's data can be used.
pub fn check_entry(
    raw: &RawEntry<'_>,
    source: &ByteSource,
    header: &TiffHeader,
    findings: &mut Findings,
) -> EntryValue {
    let location = Location::Offset(raw.entry_offset);

    let field_type = match FieldType::from_u16(raw.field_type_raw) {
        Some(t) if t.is_bigtiff_only() && !header.is_bigtiff => {
            findings.violation(
                ViolationCode::UnknownFieldType,
                location,
                format!(
                    "tag {} uses type {} ({:?}), which is only valid in BigTIFF",
                    raw.tag_id, raw.field_type_raw, t
                ),
            );
            return EntryValue::Opaque;
        }
        Some(t) => t,
        None => {
            findings.violation(
                ViolationCode::UnknownFieldType,
                location,
                format!("tag {} uses type code {}", raw.tag_id, raw.field_type_raw),
            );
            return EntryValue::Opaque;
        }
    };

    let Some(size) = field_type.byte_size(raw.count) else {
        findings.violation(
            ViolationCode::ValueSizeOverflow,
            location,
            format!(
                "tag {}: {} values of {} bytes overflow a 64-bit size",
                raw.tag_id,
                raw.count,
                field_type.size_in_bytes()
            ),
        );
        return EntryValue::Invalid;
    };

    if size <= header.value_offset_size() {
        trace!(tag = raw.tag_id, size, "inline value");
        return EntryValue::Inline(raw.slot.slice(..size as usize));
    }

    let offset = header.read_offset(raw.slot);
    match source.read(offset, size) {
        Ok(bytes) => {
            trace!(tag = raw.tag_id, offset, size, "external value");
            EntryValue::External { offset, bytes }
        }
        Err(e) => {
            findings.violation(
                ViolationCode::ValueOutOfBounds,
                location,
                format!("tag {}: {}", raw.tag_id, e),
            );
            EntryValue::Invalid
        }
    }
}

// =============================================================================
// ValueReader
// =============================================================================

/// Reads typed values out of resolved entries.
#[derive(Debug, Clone, Copy)]
pub struct ValueReader {
    byte_order: ByteOrder,
}

impl ValueReader {
    /// Create a reader for the file's byte order.
    pub fn new(byte_order: ByteOrder) -> Self {
        Self { byte_order }
    }

    /// Read every value of an unsigned integer entry, widened to u64.
    ///
    /// Accepts BYTE, SHORT, LONG, IFD, LONG8 and IFD8 entries.
    pub fn read_u64_array(&self, entry: &IfdEntry) -> Result<Vec<u64>, ValueError> {
        let bytes = entry
            .value
            .bytes()
            .ok_or(ValueError::Unavailable { tag: entry.tag_id })?;

        let field_type = match entry.field_type {
            Some(t) if t.is_unsigned_integer() => t,
            _ => {
                return Err(ValueError::NotUnsigned {
                    tag: entry.tag_id,
                    field_type: entry.field_type_raw,
                })
            }
        };

        let width = field_type.size_in_bytes() as usize;
        let values = bytes
            .chunks_exact(width)
            .map(|chunk| match width {
                1 => chunk[0] as u64,
                2 => self.byte_order.read_u16(chunk) as u64,
                4 => self.byte_order.read_u32(chunk) as u64,
                _ => self.byte_order.read_u64(chunk),
            })
            .collect();

        Ok(values)
    }

    /// Read the first value of an unsigned integer entry.
    pub fn read_u64(&self, entry: &IfdEntry) -> Result<u64, ValueError> {
        self.read_u64_array(entry)?
            .first()
            .copied()
            .ok_or(ValueError::Empty { tag: entry.tag_id })
    }
}

// =============================================================================
// Tests
// =============================================================================
