//! Image File Directory reading.
//!
//! An IFD is an entry count, a table of fixed-size entry records, and the
//! offset of the next IFD. The whole directory is bounds-checked as one range
//! before any entry is decoded, so a lying entry count can never drive reads
//! past the end of the file.
//!
//! ```text
//! Classic:  count (u16) | count x 12-byte entries | next offset (u32)
//! BigTIFF:  count (u64) | count x 20-byte entries | next offset (u64)
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::IfdError;
use crate::io::ByteSource;

use super::parser::TiffHeader;
use super::tags::{FieldType, TiffTag};
use super::validation::{Findings, Location};
use super::values::{check_entry, EntryValue, RawEntry};

// =============================================================================
// IfdEntry
// =============================================================================

/// A single validated entry of an IFD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    /// Tag ID
    pub tag_id: u16,

    /// Field type, if the type code is known
    pub field_type: Option<FieldType>,

    /// Raw field type code as stored
    pub field_type_raw: u16,

    /// Number of values
    pub count: u64,

    /// File offset of the entry record
    pub entry_offset: u64,

    /// Where the value lives, as resolved by [`check_entry`]
    pub value: EntryValue,
}

impl IfdEntry {
    /// The tag this entry carries, if it has structural meaning.
    #[inline]
    pub fn tag(&self) -> Option<TiffTag> {
        TiffTag::from_u16(self.tag_id)
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// A parsed Image File Directory.
#[derive(Debug, Clone)]
pub struct Ifd {
    /// File offset of the directory
    pub offset: u64,

    /// Entries in stored order
    pub entries: Vec<IfdEntry>,

    /// Index of the first entry for each tag ID
    pub entries_by_tag: HashMap<u16, usize>,

    /// Offset of the next IFD (0 = end of chain)
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// Size in bytes of a directory holding `entry_count` entries.
    ///
    /// Returns `None` when the size overflows.
    pub fn calculate_size(entry_count: u64, header: &TiffHeader) -> Option<u64> {
        entry_count
            .checked_mul(header.ifd_entry_size())?
            .checked_add(header.ifd_count_size())?
            .checked_add(header.ifd_next_offset_size())
    }

    /// Read the directory at `offset`, validating every entry.
    ///
    /// Entry-level problems are recorded in `findings` and do not stop the
    /// read. The returned error covers problems that make the directory
    /// itself unreadable.
    pub fn read(
        source: &ByteSource,
        header: &TiffHeader,
        offset: u64,
        findings: &mut Findings,
    ) -> Result<Ifd, IfdError> {
        let byte_order = header.byte_order;

        let count_bytes = source
            .read(offset, header.ifd_count_size())
            .map_err(|source| IfdError::Unreachable { offset, source })?;
        let entry_count = if header.is_bigtiff {
            byte_order.read_u64(&count_bytes)
        } else {
            byte_order.read_u16(&count_bytes) as u64
        };

        if entry_count == 0 {
            return Err(IfdError::NoEntries { offset });
        }

        let overflow = IfdError::EntryCountOverflow {
            offset,
            entry_count,
            file_size: source.size(),
        };
        let ifd_size = Self::calculate_size(entry_count, header).ok_or(overflow.clone())?;
        let ifd_bytes = source.read(offset, ifd_size).map_err(|_| overflow)?;

        debug!(offset, entry_count, "reading IFD");

        let entry_size = header.ifd_entry_size() as usize;
        let count_size = header.ifd_count_size() as usize;
        let slot_size = header.value_offset_size() as usize;
        let count_field_size = header.entry_count_field_size() as usize;

        let mut entries = Vec::with_capacity(entry_count as usize);
        let mut entries_by_tag = HashMap::with_capacity(entry_count as usize);
        let mut previous_tag: Option<u16> = None;

        for i in 0..entry_count as usize {
            let start = count_size + i * entry_size;
            let record: Bytes = ifd_bytes.slice(start..start + entry_size);
            let entry_offset = offset + start as u64;

            let tag_id = byte_order.read_u16(&record[0..2]);
            let field_type_raw = byte_order.read_u16(&record[2..4]);
            let count = if header.is_bigtiff {
                byte_order.read_u64(&record[4..12])
            } else {
                byte_order.read_u32(&record[4..8]) as u64
            };
            let slot_start = 4 + count_field_size;
            let slot = record.slice(slot_start..slot_start + slot_size);

            trace!(tag = tag_id, field_type = field_type_raw, count, "IFD entry");

            let raw = RawEntry {
                tag_id,
                field_type_raw,
                count,
                slot: &slot,
                entry_offset,
            };
            let value = check_entry(&raw, source, header, findings);

            match previous_tag {
                Some(prev) if tag_id == prev || entries_by_tag.contains_key(&tag_id) => {
                    findings.warning(
                        Location::Offset(entry_offset),
                        format!("duplicate tag {}; the first occurrence is used", tag_id),
                    );
                }
                Some(prev) if tag_id < prev => {
                    findings.warning(
                        Location::Offset(entry_offset),
                        format!("tag {} follows tag {}; tags are not sorted", tag_id, prev),
                    );
                }
                _ => {}
            }
            previous_tag = Some(tag_id);

            if field_type_raw == FieldType::Ascii as u16 {
                if let Some(bytes) = value.bytes() {
                    if bytes.last().is_some_and(|&b| b != 0) {
                        findings.warning(
                            Location::Offset(entry_offset),
                            format!("ASCII value of tag {} is not NUL-terminated", tag_id),
                        );
                    }
                }
            }

            entries_by_tag.entry(tag_id).or_insert(entries.len());
            entries.push(IfdEntry {
                tag_id,
                field_type: FieldType::from_u16(field_type_raw),
                field_type_raw,
                count,
                entry_offset,
                value,
            });
        }

        let next_start = count_size + entry_count as usize * entry_size;
        let next_ifd_offset = header.read_offset(&ifd_bytes[next_start..]);

        Ok(Ifd {
            offset,
            entries,
            entries_by_tag,
            next_ifd_offset,
        })
    }

    /// Get the first entry carrying `tag`.
    pub fn get_entry_by_tag(&self, tag: TiffTag) -> Option<&IfdEntry> {
        self.entries_by_tag
            .get(&tag.as_u16())
            .and_then(|&i| self.entries.get(i))
    }

    /// Whether the directory has strip data tags.
    pub fn is_stripped(&self) -> bool {
        self.get_entry_by_tag(TiffTag::StripOffsets).is_some()
            || self.get_entry_by_tag(TiffTag::StripByteCounts).is_some()
    }

    /// Whether the directory has tile data tags.
    pub fn is_tiled(&self) -> bool {
        self.get_entry_by_tag(TiffTag::TileOffsets).is_some()
            || self.get_entry_by_tag(TiffTag::TileByteCounts).is_some()
    }

    /// Number of entries in the directory.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
