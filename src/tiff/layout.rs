//! Strip and tile layout validation.
//!
//! An image directory locates its pixel data through two parallel arrays:
//! byte offsets and byte counts, one pair per strip or per tile. This module
//! checks that exactly one organization is declared, that the arrays agree
//! with each other and with the image geometry, and that every data range
//! lies inside the file.
//!
//! # Geometry
//!
//! ```text
//! strips:  ceil(ImageLength / RowsPerStrip)                       x planes
//! tiles:   ceil(ImageWidth / TileWidth) x ceil(ImageLength / TileLength) x planes
//! ```
//!
//! `planes` is SamplesPerPixel when PlanarConfiguration is 2, otherwise 1.
//! For uncompressed data the byte counts must also add up to at least the
//! decoded image size; compressed sizes are not knowable without decoding.

use tracing::debug;

use crate::error::ValueError;

use super::ifd::{Ifd, IfdEntry};
use super::tags::{FieldType, TiffTag, COMPRESSION_NONE, PLANAR_SEPARATE};
use super::validation::{Findings, Location, ViolationCode};
use super::values::ValueReader;

/// How a directory organizes its image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Organization {
    Strips,
    Tiles,
}

impl Organization {
    fn tags(self) -> (TiffTag, TiffTag) {
        match self {
            Organization::Strips => (TiffTag::StripOffsets, TiffTag::StripByteCounts),
            Organization::Tiles => (TiffTag::TileOffsets, TiffTag::TileByteCounts),
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Organization::Strips => "strip",
            Organization::Tiles => "tile",
        }
    }
}

/// Offset/byte-count pairs of one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTable {
    pub organization: Organization,
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
}

/// Image dimensions that determine how many segments there should be.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    /// Width of one segment in pixels (image width for strips)
    segment_width: u64,
    /// Rows in one segment
    segment_rows: u64,
    /// Segments per plane
    segments_per_plane: u64,
    /// Blocks of `segment_width x segment_rows` pixels per plane
    blocks: u64,
}

/// Validates the strip/tile layout of image directories.
pub struct LayoutValidator<'a> {
    ifd: &'a Ifd,
    reader: ValueReader,
    file_size: u64,

    /// Location used for directory-level findings
    location: Location,
}

impl<'a> LayoutValidator<'a> {
    pub fn new(ifd: &'a Ifd, reader: ValueReader, file_size: u64, location: Location) -> Self {
        Self {
            ifd,
            reader,
            file_size,
            location,
        }
    }

    /// Run every layout check on the directory.
    pub fn validate(&self, findings: &mut Findings) {
        let Some(table) = self.read_segments(findings) else {
            return;
        };

        let pairs_match = self.check_array_lengths(&table, findings);
        self.check_ranges(&table, findings);
        self.check_overlaps(&table, findings);

        let Some(geometry) = self.geometry(table.organization, findings) else {
            return;
        };
        let planes = self.planes();

        let expected = geometry.segments_per_plane.checked_mul(planes);
        match expected {
            Some(expected) if expected == table.offsets.len() as u64 => {}
            Some(expected) => findings.violation(
                ViolationCode::SegmentCountMismatch,
                self.location,
                format!(
                    "image geometry implies {} {}s, {} declares {}",
                    expected,
                    table.organization.noun(),
                    table.organization.tags().0.name(),
                    table.offsets.len()
                ),
            ),
            None => findings.violation(
                ViolationCode::SegmentCountMismatch,
                self.location,
                format!(
                    "image geometry implies an unrepresentable number of {}s",
                    table.organization.noun()
                ),
            ),
        }

        if pairs_match {
            self.check_uncompressed_size(&table, geometry, findings);
        }
    }

    /// Locate and read the offset and byte-count arrays.
    ///
    /// Returns `None` when the layout is ambiguous or the arrays cannot be
    /// used; the reason is recorded unless an entry-level violation already
    /// covers it.
    pub fn read_segments(&self, findings: &mut Findings) -> Option<SegmentTable> {
        let organization = match (self.ifd.is_stripped(), self.ifd.is_tiled()) {
            (true, false) => Organization::Strips,
            (false, true) => Organization::Tiles,
            (true, true) => {
                findings.violation(
                    ViolationCode::AmbiguousLayout,
                    self.location,
                    "directory declares both strip and tile data tags",
                );
                return None;
            }
            (false, false) => {
                findings.violation(
                    ViolationCode::AmbiguousLayout,
                    self.location,
                    "directory declares neither strip nor tile data tags",
                );
                return None;
            }
        };

        let (offsets_tag, counts_tag) = organization.tags();
        let (offsets_entry, counts_entry) = match (
            self.ifd.get_entry_by_tag(offsets_tag),
            self.ifd.get_entry_by_tag(counts_tag),
        ) {
            (Some(o), Some(c)) => (o, c),
            (o, _) => {
                let missing = if o.is_none() { offsets_tag } else { counts_tag };
                findings.violation(
                    ViolationCode::AmbiguousLayout,
                    self.location,
                    format!("{} is missing", missing.name()),
                );
                return None;
            }
        };

        let offsets = self.read_array(offsets_tag, offsets_entry, findings)?;
        let byte_counts = self.read_array(counts_tag, counts_entry, findings)?;

        Some(SegmentTable {
            organization,
            offsets,
            byte_counts,
        })
    }

    fn read_array(
        &self,
        tag: TiffTag,
        entry: &IfdEntry,
        findings: &mut Findings,
    ) -> Option<Vec<u64>> {
        if !matches!(
            entry.field_type,
            Some(FieldType::Short | FieldType::Long | FieldType::Long8)
        ) && entry.value.bytes().is_some()
        {
            findings.violation(
                ViolationCode::LayoutTagType,
                Location::Offset(entry.entry_offset),
                format!(
                    "{} has type {}, expected SHORT, LONG or LONG8",
                    tag.name(),
                    entry.field_type_raw
                ),
            );
            return None;
        }

        match self.reader.read_u64_array(entry) {
            Ok(values) => Some(values),
            Err(e) => {
                // Unreadable values were already reported by the entry check.
                debug!(tag = tag.as_u16(), error = %e, "skipping layout checks");
                None
            }
        }
    }

    fn check_array_lengths(&self, table: &SegmentTable, findings: &mut Findings) -> bool {
        if table.offsets.len() == table.byte_counts.len() {
            return true;
        }
        let (offsets_tag, counts_tag) = table.organization.tags();
        findings.violation(
            ViolationCode::ArrayLengthMismatch,
            self.location,
            format!(
                "{} has {} values, {} has {}",
                offsets_tag.name(),
                table.offsets.len(),
                counts_tag.name(),
                table.byte_counts.len()
            ),
        );
        false
    }

    /// Every `[offset, offset + count)` must lie inside the file.
    fn check_ranges(&self, table: &SegmentTable, findings: &mut Findings) {
        let pairs = table.offsets.iter().zip(&table.byte_counts).enumerate();
        for (index, (&offset, &count)) in pairs {
            if count == 0 {
                continue;
            }
            let in_bounds = matches!(offset.checked_add(count), Some(end) if end <= self.file_size);
            if !in_bounds {
                findings.violation(
                    ViolationCode::DataOutOfBounds,
                    Location::Segment {
                        ifd_offset: self.ifd.offset,
                        index,
                    },
                    format!(
                        "{} {} covers {} bytes at offset {}, file size is {}",
                        table.organization.noun(),
                        index,
                        count,
                        offset,
                        self.file_size
                    ),
                );
            }
        }
    }

    /// Partially overlapping ranges are suspicious but legal.
    fn check_overlaps(&self, table: &SegmentTable, findings: &mut Findings) {
        let mut ranges: Vec<(u64, u64)> = table
            .offsets
            .iter()
            .zip(&table.byte_counts)
            .filter(|(_, &count)| count > 0)
            .filter_map(|(&offset, &count)| Some((offset, offset.checked_add(count)?)))
            .collect();
        ranges.sort_unstable();
        // Identical ranges are shared data, which some writers use on purpose.
        ranges.dedup();

        let overlaps = ranges.windows(2).filter(|w| w[0].1 > w[1].0).count();
        if overlaps > 0 {
            findings.warning(
                self.location,
                format!(
                    "{} pair(s) of {} data ranges partially overlap",
                    overlaps,
                    table.organization.noun()
                ),
            );
        }
    }

    /// Image geometry, or `None` if required tags are missing or unusable.
    fn geometry(&self, organization: Organization, findings: &mut Findings) -> Option<Geometry> {
        let mut required = vec![TiffTag::ImageWidth, TiffTag::ImageLength];
        if organization == Organization::Tiles {
            required.extend([TiffTag::TileWidth, TiffTag::TileLength]);
        }

        let missing: Vec<&str> = required
            .iter()
            .filter(|&&tag| self.ifd.get_entry_by_tag(tag).is_none())
            .map(|tag| tag.name())
            .collect();
        if !missing.is_empty() {
            findings.violation(
                ViolationCode::MissingRequiredTag,
                self.location,
                format!("missing {}", missing.join(", ")),
            );
            return None;
        }

        // Presence was checked above; `??` stops on an unusable value
        let width = self.usable_scalar(TiffTag::ImageWidth, findings)??;
        let length = self.usable_scalar(TiffTag::ImageLength, findings)??;

        match organization {
            Organization::Strips => {
                let rows_per_strip = match self.usable_scalar(TiffTag::RowsPerStrip, findings)? {
                    Some(0) | None => length,
                    Some(rows) => rows.min(length),
                };
                let strips = if length == 0 {
                    0
                } else {
                    length.div_ceil(rows_per_strip)
                };
                Some(Geometry {
                    segment_width: width,
                    segment_rows: length,
                    segments_per_plane: strips,
                    blocks: 1,
                })
            }
            Organization::Tiles => {
                let tile_width = self.usable_scalar(TiffTag::TileWidth, findings)??;
                let tile_length = self.usable_scalar(TiffTag::TileLength, findings)??;

                if tile_width == 0 || tile_length == 0 {
                    findings.violation(
                        ViolationCode::InvalidTileDimensions,
                        self.location,
                        format!("tile dimensions {}x{} cannot be zero", tile_width, tile_length),
                    );
                    return None;
                }
                if tile_width % 16 != 0 || tile_length % 16 != 0 {
                    findings.warning(
                        self.location,
                        format!(
                            "tile dimensions {}x{} are not multiples of 16",
                            tile_width, tile_length
                        ),
                    );
                }

                let tiles = width
                    .div_ceil(tile_width)
                    .checked_mul(length.div_ceil(tile_length))?;
                Some(Geometry {
                    segment_width: tile_width,
                    segment_rows: tile_length,
                    segments_per_plane: tiles,
                    blocks: tiles,
                })
            }
        }
    }

    /// For uncompressed data the byte counts must cover the decoded size.
    fn check_uncompressed_size(
        &self,
        table: &SegmentTable,
        geometry: Geometry,
        findings: &mut Findings,
    ) {
        let compression = match self.usable_scalar(TiffTag::Compression, findings) {
            Some(value) => value.unwrap_or(COMPRESSION_NONE),
            None => return,
        };
        if compression != COMPRESSION_NONE {
            return;
        }

        let samples = self.samples_per_pixel();
        let bits = match self.ifd.get_entry_by_tag(TiffTag::BitsPerSample) {
            None => vec![1],
            Some(entry) => match self.reader.read_u64_array(entry) {
                Ok(bits) if !bits.is_empty() => bits,
                _ => return,
            },
        };

        let width = geometry.segment_width as u128;
        let row_bytes = if self.is_planar() {
            sum_per_sample(&bits, samples, |b| (width * b).div_ceil(8))
        } else {
            sum_per_sample(&bits, samples, |b| b).and_then(|pixel_bits| {
                pixel_bits.checked_mul(width).map(|row_bits| row_bits.div_ceil(8))
            })
        };

        let needed = row_bytes
            .and_then(|n| n.checked_mul(geometry.segment_rows as u128))
            .and_then(|n| n.checked_mul(geometry.blocks as u128));
        let declared: u128 = table.byte_counts.iter().map(|&c| c as u128).sum();

        match needed {
            Some(needed) if declared >= needed => {}
            Some(needed) => findings.violation(
                ViolationCode::ByteCountMismatch,
                self.location,
                format!(
                    "uncompressed image needs {} bytes, {} byte counts sum to {}",
                    needed,
                    table.organization.noun(),
                    declared
                ),
            ),
            None => findings.violation(
                ViolationCode::ByteCountMismatch,
                self.location,
                "uncompressed image size overflows",
            ),
        }
    }

    /// First value of `tag`: `Some(None)` when the tag is absent, `None`
    /// when it is present but cannot be read.
    ///
    /// Entries whose value never resolved were already reported by the entry
    /// checks; any other read failure is a [`ViolationCode::LayoutTagType`].
    fn usable_scalar(&self, tag: TiffTag, findings: &mut Findings) -> Option<Option<u64>> {
        match self.scalar(tag) {
            None => Some(None),
            Some(Ok(value)) => Some(Some(value)),
            Some(Err(ValueError::Unavailable { .. })) => None,
            Some(Err(e)) => {
                findings.violation(
                    ViolationCode::LayoutTagType,
                    self.location,
                    format!("{} cannot be used: {}", tag.name(), e),
                );
                None
            }
        }
    }

    fn scalar(&self, tag: TiffTag) -> Option<Result<u64, ValueError>> {
        self.ifd
            .get_entry_by_tag(tag)
            .map(|entry| self.reader.read_u64(entry))
    }

    fn samples_per_pixel(&self) -> u64 {
        match self.scalar(TiffTag::SamplesPerPixel) {
            Some(Ok(samples)) if samples > 0 => samples,
            _ => 1,
        }
    }

    fn is_planar(&self) -> bool {
        matches!(self.scalar(TiffTag::PlanarConfiguration), Some(Ok(PLANAR_SEPARATE)))
    }

    fn planes(&self) -> u64 {
        if self.is_planar() {
            self.samples_per_pixel()
        } else {
            1
        }
    }
}

/// Sum `f(bits)` over `samples` samples.
///
/// A single BitsPerSample value applies to every sample; a short array
/// repeats its last value.
fn sum_per_sample(bits: &[u64], samples: u64, f: impl Fn(u128) -> u128) -> Option<u128> {
    let listed = bits.len().min(samples as usize);
    let last = f(*bits.last()? as u128);
    let head = bits[..listed]
        .iter()
        .try_fold(0u128, |acc, &b| acc.checked_add(f(b as u128)))?;
    let rest = (samples - listed as u64) as u128;
    head.checked_add(last.checked_mul(rest)?)
}

// =============================================================================
// Tests
// =============================================================================
