//! TIFF header parsing.
//!
//! The header fixes the byte order and the offset width for the rest of the
//! file, so nothing else can be trusted until it parses.
//!
//! ```text
//!            classic (8 bytes)          BigTIFF (16 bytes)
//! 0..2       "II" | "MM"                "II" | "MM"
//! 2..4       42                         43
//! 4..8       first IFD offset (u32)     offset width = 8 (u16), reserved = 0 (u16)
//! 8..16      -                          first IFD offset (u64)
//! ```

use serde::Serialize;

use crate::error::TiffError;
use crate::io::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le, ByteSource,
};

/// Classic header length, also the prefix every file must have.
pub const TIFF_HEADER_SIZE: u64 = 8;

/// BigTIFF header length.
pub const BIGTIFF_HEADER_SIZE: u64 = 16;

const CLASSIC_VERSION: u16 = 42;
const BIGTIFF_VERSION: u16 = 43;

/// Endianness declared by the first two header bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// "II"
    LittleEndian,
    /// "MM"
    BigEndian,
}

impl ByteOrder {
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            Self::LittleEndian => read_u16_le(bytes),
            Self::BigEndian => read_u16_be(bytes),
        }
    }

    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            Self::LittleEndian => read_u32_le(bytes),
            Self::BigEndian => read_u32_be(bytes),
        }
    }

    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            Self::LittleEndian => read_u64_le(bytes),
            Self::BigEndian => read_u64_be(bytes),
        }
    }
}

/// What the header tells us about the rest of the file.
///
/// The first IFD offset is not checked here; an unreachable first directory
/// is a directory-chain problem, not a header problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    pub byte_order: ByteOrder,

    /// 64-bit offsets and counts
    pub is_bigtiff: bool,

    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse the header at the start of `source`.
    ///
    /// A file shorter than the header it announces is `FileTooSmall`; the
    /// remaining variants of [`TiffError`] name the offending field.
    pub fn read(source: &ByteSource) -> Result<Self, TiffError> {
        let too_small = |required| TiffError::FileTooSmall {
            required,
            actual: source.size(),
        };
        let prefix = source
            .read(0, TIFF_HEADER_SIZE)
            .map_err(|_| too_small(TIFF_HEADER_SIZE))?;

        let byte_order = match [prefix[0], prefix[1]] {
            [b'I', b'I'] => ByteOrder::LittleEndian,
            [b'M', b'M'] => ByteOrder::BigEndian,
            marker => return Err(TiffError::InvalidMagic(u16::from_le_bytes(marker))),
        };

        let version = byte_order.read_u16(&prefix[2..4]);
        let is_bigtiff = match version {
            CLASSIC_VERSION => false,
            BIGTIFF_VERSION => true,
            other => return Err(TiffError::InvalidVersion(other)),
        };

        if !is_bigtiff {
            return Ok(Self {
                byte_order,
                is_bigtiff,
                first_ifd_offset: u64::from(byte_order.read_u32(&prefix[4..8])),
            });
        }

        let offset_width = byte_order.read_u16(&prefix[4..6]);
        if offset_width != 8 {
            return Err(TiffError::InvalidBigTiffOffsetSize(offset_width));
        }
        let reserved = byte_order.read_u16(&prefix[6..8]);
        if reserved != 0 {
            return Err(TiffError::InvalidBigTiffReserved(reserved));
        }

        let first = source
            .read(TIFF_HEADER_SIZE, 8)
            .map_err(|_| too_small(BIGTIFF_HEADER_SIZE))?;
        Ok(Self {
            byte_order,
            is_bigtiff,
            first_ifd_offset: byte_order.read_u64(&first),
        })
    }

    #[inline]
    const fn width(&self, classic: u64, bigtiff: u64) -> u64 {
        if self.is_bigtiff {
            bigtiff
        } else {
            classic
        }
    }

    #[inline]
    pub const fn header_size(&self) -> u64 {
        self.width(TIFF_HEADER_SIZE, BIGTIFF_HEADER_SIZE)
    }

    /// Bytes per directory entry: tag, type, count and the value slot.
    #[inline]
    pub const fn ifd_entry_size(&self) -> u64 {
        self.width(12, 20)
    }

    /// Bytes of the entry count that opens a directory.
    #[inline]
    pub const fn ifd_count_size(&self) -> u64 {
        self.width(2, 8)
    }

    /// Bytes of the next-IFD link that closes a directory.
    #[inline]
    pub const fn ifd_next_offset_size(&self) -> u64 {
        self.width(4, 8)
    }

    /// Bytes of an entry's value slot. Values up to this size are inline.
    #[inline]
    pub const fn value_offset_size(&self) -> u64 {
        self.width(4, 8)
    }

    /// Bytes of an entry's count field.
    #[inline]
    pub const fn entry_count_field_size(&self) -> u64 {
        self.width(4, 8)
    }

    /// Decode an offset-width field.
    #[inline]
    pub fn read_offset(&self, bytes: &[u8]) -> u64 {
        if self.is_bigtiff {
            self.byte_order.read_u64(bytes)
        } else {
            u64::from(self.byte_order.read_u32(bytes))
        }
    }
}
