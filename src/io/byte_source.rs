use bytes::Bytes;

use crate::error::IoError;

/// Read-only view of a whole file held in memory.
///
/// Every access the validator makes goes through [`ByteSource::read`], which
/// refuses any range that ends past the file or overflows a 64-bit offset.
/// Cloning is cheap: the underlying buffer is reference counted.
#[derive(Debug, Clone)]
pub struct ByteSource {
    data: Bytes,
}

impl ByteSource {
    /// Wrap a file buffer.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns a zero-copy slice of the buffer, or a bounds error when
    /// `offset + len` overflows or exceeds the file length.
    pub fn read(&self, offset: u64, len: u64) -> Result<Bytes, IoError> {
        let end = offset.checked_add(len).ok_or(IoError::RangeOverflow {
            offset,
            requested: len,
        })?;

        if end > self.size() {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len,
                size: self.size(),
            });
        }

        // Both bounds are <= data.len(), so they fit in usize.
        Ok(self.data.slice(offset as usize..end as usize))
    }

    /// Check that `[offset, offset + len)` lies inside the file without copying.
    pub fn check_range(&self, offset: u64, len: u64) -> Result<(), IoError> {
        self.read(offset, len).map(|_| ())
    }

    /// Total size of the file in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the file is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// =============================================================================
// Endian helpers
// =============================================================================
//
// Callers pass slices from `ByteSource::read`, which already have the exact
// length. A shorter slice panics.

macro_rules! endian_reader {
    ($name:ident, $ty:ty, $from:ident) => {
        #[doc = concat!("Decode a `", stringify!($ty), "` with `", stringify!($from), "`.")]
        #[inline]
        pub fn $name(bytes: &[u8]) -> $ty {
            const N: usize = std::mem::size_of::<$ty>();
            let mut buf = [0u8; N];
            buf.copy_from_slice(&bytes[..N]);
            <$ty>::$from(buf)
        }
    };
}

endian_reader!(read_u16_le, u16, from_le_bytes);
endian_reader!(read_u16_be, u16, from_be_bytes);
endian_reader!(read_u32_le, u32, from_le_bytes);
endian_reader!(read_u32_be, u32, from_be_bytes);
endian_reader!(read_u64_le, u64, from_le_bytes);
endian_reader!(read_u64_be, u64, from_be_bytes);
