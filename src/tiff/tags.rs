//! Field types and the handful of tags that locate data.
//!
//! Every other tag is validated generically by its type and count; only the
//! tags listed here carry structural meaning for the walk.

/// Declare a `u16`-backed enum with a checked conversion from the raw code.
macro_rules! u16_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $code, )+
        }

        impl $name {
            /// `None` for codes this crate does not know.
            pub fn from_u16(value: u16) -> Option<Self> {
                match value {
                    $( $code => Some(Self::$variant), )+
                    _ => None,
                }
            }

            #[inline]
            pub const fn as_u16(self) -> u16 {
                self as u16
            }

            /// Name used in violation details.
            pub const fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }
    };
}

u16_enum! {
    /// Entry value encodings. The element size decides whether a value sits
    /// in the entry's slot or at an offset.
    pub enum FieldType {
        Byte = 1 => "BYTE",
        Ascii = 2 => "ASCII",
        Short = 3 => "SHORT",
        Long = 4 => "LONG",
        /// Two LONGs
        Rational = 5 => "RATIONAL",
        SByte = 6 => "SBYTE",
        Undefined = 7 => "UNDEFINED",
        SShort = 8 => "SSHORT",
        SLong = 9 => "SLONG",
        /// Two SLONGs
        SRational = 10 => "SRATIONAL",
        Float = 11 => "FLOAT",
        Double = 12 => "DOUBLE",
        /// 32-bit directory offset
        Ifd = 13 => "IFD",
        Long8 = 16 => "LONG8",
        SLong8 = 17 => "SLONG8",
        /// 64-bit directory offset
        Ifd8 = 18 => "IFD8",
    }
}

impl FieldType {
    /// Bytes per element.
    #[inline]
    pub const fn size_in_bytes(self) -> u64 {
        use FieldType::*;
        match self {
            Byte | Ascii | SByte | Undefined => 1,
            Short | SShort => 2,
            Long | SLong | Float | Ifd => 4,
            Rational | SRational | Double | Long8 | SLong8 | Ifd8 => 8,
        }
    }

    #[inline]
    pub const fn is_bigtiff_only(self) -> bool {
        matches!(self, FieldType::Long8 | FieldType::SLong8 | FieldType::Ifd8)
    }

    /// Whether values can be read as unsigned offsets or counts.
    #[inline]
    pub const fn is_unsigned_integer(self) -> bool {
        use FieldType::*;
        matches!(self, Byte | Short | Long | Ifd | Long8 | Ifd8)
    }

    /// Total size of `count` elements, `None` on overflow.
    #[inline]
    pub fn byte_size(self, count: u64) -> Option<u64> {
        count.checked_mul(self.size_in_bytes())
    }
}

u16_enum! {
    /// Tags needed to find image data or nested directories.
    pub enum TiffTag {
        ImageWidth = 256 => "ImageWidth",
        ImageLength = 257 => "ImageLength",
        /// One value per sample
        BitsPerSample = 258 => "BitsPerSample",
        Compression = 259 => "Compression",
        StripOffsets = 273 => "StripOffsets",
        SamplesPerPixel = 277 => "SamplesPerPixel",
        RowsPerStrip = 278 => "RowsPerStrip",
        StripByteCounts = 279 => "StripByteCounts",
        PlanarConfiguration = 284 => "PlanarConfiguration",
        TileWidth = 322 => "TileWidth",
        TileLength = 323 => "TileLength",
        TileOffsets = 324 => "TileOffsets",
        TileByteCounts = 325 => "TileByteCounts",
        /// Thumbnails and reduced resolutions
        SubIfds = 330 => "SubIFDs",
        ExifIfd = 34665 => "ExifIFD",
        GpsIfd = 34853 => "GPSInfo",
        InteropIfd = 40965 => "InteroperabilityIFD",
    }
}

impl TiffTag {
    /// Tags whose values point at nested directories.
    pub const SUB_DIRECTORY_TAGS: [TiffTag; 4] = [
        TiffTag::SubIfds,
        TiffTag::ExifIfd,
        TiffTag::GpsIfd,
        TiffTag::InteropIfd,
    ];

    /// EXIF, GPS and interoperability directories hold metadata only.
    #[inline]
    pub const fn points_at_images(self) -> bool {
        matches!(self, TiffTag::SubIfds)
    }
}

/// Compression value for uncompressed data, also the default when the tag is
/// absent. Only uncompressed data has a size we can predict.
pub const COMPRESSION_NONE: u64 = 1;

/// PlanarConfiguration value for separate sample planes.
pub const PLANAR_SEPARATE: u64 = 2;
