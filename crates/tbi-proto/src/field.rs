//! Primitive field tags carried in a [`crate::MessageSchema`].
//!
//! Eight fixed tags, each with a fixed byte width and signedness. `TimeS` and
//! `TimeMs` are unsigned semantic aliases for `U32`/`U16` respectively — they
//! exist so a schema can self-document "this is a timestamp field" without
//! changing the wire representation.

use crate::errors::ProtocolError;

/// One primitive telemetry field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldTag {
    /// Seconds component of a timestamp, wire type `u32`.
    TimeS,
    /// Milliseconds component of a timestamp, wire type `u16`.
    TimeMs,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    I32,
}

impl FieldTag {
    /// All field tags, in wire-tag order. Used by tests and by callers that
    /// want to enumerate the type table.
    pub const ALL: [FieldTag; 8] = [
        FieldTag::TimeS,
        FieldTag::TimeMs,
        FieldTag::U8,
        FieldTag::I8,
        FieldTag::U16,
        FieldTag::I16,
        FieldTag::U32,
        FieldTag::I32,
    ];

    /// Byte width of this field on the wire and in a native record.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            FieldTag::TimeS | FieldTag::U32 | FieldTag::I32 => 4,
            FieldTag::TimeMs | FieldTag::U16 | FieldTag::I16 => 2,
            FieldTag::U8 | FieldTag::I8 => 1,
        }
    }

    /// Whether this field's native representation is signed.
    ///
    /// `TimeS`/`TimeMs` are unsigned aliases even though their underlying
    /// width matches a signed variant.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, FieldTag::I8 | FieldTag::I16 | FieldTag::I32)
    }

    /// Byte width in bits, the field's natural maximum for `min_bits`.
    #[must_use]
    pub const fn width_bits(self) -> u32 {
        (self.width() as u32) * 8
    }

    /// Wire tag byte for this field, used when hashing a schema into its
    /// checksum.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            FieldTag::TimeS => 0,
            FieldTag::TimeMs => 1,
            FieldTag::U8 => 2,
            FieldTag::I8 => 3,
            FieldTag::U16 => 4,
            FieldTag::I16 => 5,
            FieldTag::U32 => 6,
            FieldTag::I32 => 7,
        }
    }

    /// Parse a wire tag byte back into a `FieldTag`.
    pub fn from_u8(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0 => Ok(FieldTag::TimeS),
            1 => Ok(FieldTag::TimeMs),
            2 => Ok(FieldTag::U8),
            3 => Ok(FieldTag::I8),
            4 => Ok(FieldTag::U16),
            5 => Ok(FieldTag::I16),
            6 => Ok(FieldTag::U32),
            7 => Ok(FieldTag::I32),
            other => Err(ProtocolError::UnknownFieldTag(other)),
        }
    }
}
