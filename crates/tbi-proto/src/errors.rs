//! Wire-level protocol errors.
//!
//! These are the errors that can be raised while parsing or building the
//! handshake frame and the flags/msgtype byte, before any schema-level
//! concerns (unknown msgtype, queue state, ...) come into play. Higher
//! layers (`tbi-core`) fold these into their own error taxonomy.

use thiserror::Error;

/// Result alias for `tbi-proto` operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding wire-level frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Handshake frame has the wrong length for its kind.
    #[error("handshake frame length mismatch: expected {expected}, got {actual}")]
    HandshakeLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Handshake magic bytes were not "TBI".
    #[error("handshake magic mismatch")]
    BadMagic,

    /// Handshake protocol version is not one this crate understands.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Byte value does not correspond to a known [`crate::FieldTag`].
    #[error("unknown field tag byte: {0:#04x}")]
    UnknownFieldTag(u8),

    /// Byte value does not correspond to a known [`crate::FrameFlags`].
    #[error("unknown frame flags nibble: {0:#03x}")]
    UnknownFlags(u8),
}
