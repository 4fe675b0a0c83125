//! `TbiError`: the taxonomy from SPEC_FULL §7, shared by client and server.
//!
//! Grounded on `lockframe-core::error::ConnectionError` — a `thiserror` enum
//! per failure category, with `From` conversions at each boundary so callers
//! only ever match on this one type.

use thiserror::Error;

use tbi_proto::ProtocolError;

/// Errors raised by `tbi-core` and propagated up through `tbi-client` /
/// `tbi-server`.
#[derive(Error, Debug)]
pub enum TbiError {
    /// Schema registration or scheduling referenced a msgtype or field table
    /// that is invalid: unknown msgtype at `schedule`, duplicate msgtype at
    /// registration, or an oversize field table.
    #[error("configuration error: {0}")]
    Config(String),

    /// A received frame disagreed with the schema: wrong length, flag/msgtype
    /// mismatch, or a handshake magic/version/checksum mismatch.
    #[error("format error: {0}")]
    Format(String),

    /// The underlying byte-stream failed: connect/bind/listen/accept/read/
    /// write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal allocation failed. Unreachable in practice under Rust's
    /// allocator (an OOM aborts the process), modeled so the taxonomy stays
    /// exhaustive against the source's error categories.
    #[error("allocation error: {0}")]
    Alloc(String),

    /// An operation was invoked in the wrong role (a client-only operation on
    /// a server context or vice versa), or before `client_init`/`server_init`.
    #[error("state error: {0}")]
    State(String),
}

impl From<ProtocolError> for TbiError {
    fn from(err: ProtocolError) -> Self {
        Self::Format(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        let tbi_err: TbiError = io_err.into();
        assert!(matches!(tbi_err, TbiError::Io(_)));
    }

    #[test]
    fn protocol_error_becomes_format_error() {
        let proto_err = ProtocolError::BadMagic;
        let tbi_err: TbiError = proto_err.into();
        assert!(matches!(tbi_err, TbiError::Format(_)));
    }
}
