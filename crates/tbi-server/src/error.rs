//! Server-facing error type.
//!
//! Grounded on `lockframe-server::server_error::ServerError`'s shape: a thin
//! enum that wraps the shared core error and adds the one thing only this
//! side of the wire can detect.

use thiserror::Error;

use tbi_core::TbiError;

/// Errors returned by `tbi-server` operations.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Propagated from `tbi-core` (config/format/IO/alloc/state).
    #[error(transparent)]
    Core(#[from] TbiError),

    /// A client's handshake failed validation; the connection was closed
    /// without a reply (SPEC_FULL §4.5).
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),
}
