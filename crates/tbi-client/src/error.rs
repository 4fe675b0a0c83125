//! Client-facing error type.
//!
//! Grounded on `lockframe-server::server_error::ServerError`'s shape: a thin
//! enum that wraps the shared core error and adds the one thing only this
//! side of the wire can detect.

use thiserror::Error;

use tbi_core::TbiError;

/// Errors returned by `tbi-client` operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Propagated from `tbi-core` (config/format/IO/alloc/state).
    #[error(transparent)]
    Core(#[from] TbiError),

    /// The server rejected or never acknowledged the handshake.
    #[error("handshake rejected by server: {0}")]
    HandshakeRejected(String),
}
