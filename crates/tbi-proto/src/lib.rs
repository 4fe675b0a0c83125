//! Wire-level types for the telemetry binary interface (TBI).
//!
//! This crate is pure data: field tags, the flags/msgtype byte, and the
//! handshake frames. It knows nothing about schemas, queues, or sockets —
//! those live in `tbi-core`, `tbi-client`, and `tbi-server`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod field;
pub mod frame;
pub mod handshake;

pub use errors::{ProtocolError, Result};
pub use field::FieldTag;
pub use frame::{pack_byte0, unpack_byte0, FrameFlags, MTU};
pub use handshake::{
    ClientHandshake, ServerHandshakeAck, CLIENT_HANDSHAKE_LEN, MAGIC, PROTOCOL_VERSION,
    SERVER_ACK_LEN,
};
