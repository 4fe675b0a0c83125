//! Sans-IO protocol core for the telemetry binary interface (TBI).
//!
//! This crate holds every piece of TBI that doesn't touch a socket: bit-level
//! packing, the schema checksum, per-type message queues, the RTM/DCB codecs,
//! and the [`Context`] that ties them together. `tbi-client` and `tbi-server`
//! each wrap a `Context` with an actual transport and a scheduler loop.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bitio;
pub mod context;
pub mod crc16;
pub mod error;
pub mod msgbuffer;
pub mod schema;
pub mod serializer;

pub use context::{Callback, Context};
pub use error::TbiError;
pub use msgbuffer::MsgContext;
pub use schema::{MessageSchema, SchemaRegistry, MAX_MSGTYPES};
pub use serializer::{
    decode_native_record, deserialize_dcb, deserialize_rtm, encode_native_record, serialize_dcb,
    serialize_rtm,
};
