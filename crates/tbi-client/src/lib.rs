//! Blocking TCP client for the telemetry binary interface (TBI).
//!
//! Wraps a `tbi-core` [`Context`](tbi_core::Context) with a
//! `std::net::TcpStream` transport and the client-side scheduler
//! (SPEC_FULL §4.7). The driver loop — repeatedly calling
//! [`Client::client_process`] — is the caller's responsibility; this crate
//! never spawns a thread (SPEC_FULL §5).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod config;
mod error;
mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use error::ClientError;
