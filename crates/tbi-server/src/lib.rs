//! Blocking TCP server for the telemetry binary interface (TBI).
//!
//! Wraps a `tbi-core` [`Context`](tbi_core::Context) with a
//! `std::net::TcpListener`/`TcpStream` transport and the server-side
//! receive/dispatch loop (SPEC_FULL §4.8). The driver loop — alternating
//! [`Server::server_receive_blocking`] and [`Server::server_process`] — is
//! the caller's responsibility; this crate never spawns a thread (SPEC_FULL
//! §5).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod driver;
mod error;
mod transport;

pub use config::ServerConfig;
pub use driver::Server;
pub use error::ServerError;
