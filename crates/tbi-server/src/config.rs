//! Server configuration.
//!
//! Grounded on `lockframe-server::driver::ServerConfig`: a plain `Default`-
//! able struct, no file or environment loader (SPEC_FULL §10).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Configuration for [`crate::Server::server_init`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind and listen on.
    pub bind_addr: SocketAddr,
    /// Maximum frame size in bytes. Overrides the protocol default
    /// ([`tbi_proto::MTU`]) for [`crate::transport::TcpServer`]'s scratch
    /// buffer (SPEC_FULL §10).
    pub mtu: usize,
    /// Applied to the accepted socket via `TcpStream::set_read_timeout`.
    /// `None` blocks indefinitely (SPEC_FULL §5's default cooperative
    /// blocking model).
    pub read_timeout: Option<Duration>,
    /// Applied to the accepted socket via `TcpStream::set_write_timeout`.
    pub write_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    /// Default address per SPEC_FULL §6: TCP, port 8000, `127.0.0.1`, MTU
    /// 1500, no read/write timeout.
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8000),
            mtu: tbi_proto::MTU,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
