//! Client configuration.
//!
//! Grounded on `lockframe-client`'s plain `Default`-able config structs: no
//! file or environment loader (SPEC_FULL §10 — that's out of scope for this
//! library).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Configuration for [`crate::Client::client_init`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the server to connect to.
    pub server_addr: SocketAddr,
    /// Maximum frame size in bytes. Overrides the protocol default
    /// ([`tbi_proto::MTU`]) for [`crate::transport::TcpClient`]'s scratch
    /// buffer and `send_frame`'s size check (SPEC_FULL §10).
    pub mtu: usize,
    /// Applied to the connected socket via `TcpStream::set_read_timeout`.
    /// `None` blocks indefinitely (SPEC_FULL §5's default cooperative
    /// blocking model).
    pub read_timeout: Option<Duration>,
    /// Applied to the connected socket via `TcpStream::set_write_timeout`.
    pub write_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    /// Default address per SPEC_FULL §6: TCP, port 8000, `127.0.0.1`, MTU
    /// 1500, no read/write timeout.
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8000),
            mtu: tbi_proto::MTU,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
