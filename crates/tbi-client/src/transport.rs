//! Blocking TCP channel for the client side.
//!
//! Grounded on `lockframe-client::transport::ConnectedClient`'s role (a thin
//! layer that does I/O while protocol logic stays in the Sans-IO core), but
//! using `std::net::TcpStream` directly instead of QUIC: SPEC_FULL §5
//! mandates a single-threaded, cooperative, blocking model with no spawned
//! tasks, which rules out the teacher's async transport.

use std::io::{Read, Write};
use std::net::TcpStream;

use bytes::BytesMut;
use tbi_proto::{ClientHandshake, ServerHandshakeAck};
use tracing::{debug, warn};

use crate::{config::ClientConfig, error::ClientError};

/// An established connection to a server, plus the reused scratch buffer
/// every frame is written through (SPEC_FULL §3, `Channel.scratch_buf`).
pub struct TcpClient {
    stream: TcpStream,
    scratch: BytesMut,
}

impl TcpClient {
    /// Connect, perform the client handshake, and validate the server's ack.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Core`] on connect/write/read failure, or
    /// [`ClientError::HandshakeRejected`] if the ack is malformed.
    pub fn connect(config: &ClientConfig, handshake: ClientHandshake) -> Result<Self, ClientError> {
        let server_addr = config.server_addr;
        debug!(%server_addr, "connecting to server");
        let mut stream = TcpStream::connect(server_addr).map_err(tbi_core::TbiError::Io)?;
        stream.set_read_timeout(config.read_timeout).map_err(tbi_core::TbiError::Io)?;
        stream.set_write_timeout(config.write_timeout).map_err(tbi_core::TbiError::Io)?;

        let encoded = handshake.encode();
        stream.write_all(&encoded).map_err(tbi_core::TbiError::Io)?;

        let mut ack_buf = [0u8; tbi_proto::SERVER_ACK_LEN];
        stream.read_exact(&mut ack_buf).map_err(tbi_core::TbiError::Io)?;
        ServerHandshakeAck::decode(&ack_buf).map_err(|e| {
            warn!(error = %e, "handshake ack rejected");
            ClientError::HandshakeRejected(e.to_string())
        })?;

        debug!("handshake complete");
        let mut scratch = BytesMut::with_capacity(config.mtu);
        scratch.resize(config.mtu, 0);
        Ok(Self { stream, scratch })
    }

    /// Write one complete frame to the server. One TCP write per frame
    /// (SPEC_FULL §4.5 — no length prefix).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Core`] if the frame exceeds MTU or the write
    /// fails.
    pub fn send_frame(&mut self, frame: &[u8]) -> Result<(), ClientError> {
        if frame.len() > self.scratch.len() {
            return Err(tbi_core::TbiError::Format(format!(
                "frame length {} exceeds MTU {}",
                frame.len(),
                self.scratch.len()
            ))
            .into());
        }
        self.scratch[..frame.len()].copy_from_slice(frame);
        self.stream.write_all(&self.scratch[..frame.len()]).map_err(tbi_core::TbiError::Io)?;
        Ok(())
    }

    /// Shut down the connection. In-flight blocking I/O on this stream
    /// returns an error after this call (SPEC_FULL §5).
    pub fn close(&mut self) -> Result<(), ClientError> {
        self.stream
            .shutdown(std::net::Shutdown::Both)
            .map_err(tbi_core::TbiError::Io)
            .map_err(ClientError::from)
    }
}
