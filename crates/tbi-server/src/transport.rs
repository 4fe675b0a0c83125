//! Blocking TCP channel for the server side.
//!
//! Grounded on `lockframe-client::transport::ConnectedClient`'s role (thin
//! I/O layer, protocol logic stays in the Sans-IO core), but using
//! `std::net::TcpListener`/`TcpStream` directly: SPEC_FULL §5 mandates a
//! single-threaded, cooperative, blocking model, which rules out the
//! teacher's async/QUIC transport.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};

use bytes::BytesMut;
use tbi_core::{Context, TbiError};
use tbi_proto::{ClientHandshake, ServerHandshakeAck, CLIENT_HANDSHAKE_LEN};
use tracing::{debug, warn};

use crate::{config::ServerConfig, error::ServerError};

/// A bound listener, plus (once a client has connected) the accepted stream
/// and its reused scratch buffer (SPEC_FULL §3, `Channel.scratch_buf`).
pub struct TcpServer {
    listener: TcpListener,
    stream: Option<TcpStream>,
    scratch: BytesMut,
    read_timeout: Option<std::time::Duration>,
    write_timeout: Option<std::time::Duration>,
}

impl TcpServer {
    /// Bind a listening socket. Does not accept a connection yet.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Core`] if the bind fails.
    pub fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr).map_err(TbiError::Io)?;
        debug!(bind_addr = %config.bind_addr, "listening");
        let mut scratch = BytesMut::with_capacity(config.mtu);
        scratch.resize(config.mtu, 0);
        Ok(Self {
            listener,
            stream: None,
            scratch,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        })
    }

    /// The address this listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Core`] if the underlying syscall fails.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(|e| TbiError::Io(e).into())
    }

    /// Accept one connection and validate its handshake against `ctx`'s
    /// registered schema. On any mismatch the connection is closed without a
    /// reply (SPEC_FULL §4.5).
    ///
    /// Returns the client's `start_ts_ms`, used to seed every context's
    /// `last_sent_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Core`] on accept/IO failure, or
    /// [`ServerError::HandshakeRejected`] if magic/version/schema
    /// version/checksum disagree.
    pub fn accept_and_handshake(&mut self, ctx: &Context) -> Result<u64, ServerError> {
        let (mut stream, peer) = self.listener.accept().map_err(TbiError::Io)?;
        stream.set_read_timeout(self.read_timeout).map_err(TbiError::Io)?;
        stream.set_write_timeout(self.write_timeout).map_err(TbiError::Io)?;
        debug!(%peer, "accepted connection");

        let mut buf = [0u8; CLIENT_HANDSHAKE_LEN];
        if let Err(err) = stream.read_exact(&mut buf) {
            let _ = stream.shutdown(Shutdown::Both);
            return Err(TbiError::Io(err).into());
        }

        let handshake = match ClientHandshake::decode(&buf) {
            Ok(h) => h,
            Err(err) => {
                warn!(%peer, %err, "handshake decode failed, closing without reply");
                let _ = stream.shutdown(Shutdown::Both);
                return Err(ServerError::HandshakeRejected(err.to_string()));
            },
        };

        if handshake.schema_version != ctx.schema_version()
            || handshake.schema_checksum != ctx.schema_checksum()
        {
            warn!(%peer, "handshake schema mismatch, closing without reply");
            let _ = stream.shutdown(Shutdown::Both);
            return Err(ServerError::HandshakeRejected(
                "schema version or checksum mismatch".to_string(),
            ));
        }

        stream.write_all(&ServerHandshakeAck::encode()).map_err(TbiError::Io)?;
        self.stream = Some(stream);
        debug!(%peer, "handshake accepted");
        Ok(handshake.start_ts_ms)
    }

    /// Block until one frame arrives. Returns the frame bytes as received —
    /// whatever one `read` call returns is treated as exactly one logical
    /// frame (SPEC_FULL §4.5/§9, D5: there is no length prefix on the wire).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Core`] with [`TbiError::State`] if no
    /// connection has been accepted yet, or with [`TbiError::Io`] if the
    /// peer closed the connection or the read failed.
    pub fn read_one_frame(&mut self) -> Result<Vec<u8>, ServerError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TbiError::State("read_one_frame called before accept".to_string()))?;
        let n = stream.read(&mut self.scratch).map_err(TbiError::Io)?;
        if n == 0 {
            return Err(TbiError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "peer closed connection",
            ))
            .into());
        }
        Ok(self.scratch[..n].to_vec())
    }

    /// Close the accepted connection, if any. In-flight blocking I/O returns
    /// an error after this call (SPEC_FULL §5).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Core`] if the underlying shutdown call fails.
    pub fn close(&mut self) -> Result<(), ServerError> {
        if let Some(stream) = self.stream.take() {
            stream.shutdown(Shutdown::Both).map_err(TbiError::Io)?;
        }
        Ok(())
    }
}
