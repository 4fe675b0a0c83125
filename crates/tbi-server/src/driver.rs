//! The server's top-level handle: schema registration, handshake, and the
//! receive/dispatch loop.
//!
//! Grounded on SPEC_FULL §4.6/§4.8 and, for the overall shape of "bundle
//! Sans-IO state with connection handling", on
//! `lockframe-server::driver::ServerDriver`.

use tbi_core::{Context, MessageSchema, TbiError};
use tbi_proto::{frame, FrameFlags};
use tracing::{trace, warn};

use crate::{config::ServerConfig, error::ServerError, transport::TcpServer};

/// A telemetry server: registered schemas plus (once a client has
/// connected) a live TCP channel and the queues fed by
/// [`Server::receive_blocking`].
pub struct Server {
    ctx: Context,
    config: ServerConfig,
    transport: Option<TcpServer>,
}

impl Server {
    /// Create a server for the given schema version. Register schemas with
    /// [`Server::register_schema`] before [`Server::server_init`].
    #[must_use]
    pub fn new(schema_version: u8, config: ServerConfig) -> Self {
        Self { ctx: Context::new(schema_version), config, transport: None }
    }

    /// Register one message schema. Must precede [`Server::server_init`]
    /// (SPEC_FULL §4.6).
    ///
    /// # Errors
    ///
    /// See [`tbi_core::Context::register_schema`].
    pub fn register_schema(&mut self, entry: MessageSchema) -> Result<(), ServerError> {
        self.ctx.register_schema(entry).map_err(Into::into)
    }

    /// Register the global decode callback, taking priority over any
    /// per-msgtype callback (SPEC_FULL §4.8).
    pub fn register_global_callback(&mut self, cb: impl FnMut(u8, Vec<u8>) + 'static) {
        self.ctx.register_global_callback(cb);
    }

    /// Register a decode callback for one msgtype.
    pub fn register_msg_callback(&mut self, msgtype: u8, cb: impl FnMut(u8, Vec<u8>) + 'static) {
        self.ctx.register_msg_callback(msgtype, cb);
    }

    /// Bind the listening socket without blocking on an incoming
    /// connection, and return the address it bound to. Useful for tests and
    /// callers that configure `bind_addr` with an ephemeral port (`:0`) and
    /// need to learn the real port before a client can connect.
    ///
    /// Calling this before [`Server::server_init`] is optional: `server_init`
    /// binds automatically if no listener exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Core`] if the bind fails.
    pub fn listen(&mut self) -> Result<std::net::SocketAddr, ServerError> {
        let transport = TcpServer::bind(&self.config)?;
        let addr = transport.local_addr()?;
        self.transport = Some(transport);
        Ok(addr)
    }

    /// Accept one client, validate its handshake, and seed every context's
    /// `last_sent_ms` with the client's `start_ts_ms` (SPEC_FULL §4.6).
    /// Binds the listening socket first if [`Server::listen`] hasn't already
    /// been called.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Core`] on bind/accept/IO failure, or
    /// [`ServerError::HandshakeRejected`] if the client's handshake doesn't
    /// match this server's registered schema.
    ///
    /// # Panics
    ///
    /// Does not panic: the `listen()` call just above unconditionally
    /// populates `self.transport` or returns early via `?`.
    #[allow(clippy::expect_used)]
    pub fn server_init(&mut self) -> Result<(), ServerError> {
        if self.transport.is_none() {
            self.listen()?;
        }
        let transport = self.transport.as_mut().expect("listen() populates transport");
        let start_ts_ms = transport.accept_and_handshake(&self.ctx)?;
        self.ctx.seed_last_sent_ms(start_ts_ms);
        Ok(())
    }

    /// Block until one frame arrives, validate its flags against the
    /// target msgtype's declared mode, and copy the payload into that
    /// msgtype's queue (SPEC_FULL §4.8). Returns 1 once a frame has been
    /// queued.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Core`] with [`TbiError::State`] if
    /// [`Server::server_init`] hasn't completed, with [`TbiError::Format`]
    /// if the msgtype is unregistered or its flag nibble doesn't match the
    /// schema's declared mode, or with [`TbiError::Io`] on a read failure.
    pub fn server_receive_blocking(&mut self) -> Result<usize, ServerError> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| TbiError::State("server_receive_blocking before server_init".into()))?;
        let payload = transport.read_one_frame()?;

        let (flags, msgtype) = frame::unpack_byte0(payload[0])
            .map_err(|e| TbiError::Format(format!("malformed frame byte 0: {e}")))?;

        let dcb_mode = self
            .ctx
            .registry()
            .find(msgtype)
            .map(|s| s.dcb)
            .ok_or_else(|| TbiError::Format(format!("unknown msgtype {msgtype} in received frame")))?;
        let expected = if dcb_mode { FrameFlags::Dcb } else { FrameFlags::Rtm };
        if flags != expected {
            return Err(TbiError::Format(format!(
                "flag/msgtype mismatch: msgtype {msgtype} is declared {expected:?}, frame carried {flags:?}"
            ))
            .into());
        }

        self.ctx.enqueue_received(msgtype, payload)?;
        trace!(msgtype, ?flags, "queued received frame");
        Ok(1)
    }

    /// Drain every per-type queue, deserialize each queued frame (one
    /// record for RTM, possibly many for DCB), and dispatch each decoded
    /// record to the global or per-msgtype callback (SPEC_FULL §4.8).
    /// Returns the number of records dispatched.
    ///
    /// # Errors
    ///
    /// Propagates a [`TbiError::Format`] from a malformed queued frame. Per
    /// SPEC_FULL §7, a steady-state `FormatError` here is logged (`warn!`)
    /// before being returned; the caller decides whether to keep serving.
    #[allow(clippy::expect_used)]
    pub fn server_process(&mut self) -> Result<usize, ServerError> {
        let mut queued = Vec::new();
        for msg_ctx in self.ctx.msg_ctxs_mut() {
            let msgtype = msg_ctx.schema.msgtype;
            let dcb = msg_ctx.schema.dcb;
            for frame_bytes in msg_ctx.drain_all() {
                queued.push((msgtype, dcb, frame_bytes));
            }
        }

        let mut dispatched = 0usize;
        for (msgtype, dcb, frame_bytes) in queued {
            let fields = self
                .ctx
                .fields_for(msgtype)
                .expect("msgtype came from a registered schema")
                .to_vec();
            let decoded = if dcb {
                tbi_core::deserialize_dcb(&fields, &frame_bytes)
            } else {
                tbi_core::deserialize_rtm(&fields, &frame_bytes).map(|record| vec![record])
            };
            let records = match decoded {
                Ok(records) => records,
                Err(err) => {
                    warn!(msgtype, dcb, %err, "dropping malformed queued frame");
                    return Err(err.into());
                },
            };
            dispatched += records.len();
            for record in records {
                self.ctx.dispatch(msgtype, record);
            }
        }
        Ok(dispatched)
    }

    /// Close the accepted connection, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Core`] if the underlying shutdown call fails.
    pub fn close(&mut self) -> Result<(), ServerError> {
        if let Some(transport) = self.transport.as_mut() {
            transport.close()?;
        }
        self.transport = None;
        Ok(())
    }

    /// The underlying schema/queue state, for test inspection.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tbi_proto::FieldTag;

    fn temp_and_hum() -> MessageSchema {
        MessageSchema {
            msgtype: 1,
            dcb: false,
            fields: vec![FieldTag::TimeS, FieldTag::U32, FieldTag::U8],
            interval_ms: 0,
        }
    }

    #[test]
    fn receive_before_init_is_a_state_error() {
        let mut server = Server::new(1, ServerConfig::default());
        server.register_schema(temp_and_hum()).unwrap();

        let err = server.server_receive_blocking().unwrap_err();
        assert!(matches!(err, ServerError::Core(TbiError::State(_))));
    }

    #[test]
    fn process_with_empty_queues_dispatches_nothing() {
        let mut server = Server::new(1, ServerConfig::default());
        server.register_schema(temp_and_hum()).unwrap();
        assert_eq!(server.server_process().unwrap(), 0);
    }
}
