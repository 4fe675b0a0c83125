//! The client's top-level handle: schema registration, handshake, and the
//! scheduler loop.
//!
//! Grounded on SPEC_FULL §4.6-§4.7 and, for the overall shape of "one struct
//! bundles Sans-IO state with its transport", on
//! `lockframe-client::transport::ConnectedClient` wrapping the Sans-IO
//! `Client` from `lockframe-client::client`.

use tbi_core::{Context, MessageSchema, TbiError};
use tbi_proto::{frame, ClientHandshake, FrameFlags};
use tracing::{info, trace};

use crate::{config::ClientConfig, error::ClientError, transport::TcpClient};

/// A telemetry client: registered schemas plus (once connected) a live TCP
/// channel to the server.
pub struct Client {
    ctx: Context,
    config: ClientConfig,
    transport: Option<TcpClient>,
}

impl Client {
    /// Create a client for the given schema version. Register schemas with
    /// [`Client::register_schema`] before [`Client::client_init`].
    #[must_use]
    pub fn new(schema_version: u8, config: ClientConfig) -> Self {
        Self { ctx: Context::new(schema_version), config, transport: None }
    }

    /// Register one message schema. Must precede [`Client::client_init`]
    /// (SPEC_FULL §4.6).
    ///
    /// # Errors
    ///
    /// See [`tbi_core::Context::register_schema`].
    pub fn register_schema(&mut self, entry: MessageSchema) -> Result<(), ClientError> {
        self.ctx.register_schema(entry).map_err(Into::into)
    }

    /// Connect to the configured server, perform the handshake, and seed
    /// every context's `last_sent_ms` with `start_ts_ms` (SPEC_FULL §4.6).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Core`] on connect/IO failure, or
    /// [`ClientError::HandshakeRejected`] if the server rejects the
    /// handshake.
    pub fn client_init(&mut self, start_ts_ms: u64) -> Result<(), ClientError> {
        let handshake = ClientHandshake {
            start_ts_ms,
            schema_version: self.ctx.schema_version(),
            schema_checksum: self.ctx.schema_checksum(),
        };
        let transport = TcpClient::connect(&self.config, handshake)?;
        self.transport = Some(transport);
        self.ctx.seed_last_sent_ms(start_ts_ms);
        info!(addr = %self.config.server_addr, "client_init complete");
        Ok(())
    }

    /// Copy `record` into the queue for `msgtype`. Fails if `msgtype` is
    /// unknown or `record.len()` disagrees with the schema (SPEC_FULL §6).
    ///
    /// # Errors
    ///
    /// See [`tbi_core::Context::schedule`].
    pub fn schedule(&mut self, msgtype: u8, record: Vec<u8>) -> Result<(), ClientError> {
        self.ctx.schedule(msgtype, record).map_err(Into::into)
    }

    /// Perform one unit of scheduler work (SPEC_FULL §4.7): the first
    /// registered context with work ready is serviced — an RTM context
    /// dequeues and sends one record, a DCB context (once its interval has
    /// elapsed) drains and sends its whole queue. Returns the number of
    /// records sent, or 0 if nothing was ready.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Core`] with [`TbiError::State`] if
    /// [`Client::client_init`] hasn't been called yet, or propagates a
    /// serialize/IO failure.
    ///
    /// # Panics
    ///
    /// Does not panic: the RTM branch only dequeues after `msg_ctx.is_empty()`
    /// has been checked `false` just above.
    #[allow(clippy::expect_used)]
    pub fn client_process(&mut self, now_ms: u64) -> Result<usize, ClientError> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| TbiError::State("client_process called before client_init".into()))?;

        for msg_ctx in self.ctx.msg_ctxs_mut() {
            if msg_ctx.is_empty() {
                continue;
            }

            if !msg_ctx.schema.dcb {
                let record = msg_ctx.dequeue().expect("checked non-empty above");
                let mut payload =
                    tbi_core::serialize_rtm(&msg_ctx.schema.fields, msg_ctx.schema.msgtype, &record)?;
                payload[0] = frame::pack_byte0(FrameFlags::Rtm, msg_ctx.schema.msgtype);
                transport.send_frame(&payload)?;
                trace!(msgtype = msg_ctx.schema.msgtype, "sent RTM frame");
                return Ok(1);
            }

            if !msg_ctx.dcb_ready(now_ms) {
                continue;
            }
            let records = msg_ctx.drain_all();
            if records.is_empty() {
                continue;
            }
            let count = records.len();
            let mut payload =
                tbi_core::serialize_dcb(&msg_ctx.schema.fields, msg_ctx.schema.msgtype, &records)?;
            payload[0] = frame::pack_byte0(FrameFlags::Dcb, msg_ctx.schema.msgtype);
            transport.send_frame(&payload)?;
            msg_ctx.last_sent_ms = now_ms;
            trace!(msgtype = msg_ctx.schema.msgtype, count, "flushed DCB bundle");
            return Ok(count);
        }

        Ok(0)
    }

    /// Close the connection. Idempotent if called before `client_init`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Core`] if the underlying shutdown call fails.
    pub fn close(&mut self) -> Result<(), ClientError> {
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
    fn client_process_before_init_is_a_state_error() {
        let mut client = Client::new(1, ClientConfig::default());
        client.register_schema(temp_and_hum()).unwrap();
        client.schedule(1, vec![0u8; 9]).unwrap();

        let err = client.client_process(0).unwrap_err();
        assert!(matches!(err, ClientError::Core(TbiError::State(_))));
    }

    #[test]
    fn close_before_init_is_a_no_op() {
        let mut client = Client::new(1, ClientConfig::default());
        assert!(client.close().is_ok());
    }
}
