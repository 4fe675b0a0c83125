//! The library root: registered schemas, per-type message contexts, and
//! callback dispatch.
//!
//! Grounded on `lockframe-core::session::Session`, which owns a registry plus
//! the callback/event-sink it dispatches into; here the sink is the
//! telemetry decode callback instead of a message-receive event. Per the
//! redesign note in SPEC_FULL §9 ("callbacks with raw userdata pointer"),
//! callbacks are boxed `FnMut` closures — any userdata a caller needs is
//! captured by the closure itself, rather than threaded through as a raw
//! pointer.
//!
//! `Context` is deliberately channel-agnostic: it owns schema state and
//! per-type queues, but not a socket. `tbi-client`/`tbi-server` each hold a
//! `Context` alongside their own transport and enforce the role split
//! (`schedule` is a client-only operation) at that layer.

use std::collections::HashMap;

use tbi_proto::FieldTag;

use crate::{
    error::TbiError,
    msgbuffer::MsgContext,
    schema::{MessageSchema, SchemaRegistry},
};

/// A decode callback: invoked with the msgtype and the decoded native
/// record. Any captured state (the source's "userdata") lives in the
/// closure.
pub type Callback = Box<dyn FnMut(u8, Vec<u8>)>;

/// Top-level library state: the registry, one [`MsgContext`] per registered
/// schema entry, and the callback registrations that drive dispatch.
pub struct Context {
    schema_version: u8,
    registry: SchemaRegistry,
    msg_ctxs: Vec<MsgContext>,
    global_cb: Option<Callback>,
    per_type_cb: HashMap<u8, Callback>,
}

impl Context {
    /// Create an empty context for the given schema version. Register
    /// schemas with [`Context::register_schema`] before `client_init`/
    /// `server_init`.
    #[must_use]
    pub fn new(schema_version: u8) -> Self {
        Self {
            schema_version,
            registry: SchemaRegistry::new(),
            msg_ctxs: Vec::new(),
            global_cb: None,
            per_type_cb: HashMap::new(),
        }
    }

    /// The schema version this context was created with.
    #[must_use]
    pub fn schema_version(&self) -> u8 {
        self.schema_version
    }

    /// Register one message schema and allocate its [`MsgContext`]. Must be
    /// called before `client_init`/`server_init` (SPEC_FULL §4.6).
    ///
    /// # Errors
    ///
    /// Returns [`TbiError::Config`] under the same conditions as
    /// [`SchemaRegistry::register`].
    pub fn register_schema(&mut self, entry: MessageSchema) -> Result<(), TbiError> {
        self.registry.register(entry.clone())?;
        self.msg_ctxs.push(MsgContext::new(entry));
        Ok(())
    }

    /// Registered schemas, in registration order.
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// `CRC16-CCITT` over the registered schemas, in registration order
    /// (SPEC_FULL §3, §4.2). Exchanged at handshake.
    #[must_use]
    pub fn schema_checksum(&self) -> u16 {
        self.registry.checksum()
    }

    /// Per-type contexts, in registration order.
    #[must_use]
    pub fn msg_ctxs(&self) -> &[MsgContext] {
        &self.msg_ctxs
    }

    /// Per-type contexts, in registration order, mutable.
    pub fn msg_ctxs_mut(&mut self) -> &mut [MsgContext] {
        &mut self.msg_ctxs
    }

    /// Seed every context's `last_sent_ms` with the shared handshake
    /// timestamp. Called once by `client_init`/`server_init` (SPEC_FULL
    /// §4.6).
    pub fn seed_last_sent_ms(&mut self, start_ts_ms: u64) {
        for ctx in &mut self.msg_ctxs {
            ctx.last_sent_ms = start_ts_ms;
        }
    }

    fn find_ctx_mut(&mut self, msgtype: u8) -> Option<&mut MsgContext> {
        self.msg_ctxs.iter_mut().find(|c| c.schema.msgtype == msgtype)
    }

    /// Look up the fields for a registered msgtype.
    #[must_use]
    pub fn fields_for(&self, msgtype: u8) -> Option<&[FieldTag]> {
        self.registry.find(msgtype).map(|s| s.fields.as_slice())
    }

    /// Copy `record` into the queue for `msgtype`.
    ///
    /// # Errors
    ///
    /// Returns [`TbiError::Config`] if `msgtype` is not registered, or
    /// [`TbiError::Format`] if `record.len()` doesn't match the schema's
    /// `raw_size` (SPEC_FULL §6, property 5 — the queue is left untouched on
    /// either error).
    ///
    /// # Panics
    ///
    /// Does not panic: `register_schema` always inserts into `registry` and
    /// `msg_ctxs` together, so a `msgtype` found in one is always found in
    /// the other.
    #[allow(clippy::expect_used)]
    pub fn schedule(&mut self, msgtype: u8, record: Vec<u8>) -> Result<(), TbiError> {
        let raw_size = self
            .registry
            .find(msgtype)
            .ok_or_else(|| TbiError::Config(format!("unknown msgtype {msgtype}")))?
            .raw_size();
        if record.len() != raw_size {
            return Err(TbiError::Format(format!(
                "record length {} does not match schema raw_size {raw_size} for msgtype {msgtype}",
                record.len()
            )));
        }
        self.find_ctx_mut(msgtype).expect("registry and msg_ctxs stay in sync").enqueue(record);
        Ok(())
    }

    /// Copy a received payload into the queue for `msgtype`, without the
    /// length check `schedule` performs (the server's receive path already
    /// validated flag/msgtype agreement; SPEC_FULL §4.8).
    ///
    /// # Errors
    ///
    /// Returns [`TbiError::Config`] if `msgtype` is not registered.
    pub fn enqueue_received(&mut self, msgtype: u8, payload: Vec<u8>) -> Result<(), TbiError> {
        self.find_ctx_mut(msgtype)
            .ok_or_else(|| TbiError::Config(format!("unknown msgtype {msgtype}")))?
            .enqueue(payload);
        Ok(())
    }

    /// Register the global decode callback. If set, it takes priority over
    /// any per-msgtype callback (SPEC_FULL §4.8).
    pub fn register_global_callback(&mut self, cb: impl FnMut(u8, Vec<u8>) + 'static) {
        self.global_cb = Some(Box::new(cb));
    }

    /// Register a decode callback for one msgtype.
    pub fn register_msg_callback(&mut self, msgtype: u8, cb: impl FnMut(u8, Vec<u8>) + 'static) {
        self.per_type_cb.insert(msgtype, Box::new(cb));
    }

    /// Dispatch one decoded record: the global callback if registered, else
    /// the per-msgtype callback, else drop it silently (no callback
    /// registered for this msgtype).
    pub fn dispatch(&mut self, msgtype: u8, record: Vec<u8>) {
        if let Some(cb) = self.global_cb.as_mut() {
            cb(msgtype, record);
        } else if let Some(cb) = self.per_type_cb.get_mut(&msgtype) {
            cb(msgtype, record);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn temp_and_hum() -> MessageSchema {
        MessageSchema {
            msgtype: 1,
            dcb: false,
            fields: vec![FieldTag::TimeS, FieldTag::U32, FieldTag::U8],
            interval_ms: 0,
        }
    }

    #[test]
    fn register_schema_allocates_a_msg_ctx() {
        let mut ctx = Context::new(1);
        ctx.register_schema(temp_and_hum()).unwrap();
        assert_eq!(ctx.msg_ctxs().len(), 1);
        assert_eq!(ctx.msg_ctxs()[0].schema.msgtype, 1);
    }

    #[test]
    fn s5_schedule_rejects_wrong_length_without_mutating_queue() {
        let mut ctx = Context::new(1);
        ctx.register_schema(temp_and_hum()).unwrap();

        let err = ctx.schedule(1, vec![0u8; 3]).unwrap_err();
        assert!(matches!(err, TbiError::Format(_)));
        assert!(ctx.msg_ctxs()[0].is_empty());
    }

    #[test]
    fn schedule_rejects_unknown_msgtype() {
        let mut ctx = Context::new(1);
        ctx.register_schema(temp_and_hum()).unwrap();

        let err = ctx.schedule(9, vec![0u8; 9]).unwrap_err();
        assert!(matches!(err, TbiError::Config(_)));
    }

    #[test]
    fn s6_schedule_preserves_fifo_order() {
        let mut ctx = Context::new(1);
        ctx.register_schema(temp_and_hum()).unwrap();

        ctx.schedule(1, vec![1u8; 9]).unwrap();
        ctx.schedule(1, vec![2u8; 9]).unwrap();
        ctx.schedule(1, vec![3u8; 9]).unwrap();

        let queued = ctx.msg_ctxs_mut()[0].drain_all();
        assert_eq!(queued, vec![vec![1u8; 9], vec![2u8; 9], vec![3u8; 9]]);
    }

    #[test]
    fn global_callback_takes_priority_over_per_type() {
        let mut ctx = Context::new(1);
        let global_hits = Rc::new(RefCell::new(Vec::new()));
        let per_type_hits = Rc::new(RefCell::new(Vec::new()));

        let g = global_hits.clone();
        ctx.register_global_callback(move |msgtype, record| g.borrow_mut().push((msgtype, record)));
        let p = per_type_hits.clone();
        ctx.register_msg_callback(1, move |msgtype, record| p.borrow_mut().push((msgtype, record)));

        ctx.dispatch(1, vec![0xAB]);

        assert_eq!(*global_hits.borrow(), vec![(1, vec![0xAB])]);
        assert!(per_type_hits.borrow().is_empty());
    }

    #[test]
    fn per_type_callback_fires_when_no_global_registered() {
        let mut ctx = Context::new(1);
        let hits = Rc::new(RefCell::new(Vec::new()));
        let h = hits.clone();
        ctx.register_msg_callback(2, move |msgtype, record| h.borrow_mut().push((msgtype, record)));

        ctx.dispatch(2, vec![1, 2, 3]);
        ctx.dispatch(9, vec![9]); // no callback registered for msgtype 9: dropped silently

        assert_eq!(*hits.borrow(), vec![(2, vec![1, 2, 3])]);
    }

    #[test]
    fn s4_checksum_matches_registration_order() {
        let mut a = Context::new(1);
        a.register_schema(temp_and_hum()).unwrap();
        let mut b = Context::new(1);
        b.register_schema(temp_and_hum()).unwrap();
        assert_eq!(a.schema_checksum(), b.schema_checksum());
    }
}
