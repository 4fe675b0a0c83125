//! Schema registration and the deterministic schema checksum.
//!
//! Grounded on `lockframe-server::registry::ConnectionRegistry`'s
//! registration-and-lookup shape (register once, look up by linear scan,
//! compute a derived value from registration order), generalized from
//! session bookkeeping to message-schema bookkeeping.

use tbi_proto::FieldTag;

use crate::{crc16, error::TbiError};

/// A single registered message type: its msgtype byte, whether it uses DCB
/// framing, its field layout, and (for DCB types) its flush interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSchema {
    /// 4-bit message type identifier, unique within a registry, `0..=15`.
    pub msgtype: u8,
    /// Whether this message type flushes as a Delta-Compressed Bundle
    /// (`true`) or a Real-Time Message (`false`).
    pub dcb: bool,
    /// Field layout, in wire/native order. Non-empty.
    pub fields: Vec<FieldTag>,
    /// Minimum milliseconds between DCB flushes for this type. Ignored for
    /// RTM types.
    pub interval_ms: u64,
}

impl MessageSchema {
    /// Total byte width of one native record: the sum of each field's width.
    #[must_use]
    pub fn raw_size(&self) -> usize {
        self.fields.iter().map(|f| f.width()).sum()
    }
}

/// Maximum number of distinct message types, fixed by the 4-bit msgtype
/// nibble.
pub const MAX_MSGTYPES: usize = 16;

/// The ordered set of registered message schemas for one session.
///
/// Registration is one-shot: entries are appended via [`SchemaRegistry::register`]
/// before `client_init`/`server_init`, and the registry is immutable for the
/// life of the session after that (SPEC_FULL §3, §4.6).
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entries: Vec<MessageSchema>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one message schema. Entries are kept in registration order,
    /// which is what the checksum and the scheduler's priority both depend
    /// on.
    ///
    /// # Errors
    ///
    /// Returns [`TbiError::Config`] if `msgtype` is out of range, already
    /// registered, or `fields` is empty.
    pub fn register(&mut self, entry: MessageSchema) -> Result<(), TbiError> {
        if entry.msgtype as usize >= MAX_MSGTYPES {
            return Err(TbiError::Config(format!(
                "msgtype {} out of range 0..=15",
                entry.msgtype
            )));
        }
        if entry.fields.is_empty() {
            return Err(TbiError::Config(format!(
                "msgtype {} has an empty field table",
                entry.msgtype
            )));
        }
        if self.entries.iter().any(|e| e.msgtype == entry.msgtype) {
            return Err(TbiError::Config(format!("msgtype {} already registered", entry.msgtype)));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Registered schemas, in registration order.
    #[must_use]
    pub fn entries(&self) -> &[MessageSchema] {
        &self.entries
    }

    /// Look up a registered schema by msgtype.
    #[must_use]
    pub fn find(&self, msgtype: u8) -> Option<&MessageSchema> {
        self.entries.iter().find(|e| e.msgtype == msgtype)
    }

    /// CRC16-CCITT over `concat(msgtype byte, field tag bytes...)` for every
    /// registered entry, in registration order (SPEC_FULL §3, §4.2).
    ///
    /// Two peers that register the same entries in the same order always
    /// compute the same checksum.
    #[must_use]
    pub fn checksum(&self) -> u16 {
        let mut crc = crc16::begin();
        for entry in &self.entries {
            crc = crc16::update(crc, entry.msgtype);
            for field in &entry.fields {
                crc = crc16::update(crc, field.as_u8());
            }
        }
        crc
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

    fn accel() -> MessageSchema {
        MessageSchema {
            msgtype: 2,
            dcb: true,
            fields: vec![
                FieldTag::TimeS,
                FieldTag::U16,
                FieldTag::I16,
                FieldTag::I16,
                FieldTag::I8,
            ],
            interval_ms: 1000,
        }
    }

    #[test]
    fn raw_size_matches_spec_examples() {
        assert_eq!(temp_and_hum().raw_size(), 4 + 4 + 1);
        assert_eq!(accel().raw_size(), 4 + 2 + 2 + 2 + 1);
    }

    #[test]
    fn register_rejects_duplicate_msgtype() {
        let mut reg = SchemaRegistry::new();
        reg.register(temp_and_hum()).unwrap();
        let err = reg.register(temp_and_hum()).unwrap_err();
        assert!(matches!(err, TbiError::Config(_)));
    }

    #[test]
    fn register_rejects_out_of_range_msgtype() {
        let mut reg = SchemaRegistry::new();
        let mut bad = temp_and_hum();
        bad.msgtype = 16;
        assert!(reg.register(bad).is_err());
    }

    #[test]
    fn register_rejects_empty_field_table() {
        let mut reg = SchemaRegistry::new();
        let mut bad = temp_and_hum();
        bad.fields.clear();
        assert!(reg.register(bad).is_err());
    }

    #[test]
    fn s4_checksum_determinism_same_order() {
        let mut a = SchemaRegistry::new();
        a.register(temp_and_hum()).unwrap();
        a.register(accel()).unwrap();

        let mut b = SchemaRegistry::new();
        b.register(temp_and_hum()).unwrap();
        b.register(accel()).unwrap();

        assert_eq!(a.checksum(), b.checksum());
    }

    #[test]
    fn checksum_differs_for_different_schemas() {
        let mut a = SchemaRegistry::new();
        a.register(temp_and_hum()).unwrap();

        let mut b = SchemaRegistry::new();
        b.register(accel()).unwrap();

        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn find_looks_up_by_msgtype() {
        let mut reg = SchemaRegistry::new();
        reg.register(temp_and_hum()).unwrap();
        reg.register(accel()).unwrap();

        assert_eq!(reg.find(2).unwrap().fields.len(), 5);
        assert!(reg.find(9).is_none());
    }
}
