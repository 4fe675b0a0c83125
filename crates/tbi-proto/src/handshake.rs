//! Handshake frames exchanged once per connection, before any telemetry flows.
//!
//! Layout matches SPEC_FULL §4.5 bit-for-bit (grounded on
//! `examples/original_source/lib/protocol.c`). Both frames are small and
//! fixed-size, so they're hand-encoded rather than derived with `zerocopy` —
//! unlike a hot-path frame header, handshake frames are built/parsed exactly
//! once per connection and their fields don't share the alignment-sensitive
//! cache-line layout that would make a packed derive worth it.

use crate::errors::ProtocolError;

/// ASCII "TBI", present at the start of both handshake frames.
pub const MAGIC: [u8; 3] = *b"TBI";

/// Protocol version understood by this crate.
pub const PROTOCOL_VERSION: u8 = 1;

/// Wire length of [`ClientHandshake::encode`].
pub const CLIENT_HANDSHAKE_LEN: usize = 15;

/// Wire length of [`ServerHandshakeAck::encode`].
pub const SERVER_ACK_LEN: usize = 4;

/// The 15-byte frame a client sends to open a connection.
///
/// SPEC_FULL's offset table: magic(3) + version(1) + start_ts_ms(8) +
/// schema_version(1) + schema_checksum(2) = 15 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientHandshake {
    /// Milliseconds since some caller-defined epoch; shared with the server
    /// so both sides agree on a connection start instant.
    pub start_ts_ms: u64,
    /// Schema version number, must match the server's.
    pub schema_version: u8,
    /// CRC16-CCITT checksum of the registered schema.
    pub schema_checksum: u16,
}

impl ClientHandshake {
    /// Encode this handshake into its 15-byte wire form.
    #[must_use]
    pub fn encode(self) -> [u8; CLIENT_HANDSHAKE_LEN] {
        let mut buf = [0u8; CLIENT_HANDSHAKE_LEN];
        buf[0..3].copy_from_slice(&MAGIC);
        buf[3] = PROTOCOL_VERSION;
        buf[4..12].copy_from_slice(&self.start_ts_ms.to_be_bytes());
        buf[12] = self.schema_version;
        buf[13..15].copy_from_slice(&self.schema_checksum.to_be_bytes());
        buf
    }

    /// Decode and validate a client handshake frame.
    ///
    /// Validates magic and protocol version only; schema version/checksum
    /// agreement is the caller's responsibility (it needs its own registered
    /// schema to compare against).
    ///
    /// # Panics
    ///
    /// Does not panic: the length check above guarantees `buf` is exactly
    /// [`CLIENT_HANDSHAKE_LEN`] bytes, so both `try_into` slices below are
    /// always the right width.
    #[allow(clippy::expect_used)]
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() != CLIENT_HANDSHAKE_LEN {
            return Err(ProtocolError::HandshakeLength {
                expected: CLIENT_HANDSHAKE_LEN,
                actual: buf.len(),
            });
        }
        if buf[0..3] != MAGIC {
            return Err(ProtocolError::BadMagic);
        }
        if buf[3] != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(buf[3]));
        }
        let start_ts_ms = u64::from_be_bytes(buf[4..12].try_into().expect("8-byte slice"));
        let schema_version = buf[12];
        let schema_checksum = u16::from_be_bytes(buf[13..15].try_into().expect("2-byte slice"));
        Ok(Self { start_ts_ms, schema_version, schema_checksum })
    }
}

/// The 4-byte frame a server sends back once it has accepted a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerHandshakeAck;

impl ServerHandshakeAck {
    /// Encode the ack into its 4-byte wire form: "TBI" + protocol version.
    #[must_use]
    pub fn encode() -> [u8; SERVER_ACK_LEN] {
        let mut buf = [0u8; SERVER_ACK_LEN];
        buf[0..3].copy_from_slice(&MAGIC);
        buf[3] = PROTOCOL_VERSION;
        buf
    }

    /// Decode and validate a server ack frame.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() != SERVER_ACK_LEN {
            return Err(ProtocolError::HandshakeLength {
                expected: SERVER_ACK_LEN,
                actual: buf.len(),
            });
        }
        if buf[0..3] != MAGIC {
            return Err(ProtocolError::BadMagic);
        }
        if buf[3] != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(buf[3]));
        }
        Ok(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn client_handshake_round_trips() {
        let hs = ClientHandshake { start_ts_ms: 0x0102_0304_0506_0708, schema_version: 7, schema_checksum: 0xBEEF };
        let encoded = hs.encode();
        assert_eq!(encoded.len(), CLIENT_HANDSHAKE_LEN);
        let decoded = ClientHandshake::decode(&encoded).unwrap();
        assert_eq!(decoded, hs);
    }

    #[test]
    fn client_handshake_rejects_bad_magic() {
        let mut encoded = ClientHandshake { start_ts_ms: 0, schema_version: 0, schema_checksum: 0 }.encode();
        encoded[0] = b'X';
        assert!(matches!(ClientHandshake::decode(&encoded), Err(ProtocolError::BadMagic)));
    }

    #[test]
    fn client_handshake_rejects_bad_version() {
        let mut encoded = ClientHandshake { start_ts_ms: 0, schema_version: 0, schema_checksum: 0 }.encode();
        encoded[3] = 99;
        assert!(matches!(ClientHandshake::decode(&encoded), Err(ProtocolError::UnsupportedVersion(99))));
    }

    #[test]
    fn client_handshake_rejects_wrong_length() {
        assert!(matches!(
            ClientHandshake::decode(&[0u8; 3]),
            Err(ProtocolError::HandshakeLength { expected: CLIENT_HANDSHAKE_LEN, actual: 3 })
        ));
    }

    #[test]
    fn server_ack_round_trips() {
        let encoded = ServerHandshakeAck::encode();
        assert_eq!(encoded, *b"TBI\x01");
        assert_eq!(ServerHandshakeAck::decode(&encoded).unwrap(), ServerHandshakeAck);
    }
}
