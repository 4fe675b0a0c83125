//! Property tests for wire-level framing primitives.

use proptest::prelude::*;
use tbi_proto::{frame, handshake, ClientHandshake, FieldTag, FrameFlags};

proptest! {
    #[test]
    fn byte0_round_trips(msgtype in 0u8..=15, flag_idx in 0usize..3) {
        let flags = [FrameFlags::None, FrameFlags::Rtm, FrameFlags::Dcb][flag_idx];
        let byte0 = frame::pack_byte0(flags, msgtype);
        let (got_flags, got_msgtype) = frame::unpack_byte0(byte0).unwrap();
        prop_assert_eq!(got_flags, flags);
        prop_assert_eq!(got_msgtype, msgtype);
    }

    #[test]
    fn client_handshake_round_trips(
        start_ts_ms in any::<u64>(),
        schema_version in any::<u8>(),
        schema_checksum in any::<u16>(),
    ) {
        let hs = ClientHandshake { start_ts_ms, schema_version, schema_checksum };
        let encoded = hs.encode();
        prop_assert_eq!(encoded.len(), handshake::CLIENT_HANDSHAKE_LEN);
        let decoded = ClientHandshake::decode(&encoded).unwrap();
        prop_assert_eq!(decoded, hs);
    }

    #[test]
    fn field_tag_byte_round_trips(idx in 0usize..8) {
        let tag = FieldTag::ALL[idx];
        prop_assert_eq!(FieldTag::from_u8(tag.as_u8()).unwrap(), tag);
    }
}
