//! Full client/server loopback over a real TCP socket: handshake, one RTM
//! flush, and dispatch to a registered callback (SPEC_FULL §8, scenario S2).
//!
//! Grounded on the teacher's `transport_integration*.rs` pattern of driving
//! a real client against a real server bound to an ephemeral port, rather
//! than asserting on the Sans-IO codec alone.

use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread;

use tbi_client::{Client, ClientConfig};
use tbi_core::MessageSchema;
use tbi_proto::FieldTag;
use tbi_server::{Server, ServerConfig};

fn temp_and_hum() -> MessageSchema {
    MessageSchema {
        msgtype: 1,
        dcb: false,
        fields: vec![FieldTag::TimeS, FieldTag::U32, FieldTag::U8],
        interval_ms: 0,
    }
}

#[test]
fn s2_loopback_rtm_round_trip_dispatches_to_callback() {
    let mut server = Server::new(
        1,
        ServerConfig { bind_addr: "127.0.0.1:0".parse().unwrap(), ..ServerConfig::default() },
    );
    server.register_schema(temp_and_hum()).unwrap();
    let addr: SocketAddr = server.listen().unwrap();

    let (tx, rx) = mpsc::channel();
    server.register_global_callback(move |msgtype, record| {
        tx.send((msgtype, record)).expect("test receiver still alive");
    });

    let server_thread = thread::spawn(move || {
        server.server_init().unwrap();
        server.server_receive_blocking().unwrap();
        server.server_process().unwrap();
        server.close().unwrap();
    });

    let mut client = Client::new(
        1,
        ClientConfig { server_addr: addr, ..ClientConfig::default() },
    );
    client.register_schema(temp_and_hum()).unwrap();
    client.client_init(1_000).unwrap();

    let record =
        tbi_core::encode_native_record(&temp_and_hum().fields, &[0xAABB_CCDD, 0x1122_3344, 0xFF]);
    client.schedule(1, record.clone()).unwrap();
    let sent = client.client_process(1_000).unwrap();
    assert_eq!(sent, 1);
    client.close().unwrap();

    server_thread.join().expect("server thread should not panic");

    let (msgtype, decoded) = rx.recv().expect("server dispatched exactly one record");
    assert_eq!(msgtype, 1);
    assert_eq!(decoded, record);
}

#[test]
fn s4_handshake_schema_mismatch_is_rejected_without_blocking() {
    let mut server = Server::new(
        1,
        ServerConfig { bind_addr: "127.0.0.1:0".parse().unwrap(), ..ServerConfig::default() },
    );
    server.register_schema(temp_and_hum()).unwrap();
    let addr = server.listen().unwrap();

    let server_thread = thread::spawn(move || server.server_init());

    // Client registers a different field layout for msgtype 1, so its
    // schema checksum disagrees with the server's.
    let mut client = Client::new(
        1,
        ClientConfig { server_addr: addr, ..ClientConfig::default() },
    );
    client
        .register_schema(MessageSchema {
            msgtype: 1,
            dcb: false,
            fields: vec![FieldTag::U32],
            interval_ms: 0,
        })
        .unwrap();

    let client_result = client.client_init(0);
    assert!(client_result.is_err(), "client should see the server close without an ack");

    let server_result = server_thread.join().expect("server thread should not panic");
    assert!(server_result.is_err(), "server should reject the mismatched handshake");
}
