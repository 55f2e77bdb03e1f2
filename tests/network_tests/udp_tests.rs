//! UDP Server Tests
//!
//! Tests for the datagram front end:
//! - One reply per request, sent back to the requester
//! - `SALIR` is acknowledged without ending anything
//! - Malformed datagrams get an ERROR reply
//! - Replies are capped at the configured buffer size and at what one
//!   UDP datagram can carry

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use roster::client::UdpClient;
use roster::config::MAX_UDP_PAYLOAD;
use roster::model::{InstitutionFields, MemberFields};
use roster::network::DatagramServer;
use roster::protocol::{decode_command, Command, DATAGRAM_GOODBYE_MESSAGE};
use roster::store::MemoryStore;
use roster::{Config, Dispatcher};

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    server: Arc<DatagramServer>,
    handle: JoinHandle<roster::Result<()>>,
    addr: SocketAddr,
}

impl TestServer {
    fn start(config: Config) -> Self {
        let dispatcher = Dispatcher::new(Arc::new(MemoryStore::new()));
        let server = Arc::new(DatagramServer::bind(config, dispatcher).unwrap());
        let addr = server.local_addr().unwrap();

        let runner = Arc::clone(&server);
        let handle = thread::spawn(move || runner.run());

        Self {
            server,
            handle,
            addr,
        }
    }

    fn stop(self) {
        self.server.shutdown();
        self.handle.join().unwrap().unwrap();
    }

    fn client(&self) -> UdpClient {
        UdpClient::connect(self.addr, Duration::from_secs(5)).unwrap()
    }
}

fn test_config() -> Config {
    Config::builder()
        .udp_listen_addr("127.0.0.1:0")
        .shutdown_poll_ms(10)
        .build()
}

// =============================================================================
// Request/Reply Tests
// =============================================================================

#[test]
fn test_create_and_list_over_udp() {
    let server = TestServer::start(test_config());
    let client = server.client();

    let lines = client
        .send(&Command::CreateInstitution(InstitutionFields::new("MIT", "Cambridge", "USA")))
        .unwrap();
    assert_eq!(lines, vec!["OK: Institution created with ID: 1"]);

    let lines = client
        .send(&Command::CreateMember(MemberFields::new("Ada", "Lovelace", "ada@x.org", 36, 1)))
        .unwrap();
    assert_eq!(lines, vec!["OK: Member created with ID: 1"]);

    let lines = client.send(&Command::ListMembers).unwrap();
    assert_eq!(lines.len(), 6);
    assert!(lines[3].ends_with("| MIT"));
    assert_eq!(lines[5], "Total: 1");

    server.stop();
}

#[test]
fn test_not_found_over_udp() {
    let server = TestServer::start(test_config());

    let lines = server.client().send(&Command::DeleteMember { id: 999 }).unwrap();
    assert_eq!(lines, vec!["NOT_FOUND: No member found with ID: 999"]);

    server.stop();
}

#[test]
fn test_terminate_is_acknowledged() {
    let server = TestServer::start(test_config());
    let client = server.client();

    assert_eq!(
        client.send(&Command::Terminate).unwrap(),
        vec![DATAGRAM_GOODBYE_MESSAGE]
    );

    // Nothing was closed: the same socket keeps working
    assert_eq!(
        client.send(&Command::ListInstitutions).unwrap(),
        vec!["No institutions registered."]
    );

    server.stop();
}

#[test]
fn test_malformed_datagram_gets_error_reply() {
    let server = TestServer::start(test_config());
    let client = server.client();

    let lines = client.send(&decode_command("INSERTAR_ESTUDIANTE|Ada")).unwrap();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("ERROR: wrong argument count"));

    let lines = client.send(&decode_command("ELIMINAR_ESTUDIANTE|x")).unwrap();
    assert!(lines[0].starts_with("ERROR: invalid integer"));

    server.stop();
}

#[test]
fn test_reply_goes_to_each_sender() {
    let server = TestServer::start(test_config());

    let first = UdpSocket::bind("127.0.0.1:0").unwrap();
    let second = UdpSocket::bind("127.0.0.1:0").unwrap();
    for socket in [&first, &second] {
        socket.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    }

    first.send_to(b"INSERTAR_UNIVERSIDAD|A|x|y", server.addr).unwrap();
    let mut buf = [0u8; 1024];
    let (len, from) = first.recv_from(&mut buf).unwrap();
    assert_eq!(from, server.addr);
    assert_eq!(&buf[..len], b"OK: Institution created with ID: 1");

    second.send_to(b"INSERTAR_UNIVERSIDAD|B|x|y", server.addr).unwrap();
    let (len, _) = second.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..len], b"OK: Institution created with ID: 2");

    server.stop();
}

#[test]
fn test_trailing_newline_is_ignored() {
    let server = TestServer::start(test_config());
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    socket.send_to(b"consultar_universidades\r\n", server.addr).unwrap();
    let mut buf = [0u8; 1024];
    let (len, _) = socket.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..len], b"No institutions registered.");

    server.stop();
}

#[test]
fn test_embedded_newline_is_not_stored() {
    let server = TestServer::start(test_config());
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut buf = [0u8; 1024];

    socket
        .send_to(b"INSERTAR_UNIVERSIDAD|MIT\nTotal: 99|Cambridge|USA", server.addr)
        .unwrap();
    let (len, _) = socket.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..len], b"ERROR: invalid character in name");

    socket.send_to(b"CONSULTAR_UNIVERSIDADES", server.addr).unwrap();
    let (len, _) = socket.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..len], b"No institutions registered.");

    server.stop();
}

// =============================================================================
// Reply Size Tests
// =============================================================================

#[test]
fn test_reply_is_capped_at_buffer_size() {
    let config = Config::builder()
        .udp_listen_addr("127.0.0.1:0")
        .datagram_buffer_size(64)
        .build();
    let dispatcher = Dispatcher::new(Arc::new(MemoryStore::new()));
    let server = DatagramServer::bind(config, dispatcher).unwrap();
    let peer: SocketAddr = "127.0.0.1:9".parse().unwrap();

    for i in 0..5 {
        let line = format!("INSERTAR_UNIVERSIDAD|inst{}|city|country", i);
        server.handle_datagram(line.as_bytes(), peer);
    }

    let reply = server.handle_datagram(b"CONSULTAR_UNIVERSIDADES", peer);
    assert_eq!(reply.len(), 64);
    assert!(reply.starts_with(&[b'='; 59]));
    assert_eq!(reply[59], b'\n');
}

#[test]
fn test_large_reply_fits_one_datagram_with_default_buffer() {
    // Default buffer size, which is larger than a UDP payload can be
    let server = TestServer::start(test_config());
    let peer: SocketAddr = "127.0.0.1:9".parse().unwrap();

    for i in 0..1200 {
        let line = format!("INSERTAR_UNIVERSIDAD|inst{}|city|country", i);
        server.server.handle_datagram(line.as_bytes(), peer);
    }

    let lines = server.client().send(&Command::ListInstitutions).unwrap();
    let reply_len = lines.iter().map(|l| l.len() + 1).sum::<usize>() - 1;

    assert_eq!(reply_len, MAX_UDP_PAYLOAD);
    assert!(lines[0].chars().all(|c| c == '='));
    assert!(lines[3].starts_with("ID: 1    | inst0"));

    server.stop();
}

#[test]
fn test_invalid_utf8_datagram_is_malformed() {
    let config = Config::builder().udp_listen_addr("127.0.0.1:0").build();
    let dispatcher = Dispatcher::new(Arc::new(MemoryStore::new()));
    let server = DatagramServer::bind(config, dispatcher).unwrap();
    let peer: SocketAddr = "127.0.0.1:9".parse().unwrap();

    let reply = server.handle_datagram(&[0xC3, 0x28, b'|', b'1'], peer);
    assert!(reply.starts_with(b"ERROR: unrecognized operation"));
}

#[test]
fn test_bind_rejects_oversized_buffer() {
    let config = Config::builder()
        .udp_listen_addr("127.0.0.1:0")
        .datagram_buffer_size(70_000)
        .build();
    let dispatcher = Dispatcher::new(Arc::new(MemoryStore::new()));

    assert!(DatagramServer::bind(config, dispatcher).is_err());
}
