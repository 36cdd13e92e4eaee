//! Two in-process nodes on loopback: discovery is driven directly (no
//! broadcast in the test), then the full dial-back handshake, table merge,
//! and file relay run over real sockets.

use std::net::SocketAddr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::net::{TcpListener, TcpSocket, UdpSocket};
use tokio::time::sleep;

use dirswarm_keys::{LocalIdentity, PeerRegistry};
use dirswarm_nametable::NameTable;
use dirswarm_network::{
    client, run_discovery_listener, run_server, sync, Command, NodeState, DISCOVERY_MARKER,
};

fn chunk(bytes: &[u8]) -> Vec<u8> {
    let mut out = (bytes.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(bytes);
    out
}

fn public_blob(comment: &str) -> Vec<u8> {
    let mut wire = chunk(b"ssh-rsa");
    wire.extend(chunk(&[0x01, 0x00, 0x01])); // e = 65537
    wire.extend(chunk(&[0x6d, 0x0f, 0x3b, 0x11])); // toy modulus
    format!("ssh-rsa {} {comment}\n", BASE64.encode(wire)).into_bytes()
}

fn private_pem() -> Vec<u8> {
    let fields: [&[u8]; 9] = [
        &[0x00],
        &[0x3d],
        &[0x05],
        &[0x25],
        &[0x07],
        &[0x0b],
        &[0x01],
        &[0x01],
        &[0x01],
    ];
    let body: Vec<u8> = fields
        .iter()
        .flat_map(|f| {
            let mut tlv = vec![0x02, f.len() as u8];
            tlv.extend_from_slice(f);
            tlv
        })
        .collect();
    let mut der = vec![0x30, body.len() as u8];
    der.extend(body);
    pem::encode(&pem::Pem::new("RSA PRIVATE KEY", der)).into_bytes()
}

fn node_state(id: &str, registry_dir: &std::path::Path, port: u16) -> NodeState {
    let identity = LocalIdentity::from_blobs(public_blob(id), &private_pem()).unwrap();
    let registry = PeerRegistry::open(registry_dir.join("known_peers.json"));
    NodeState::new(identity, NameTable::new(), registry, port)
}

async fn wait_for(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn handshake_merges_tables_and_relays_files() {
    // Node A at 127.0.0.1, node B at 127.0.0.2, same swarm port.
    let listener_a = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener_a.local_addr().unwrap().port();
    let listener_b = TcpListener::bind(("127.0.0.2", port)).await.unwrap();

    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();

    let share = dir_a.path().join("docs");
    std::fs::create_dir(&share).unwrap();
    std::fs::write(share.join("f.txt"), b"shared file contents").unwrap();

    let state_a = node_state("alice@x.com", dir_a.path(), port);
    state_a
        .table
        .add_dir("alice@x.com", &share, "docs", false)
        .unwrap();
    let state_b = node_state("bob@y.com", dir_b.path(), port);

    tokio::spawn(run_server(state_a.clone(), listener_a));
    tokio::spawn(run_server(state_b.clone(), listener_b));

    // B initiates, dialing from its own address so A dials back correctly.
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.2:0".parse().unwrap()).unwrap();
    let stream = socket
        .connect(SocketAddr::from(([127, 0, 0, 1], port)))
        .await
        .unwrap();
    sync::send_handshake(&state_b, stream, Command::SyncRequest)
        .await
        .unwrap();

    // A merges B's (empty) table and records B; B merges A's table from the
    // dial-back answer.
    let table_b = state_b.table.clone();
    wait_for(move || table_b.contains_dir("alice@x.com", "docs")).await;
    assert_eq!(
        state_b.table.list_dir("alice@x.com", "docs").unwrap(),
        vec!["alice@x.com/docs/f.txt"]
    );

    let connected_a = state_a.connected.clone();
    wait_for(move || connected_a.contains("bob@y.com")).await;
    assert!(state_a.registry.contains("bob@y.com"));
    assert!(state_b.registry.contains("alice@x.com"));

    // B does not own the file: Open File through B relays to A.
    let addr_b = SocketAddr::from(([127, 0, 0, 2], port));
    let bytes = client::open_file(addr_b, "alice@x.com/docs/f.txt")
        .await
        .unwrap();
    assert_eq!(bytes, b"shared file contents");

    // Missing file and unconnected owner both answer an empty frame.
    let missing = client::open_file(addr_b, "alice@x.com/docs/nope.txt")
        .await
        .unwrap();
    assert!(missing.is_empty());
    let unknown = client::open_file(addr_b, "carol@z.org/docs/f.txt")
        .await
        .unwrap();
    assert!(unknown.is_empty());
}

#[tokio::test]
async fn discovery_listener_records_valid_senders() {
    let dir = tempfile::tempdir().unwrap();
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();

    let state = node_state("alice@x.com", dir.path(), port);
    let connected = state.connected.clone();
    tokio::spawn(run_discovery_listener(state, socket));

    let sender = UdpSocket::bind("127.0.0.2:0").await.unwrap();
    let target = SocketAddr::from(([127, 0, 0, 1], port));

    // Discarded: no marker.
    sender.send_to(b"hello there", target).await.unwrap();
    // Discarded: the node's own identity echoed back.
    let mut own = DISCOVERY_MARKER.to_vec();
    own.extend_from_slice(b"alice@x.com");
    sender.send_to(&own, target).await.unwrap();
    // Recorded; the follow-up handshake dial fails and only logs.
    let mut valid = DISCOVERY_MARKER.to_vec();
    valid.extend_from_slice(b"bob@y.com");
    sender.send_to(&valid, target).await.unwrap();

    let seen = connected.clone();
    wait_for(move || seen.contains("bob@y.com")).await;
    assert_eq!(connected.lookup("bob@y.com"), Some("127.0.0.2".parse().unwrap()));
    assert!(!connected.contains("alice@x.com"));
    assert_eq!(connected.len(), 1);
}

#[tokio::test]
async fn query_commands_answer_one_frame() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let share = dir.path().join("outbox");
    std::fs::create_dir(&share).unwrap();
    std::fs::write(share.join("report.pdf"), b"pdf").unwrap();

    let state = node_state("alice@x.com", dir.path(), addr.port());
    state
        .table
        .add_dir("alice@x.com", &share, "outbox", false)
        .unwrap();
    tokio::spawn(run_server(state.clone(), listener));

    let dirs = client::query(addr, Command::ListDirectories, None)
        .await
        .unwrap();
    assert_eq!(dirs, vec!["alice@x.com/outbox"]);

    let listing = client::query(addr, Command::ListDirectory, Some("alice@x.com/outbox"))
        .await
        .unwrap();
    assert_eq!(listing, vec!["alice@x.com/outbox/report.pdf"]);

    let files = client::query(addr, Command::SearchFile, Some("report"))
        .await
        .unwrap();
    assert_eq!(files, vec!["alice@x.com/outbox/report.pdf"]);

    // Zero matches surface as an empty listing on the wire.
    let none = client::query(addr, Command::Search, Some("zzz"))
        .await
        .unwrap();
    assert!(none.is_empty());

    let known = client::query(addr, Command::ListKnownIds, None)
        .await
        .unwrap();
    assert!(known.is_empty());
}
