//! Connection bookkeeping seen from outside: counts, events, and closes.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use podremote_core::{ConnectionState, PortSpec};
use podremote_host::infrastructure::actions::recording::RecordingExecutor;
use podremote_host::infrastructure::network::server::{Server, ServerConfig};
use podremote_host::infrastructure::ui_bridge::{HostAppState, CONNECTED_LABEL, DISCONNECTED_LABEL};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn started_server() -> (Arc<Server>, u16) {
    let server = Arc::new(Server::new(
        ServerConfig {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: PortSpec::Ephemeral,
            send_welcome: false,
            ..ServerConfig::default()
        },
        Arc::new(RecordingExecutor::new()),
        None,
    ));
    let port = server.start().await.expect("start");
    (server, port)
}

async fn connect(port: u16) -> TcpStream {
    TcpStream::connect(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
        .await
        .expect("connect")
}

async fn wait_for_count(server: &Server, expected: usize) {
    let mut connectivity = server.connectivity();
    tokio::time::timeout(TIMEOUT, connectivity.wait_for(|count| *count == expected))
        .await
        .expect("count reached in time")
        .expect("watch open");
}

#[tokio::test]
async fn test_peer_close_decrements_count_exactly_once() {
    // Arrange
    let (server, port) = started_server().await;
    let a = connect(port).await;
    let _b = connect(port).await;
    wait_for_count(&server, 2).await;

    // Act
    drop(a);
    wait_for_count(&server, 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Assert
    assert_eq!(server.connected_count(), 1);
    assert_eq!(server.connections().await.len(), 1);
    server.stop().await;
}

#[tokio::test]
async fn test_connectivity_label_follows_connections() {
    let (server, port) = started_server().await;
    let state = HostAppState::new(Arc::clone(&server));
    assert_eq!(state.snapshot().label, DISCONNECTED_LABEL);

    let stream = connect(port).await;
    wait_for_count(&server, 1).await;
    assert_eq!(state.snapshot().label, CONNECTED_LABEL);

    drop(stream);
    wait_for_count(&server, 0).await;
    assert_eq!(state.snapshot().label, DISCONNECTED_LABEL);
    server.stop().await;
}

#[tokio::test]
async fn test_crlf_client_gets_crlf_replies() {
    let (server, port) = started_server().await;
    let stream = connect(port).await;
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    write.write_all(b"PING\r\nstatus\r\n").await.expect("write");
    let mut first = String::new();
    let mut second = String::new();
    tokio::time::timeout(TIMEOUT, async {
        reader.read_line(&mut first).await.expect("read");
        reader.read_line(&mut second).await.expect("read");
    })
    .await
    .expect("replies in time");

    assert_eq!(first, "pong\r\n");
    assert_eq!(second, "status: 1 connected\r\n");
    server.stop().await;
}

#[tokio::test]
async fn test_invalid_utf8_gets_error_and_connection_stays_open() {
    let (server, port) = started_server().await;
    let stream = connect(port).await;
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    write.write_all(b"\xc3\x28\nping\n").await.expect("write");
    let mut error = String::new();
    let mut pong = String::new();
    tokio::time::timeout(TIMEOUT, async {
        reader.read_line(&mut error).await.expect("read");
        reader.read_line(&mut pong).await.expect("read");
    })
    .await
    .expect("replies in time");

    assert_eq!(error, "error: command is not valid UTF-8\n");
    assert_eq!(pong, "pong\n");
    server.stop().await;
}

#[tokio::test]
async fn test_connections_snapshot_shows_ready_peers() {
    let (server, port) = started_server().await;
    let stream = connect(port).await;
    let local = stream.local_addr().expect("local addr");
    wait_for_count(&server, 1).await;

    let connections = server.connections().await;

    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].remote, local);
    assert_eq!(connections[0].state, ConnectionState::Ready);
    server.stop().await;
}

#[tokio::test]
async fn test_many_concurrent_clients_each_get_their_reply() {
    let (server, port) = started_server().await;

    let mut tasks = Vec::new();
    for _ in 0..16 {
        tasks.push(tokio::spawn(async move {
            let stream = connect(port).await;
            let (read, mut write) = stream.into_split();
            let mut reader = BufReader::new(read);
            write.write_all(b"ping\n").await.expect("write");
            let mut line = String::new();
            reader.read_line(&mut line).await.expect("read");
            line
        }));
    }

    for task in tasks {
        let line = tokio::time::timeout(TIMEOUT, task)
            .await
            .expect("in time")
            .expect("join");
        assert_eq!(line, "pong\n");
    }
    server.stop().await;
}
