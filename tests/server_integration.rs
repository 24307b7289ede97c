//! Integration tests for the TCP chat server.
//!
//! Each test binds a server on an ephemeral loopback port and talks to it
//! with plain line-oriented TCP clients.

use std::net::SocketAddr;
use std::time::Duration;

use line_chat_server::{ChatServer, ChatState, ServerConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

/// Maximum time to wait for an expected line
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to listen for a line that must not arrive
const SILENCE_WINDOW: Duration = Duration::from_millis(150);

// ============================================================================
// Test Helpers
// ============================================================================

struct TestServer {
    addr: SocketAddr,
    state: ChatState,
    cancel_token: CancellationToken,
    handle: JoinHandle<Result<(), line_chat_server::AppError>>,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            shutdown_grace_ms: 1000,
            ..ServerConfig::default()
        };
        let cancel_token = CancellationToken::new();
        let server = ChatServer::bind(config, cancel_token.clone())
            .await
            .expect("bind server");
        let addr = server.local_addr().expect("local addr");
        let state = server.state();
        let handle = tokio::spawn(server.run());

        TestServer {
            addr,
            state,
            cancel_token,
            handle,
        }
    }

    async fn connect(&self) -> TestClient {
        let stream = TcpStream::connect(self.addr).await.expect("connect to server");
        let (reader, writer) = stream.into_split();
        TestClient {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    /// Connect and register `name`, returning once the session is active
    async fn join(&self, name: &str) -> TestClient {
        let mut client = self.connect().await;
        client.expect("SUBMITNAME").await;
        client.send(&format!("{} 127.0.0.1", name)).await;

        // The joiner gets no NAMEACCEPTED of its own; its echo proves it is enrolled
        client.send("ready").await;
        client.expect(&format!("MESSAGE {}: ready", name)).await;
        client
    }

    async fn shutdown(self) {
        self.cancel_token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(3), self.handle)
            .await
            .expect("server did not stop")
            .expect("server task");
        assert!(result.is_ok());
    }
}

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .expect("write line");
    }

    async fn next_line(&mut self) -> Option<String> {
        tokio::time::timeout(READ_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for line")
            .expect("read line")
    }

    async fn expect(&mut self, expected: &str) {
        assert_eq!(self.next_line().await.as_deref(), Some(expected));
    }

    async fn expect_silence(&mut self) {
        if let Ok(line) = tokio::time::timeout(SILENCE_WINDOW, self.lines.next_line()).await {
            panic!("expected no line, got {:?}", line);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_join_is_announced_to_others_only() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;
    let mut bob = server.join("bob").await;

    alice.expect("NAMEACCEPTED bob(127.0.0.1) has entering").await;
    alice.expect("MESSAGE bob: ready").await;
    alice.expect_silence().await;
    bob.expect_silence().await;

    assert_eq!(server.state.registry.names(), vec!["alice", "bob"]);
    assert_eq!(server.state.broadcast.len(), 2);
    server.shutdown().await;
}

#[tokio::test]
async fn test_broadcast_reaches_everyone_including_sender() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;
    let mut bob = server.join("bob").await;
    alice.expect("NAMEACCEPTED bob(127.0.0.1) has entering").await;
    alice.expect("MESSAGE bob: ready").await;

    alice.send("hello everyone").await;
    alice.expect("MESSAGE alice: hello everyone").await;
    bob.expect("MESSAGE alice: hello everyone").await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_whisper_reaches_only_target() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;
    let mut bob = server.join("bob").await;
    let mut carol = server.join("carol").await;
    alice.expect("NAMEACCEPTED bob(127.0.0.1) has entering").await;
    alice.expect("MESSAGE bob: ready").await;
    alice.expect("NAMEACCEPTED carol(127.0.0.1) has entering").await;
    alice.expect("MESSAGE carol: ready").await;
    bob.expect("NAMEACCEPTED carol(127.0.0.1) has entering").await;
    bob.expect("MESSAGE carol: ready").await;

    alice.send("bob/ hello").await;
    bob.expect("WHISPER from alice to bob bob/ hello").await;
    alice.expect_silence().await;
    carol.expect_silence().await;

    // Unknown target falls back to broadcast
    alice.send("dave/ hello").await;
    alice.expect("MESSAGE alice: dave/ hello").await;
    bob.expect("MESSAGE alice: dave/ hello").await;
    carol.expect("MESSAGE alice: dave/ hello").await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_taken_name_is_requested_again() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;

    let mut impostor = server.connect().await;
    impostor.expect("SUBMITNAME").await;
    impostor.send("alice 10.0.0.66").await;
    impostor.expect("SUBMITNAME").await;
    alice.expect_silence().await;

    impostor.send("mallory 10.0.0.66").await;
    alice.expect("NAMEACCEPTED mallory(10.0.0.66) has entering").await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_announces_and_frees_name() {
    let server = TestServer::spawn().await;
    let alice = server.join("alice").await;
    let mut bob = server.join("bob").await;

    drop(alice);
    bob.expect("LEFT alicehas left").await;

    // Name can be taken again
    let mut returning = server.join("alice").await;
    bob.expect("NAMEACCEPTED alice(127.0.0.1) has entering").await;
    bob.expect("MESSAGE alice: ready").await;
    returning.expect_silence().await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_malformed_registration_closes_connection() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;

    let mut broken = server.connect().await;
    broken.expect("SUBMITNAME").await;
    broken.send("no-address-here").await;

    assert_eq!(broken.next_line().await, None);
    alice.expect("LEFT has left").await;
    assert_eq!(server.state.registry.names(), vec!["alice"]);

    server.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_registrations_single_winner() {
    let server = TestServer::spawn().await;

    let mut attempts = Vec::new();
    for i in 0..16 {
        let mut client = server.connect().await;
        attempts.push(tokio::spawn(async move {
            client.expect("SUBMITNAME").await;
            client.send(&format!("highlander 10.0.0.{}", i)).await;
            // Losers are asked again; the winner hears nothing about its own join
            let reply = tokio::time::timeout(SILENCE_WINDOW * 4, client.lines.next_line()).await;
            (reply.ok().map(|line| line.expect("read line")), client)
        }));
    }

    let mut winners = 0;
    let mut clients = Vec::new();
    for attempt in attempts {
        let (reply, client) = attempt.await.expect("attempt task");
        match reply {
            None => winners += 1,
            Some(Some(line)) if line == "SUBMITNAME" => {}
            other => panic!("unexpected reply {:?}", other),
        }
        clients.push(client);
    }

    assert_eq!(winners, 1);
    assert_eq!(server.state.registry.names(), vec!["highlander"]);
    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_disconnects_clients() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;

    server.shutdown().await;
    assert_eq!(alice.next_line().await, None);
}
