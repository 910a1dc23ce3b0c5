//! TCP transport round-trip tests.

use async_trait::async_trait;
use corelib::{NodeAddress, RingId};
use protocol::{serve, Handler, Request, Response, Status, TcpTransport, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Handler that resolves every FindSuccessor to a fixed address and acks
/// everything else.
struct FixedHandler {
    answer: NodeAddress,
}

#[async_trait]
impl Handler for FixedHandler {
    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::FindSuccessor(_) => Response::Address {
                status: Status::Success,
                addr: Some(self.answer.clone()),
            },
            Request::Ping => Response::Ack {
                status: Status::Success,
            },
            other => Response::error_for(&other),
        }
    }
}

async fn spawn_server(answer: NodeAddress) -> NodeAddress {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handler = Arc::new(FixedHandler { answer });
    tokio::spawn(serve(listener, handler));
    NodeAddress::with_id("127.0.0.1", port, RingId(1))
}

#[tokio::test]
async fn find_successor_round_trip() {
    let answer = NodeAddress::with_id("10.0.0.9", 4100, RingId(77));
    let server = spawn_server(answer.clone()).await;
    let transport = TcpTransport::default();

    let response = transport
        .call(&server, Request::FindSuccessor(RingId(42)))
        .await
        .unwrap();
    match response {
        Response::Address { status, addr } => {
            assert!(status.is_ok());
            assert_eq!(addr, Some(answer));
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn sequential_requests_reuse_nothing_but_still_work() {
    let answer = NodeAddress::with_id("10.0.0.9", 4100, RingId(77));
    let server = spawn_server(answer).await;
    let transport = TcpTransport::default();

    for _ in 0..3 {
        let response = transport.call(&server, Request::Ping).await.unwrap();
        assert!(response.status().is_ok());
    }
}

#[tokio::test]
async fn unhandled_request_maps_to_error_status() {
    let answer = NodeAddress::with_id("10.0.0.9", 4100, RingId(77));
    let server = spawn_server(answer).await;
    let transport = TcpTransport::default();

    let response = transport
        .call(&server, Request::GetPredecessor)
        .await
        .unwrap();
    assert_eq!(response.status(), Status::Error);
}

#[tokio::test]
async fn oversized_frame_closes_connection() {
    let answer = NodeAddress::with_id("10.0.0.9", 4100, RingId(77));
    let server = spawn_server(answer).await;

    // Announce a frame twice the size limit; the server must drop the
    // connection instead of buffering for it.
    let mut stream = TcpStream::connect(server.endpoint()).await.unwrap();
    stream.write_u32(2 * 1024 * 1024).await.unwrap();
    stream.flush().await.unwrap();

    let mut buf = [0u8; 1];
    match stream.read(&mut buf).await {
        Ok(0) => {}  // clean close
        Err(_) => {} // reset also counts as refusal
        Ok(n) => panic!("server answered {} bytes to an oversized frame", n),
    }
}

#[tokio::test]
async fn unreachable_peer_resolves_to_failure() {
    // Bind then drop a listener so the port is very likely closed.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dead = NodeAddress::with_id("127.0.0.1", port, RingId(9));
    let transport = TcpTransport::new(Duration::from_millis(500));
    assert!(transport.call(&dead, Request::Ping).await.is_err());
}
