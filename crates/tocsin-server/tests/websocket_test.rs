//! End-to-end tests against a real server over WebSockets.
//!
//! Each test binds the production server to an ephemeral port and talks to
//! it with a bare tokio-tungstenite client, sending raw JSON the way any
//! third-party client would.

use std::{net::SocketAddr, time::Duration};

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tocsin_proto::ServerMessage;
use tocsin_server::{DriverConfig, Server, ServerRuntimeConfig};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn boot_server(max_connections: usize) -> SocketAddr {
    let config = ServerRuntimeConfig {
        bind_address: "127.0.0.1:0".to_string(),
        driver: DriverConfig { max_connections },
    };
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn connect(addr: SocketAddr) -> WsStream {
    let (ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    ws
}

async fn send(ws: &mut WsStream, value: serde_json::Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

/// Next protocol message, skipping control frames.
async fn recv(ws: &mut WsStream) -> ServerMessage {
    loop {
        let frame = timeout(TIMEOUT, ws.next()).await.unwrap().unwrap().unwrap();
        match frame {
            Message::Text(text) => return ServerMessage::decode(text.as_str()).unwrap(),
            Message::Binary(bytes) => return ServerMessage::decode_bytes(&bytes).unwrap(),
            Message::Close(_) => panic!("connection closed"),
            _ => {},
        }
    }
}

fn members(names: &[&str]) -> ServerMessage {
    ServerMessage::Members { members: names.iter().map(ToString::to_string).collect() }
}

#[tokio::test]
async fn create_join_and_alert_over_websocket() {
    let addr = boot_server(100).await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;

    send(&mut alice, json!({"type": "create", "room": "42042", "name": "alice"})).await;
    assert_eq!(recv(&mut alice).await, ServerMessage::Created { room: "42042".into() });
    assert_eq!(recv(&mut alice).await, members(&["alice"]));

    send(&mut bob, json!({"type": "join", "room": "42042", "name": "bob"})).await;
    assert_eq!(recv(&mut bob).await, ServerMessage::Joined { room: "42042".into() });
    assert_eq!(recv(&mut bob).await, members(&["alice", "bob"]));
    assert_eq!(recv(&mut alice).await, members(&["alice", "bob"]));

    send(&mut alice, json!({"type": "emergency", "room": "42042", "name": "alice"})).await;
    assert!(matches!(recv(&mut bob).await, ServerMessage::Alert { message } if message.contains("alice")));
}

#[tokio::test]
async fn numeric_room_and_binary_frames_are_accepted() {
    let addr = boot_server(100).await;
    let mut alice = connect(addr).await;

    let body = json!({"type": "create", "room": 12345, "name": "alice"}).to_string();
    alice.send(Message::binary(body.into_bytes())).await.unwrap();

    assert_eq!(recv(&mut alice).await, ServerMessage::Created { room: "12345".into() });
}

#[tokio::test]
async fn malformed_messages_do_not_end_the_session() {
    let addr = boot_server(100).await;
    let mut alice = connect(addr).await;

    alice.send(Message::text("definitely not json".to_string())).await.unwrap();
    send(&mut alice, json!({"type": "typing"})).await;
    send(&mut alice, json!({"type": "join", "room": "99999", "name": "alice"})).await;

    assert_eq!(
        recv(&mut alice).await,
        ServerMessage::Error { message: "room 99999 does not exist".into() }
    );
}

#[tokio::test]
async fn disconnect_updates_remaining_members() {
    let addr = boot_server(100).await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;

    send(&mut alice, json!({"type": "create", "room": "55555", "name": "alice"})).await;
    recv(&mut alice).await;
    recv(&mut alice).await;

    send(&mut bob, json!({"type": "join", "room": "55555", "name": "bob"})).await;
    recv(&mut bob).await;
    recv(&mut bob).await;
    recv(&mut alice).await;

    bob.close(None).await.unwrap();
    drop(bob);

    assert_eq!(recv(&mut alice).await, members(&["alice"]));
}

#[tokio::test]
async fn connections_over_the_limit_are_closed() {
    let addr = boot_server(1).await;
    let _first = connect(addr).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut second = connect(addr).await;

    let frame = timeout(TIMEOUT, second.next()).await.unwrap();
    assert!(matches!(frame, Some(Ok(Message::Close(_))) | None | Some(Err(_))));
}
