//! Integration tests for wslink.
//!
//! These tests run the client against a minimal WebSocket server on a
//! local TCP listener.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use wslink::protocol::{Frame, FrameBuffer, OpCode};
use wslink::{Client, ConnectionState, Endpoint, Event, ReconnectStatus, WsError};

const ACCEPT: &str =
    "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n";

async fn listen() -> (TcpListener, Endpoint) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, Endpoint::new("127.0.0.1", port, "/ws"))
}

/// Accept one connection, read the Upgrade request and answer with `response`.
async fn accept_with(listener: &TcpListener, response: &str) -> (TcpStream, String) {
    let (mut stream, _) = listener.accept().await.unwrap();
    let mut request = Vec::new();
    let mut chunk = [0u8; 512];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client hung up during handshake");
        request.extend_from_slice(&chunk[..n]);
    }
    stream.write_all(response.as_bytes()).await.unwrap();
    (stream, String::from_utf8(request).unwrap())
}

/// Read the next client frame, unmasked.
async fn next_frame(stream: &mut TcpStream, buffer: &mut FrameBuffer) -> Frame {
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(frame) = buffer.next_frame().unwrap() {
            return frame;
        }
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client hung up");
        buffer.extend(&chunk[..n]);
    }
}

fn server_frame(first: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![first];
    if payload.len() <= 125 {
        bytes.push(payload.len() as u8);
    } else {
        bytes.push(126);
        bytes.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    }
    bytes.extend_from_slice(payload);
    bytes
}

async fn poll_until_message(client: &mut Client) -> String {
    for _ in 0..50 {
        if let Event::Message(text) = client.poll::<String>().await.unwrap() {
            return text;
        }
    }
    panic!("no message received");
}

/// Handshake accepted, then a 300-byte text frame using the 16-bit length.
#[tokio::test]
async fn test_handshake_then_extended_length_text() {
    let (listener, endpoint) = listen().await;
    let text = "x".repeat(298);
    let json = format!("\"{}\"", text);
    assert_eq!(json.len(), 300);

    let server = tokio::spawn(async move {
        let (mut stream, request) = accept_with(&listener, ACCEPT).await;
        stream
            .write_all(&server_frame(0x81, json.as_bytes()))
            .await
            .unwrap();
        (stream, request)
    });

    let mut client = Client::builder().build_tcp(endpoint).unwrap();
    client.connect().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Open);

    assert_eq!(poll_until_message(&mut client).await, text);

    let (_stream, request) = server.await.unwrap();
    assert!(request.starts_with("GET /ws HTTP/1.1\r\n"));
    assert!(request.contains("Upgrade: websocket\r\n"));
    assert!(request.contains("Sec-WebSocket-Version: 13\r\n"));
}

/// Response headers split over two segments, with a frame right behind them.
#[tokio::test]
async fn test_handshake_headers_in_two_segments() {
    let (listener, endpoint) = listen().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = accept_with(&listener, "HTTP/1.1 101 Switching Protocols\r\n").await;
        stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let mut rest = b"Upgrade: websocket\r\nConnection: Upgrade\r\n\r\n".to_vec();
        rest.extend(server_frame(0x81, b"\"hi\""));
        stream.write_all(&rest).await.unwrap();
        stream
    });

    let mut client = Client::builder().build_tcp(endpoint).unwrap();
    client.connect().await.unwrap();

    assert_eq!(poll_until_message(&mut client).await, "hi");
    assert_eq!(client.state(), ConnectionState::Open);
    drop(server.await.unwrap());
}

/// A non-101 answer fails the handshake and the socket is released.
#[tokio::test]
async fn test_handshake_404_releases_socket() {
    let (listener, endpoint) = listen().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) =
            accept_with(&listener, "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n").await;
        let mut rest = [0u8; 64];
        // EOF once the client drops its end
        stream.read(&mut rest).await.unwrap_or(0)
    });

    let mut client = Client::builder().build_tcp(endpoint).unwrap();
    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, WsError::HandshakeFailed(_)));
    assert_ne!(client.state(), ConnectionState::Open);

    assert_eq!(server.await.unwrap(), 0);
}

/// Client frames are masked; pings are answered with an identical pong.
#[tokio::test]
async fn test_masked_send_and_ping_pong() {
    let (listener, endpoint) = listen().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = accept_with(&listener, ACCEPT).await;
        let mut buffer = FrameBuffer::new();

        // Mask bit must be set on everything the client writes
        let mut header = [0u8; 2];
        stream.read_exact(&mut header).await.unwrap();
        assert_eq!(header[0], 0x81);
        assert_eq!(header[1] & 0x80, 0x80);
        buffer.extend(&header);
        let text = next_frame(&mut stream, &mut buffer).await;

        stream
            .write_all(&server_frame(0x89, b"still there?"))
            .await
            .unwrap();
        let pong = next_frame(&mut stream, &mut buffer).await;
        (text, pong)
    });

    let mut client = Client::builder().build_tcp(endpoint).unwrap();
    client.connect().await.unwrap();
    client.send_text("hello robot").await.unwrap();

    while !server.is_finished() {
        assert_eq!(client.poll::<String>().await.unwrap(), Event::NoData);
    }

    let (text, pong) = server.await.unwrap();
    assert_eq!(text.opcode, OpCode::Text);
    assert_eq!(text.payload(), b"hello robot");
    assert_eq!(pong.opcode, OpCode::Pong);
    assert_eq!(pong.payload(), b"still there?");
}

/// Server drops the connection; the client reconnects and identifies again.
#[tokio::test]
async fn test_reconnect_after_server_drop() {
    let (listener, endpoint) = listen().await;
    let identify = r#"{"client":"Robot"}"#;

    let server = tokio::spawn(async move {
        let mut identities = Vec::new();
        for _ in 0..2 {
            let (mut stream, _) = accept_with(&listener, ACCEPT).await;
            let mut buffer = FrameBuffer::new();
            let frame = next_frame(&mut stream, &mut buffer).await;
            identities.push(String::from_utf8(frame.payload().to_vec()).unwrap());
        }
        identities
    });

    let mut client = Client::builder()
        .identify(identify)
        .reconnect_backoff(Duration::from_millis(50))
        .min_attempt_spacing(Duration::from_millis(50))
        .build_tcp(endpoint)
        .unwrap();
    client.connect().await.unwrap();

    let mut lost = false;
    for _ in 0..50 {
        if client.poll::<String>().await.unwrap() == Event::ConnectionLost {
            lost = true;
            break;
        }
    }
    assert!(lost, "server drop not detected");

    let mut reconnected = false;
    for _ in 0..50 {
        if client.recover().await.unwrap() == ReconnectStatus::Reconnected {
            reconnected = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(reconnected);
    assert_eq!(client.state(), ConnectionState::Open);

    let identities = server.await.unwrap();
    assert_eq!(identities, vec![identify.to_string(), identify.to_string()]);
}

/// Local close sends a close frame with status 1000.
#[tokio::test]
async fn test_close_sends_normal_closure() {
    let (listener, endpoint) = listen().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = accept_with(&listener, ACCEPT).await;
        let mut buffer = FrameBuffer::new();
        next_frame(&mut stream, &mut buffer).await
    });

    let mut client = Client::builder().build_tcp(endpoint).unwrap();
    client.connect().await.unwrap();
    client.close().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let frame = server.await.unwrap();
    assert_eq!(frame.opcode, OpCode::Close);
    assert_eq!(frame.payload(), &1000u16.to_be_bytes());
}
