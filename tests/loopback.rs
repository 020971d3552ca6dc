//! End-to-end scenarios driven over `tokio::io::duplex` in-memory pipes instead of real
//! sockets: the transport is an external collaborator, so an in-memory duplex is a faithful
//! stand-in for TCP for everything this crate controls (framing, handshake, fragmentation,
//! closing).
//!
//! Each test plays the role of a bare-wire client talking to a real `WebSocketConnection`
//! server, so assertions can inspect exact bytes the server produced.

use beacon_ws::close::CloseCode;
use beacon_ws::frame::{decode, encode, DecodedFrame, Frame, OpCode};
use beacon_ws::handshake::accept_async;
use beacon_ws::message::Message;

use bytes::{Buf, BytesMut};
use tokio::io::{split, AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

const MASK_KEY: [u8; 4] = [0x12, 0x34, 0x56, 0x78];

fn client_handshake_request() -> Vec<u8> {
    b"GET /chat HTTP/1.1\r\n\
      Upgrade: websocket\r\n\
      Connection: Upgrade\r\n\
      Host: localhost\r\n\
      Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
      Sec-WebSocket-Version: 13\r\n\
      \r\n"
        .to_vec()
}

async fn read_http_response(read_half: &mut ReadHalf<DuplexStream>) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 256];
    loop {
        let n = read_half.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            return String::from_utf8_lossy(&buf).into_owned();
        }
    }
}

async fn read_one_frame(read_half: &mut ReadHalf<DuplexStream>, buf: &mut BytesMut) -> DecodedFrame {
    loop {
        if let Some(decoded) = decode(buf, 64 << 20).unwrap() {
            buf.advance(decoded.consumed);
            return decoded;
        }
        let n = read_half.read_buf(buf).await.unwrap();
        assert!(n > 0, "server closed the socket mid-frame");
    }
}

/// Performs the handshake over a fresh in-memory pipe and hands back the raw client halves
/// plus the server's `WebSocketConnection`, ready for a test to drive both sides by hand.
async fn open_pair() -> (ReadHalf<DuplexStream>, WriteHalf<DuplexStream>, beacon_ws::WebSocketConnection<DuplexStream>) {
    let (client_io, server_io) = tokio::io::duplex(1 << 20);
    let server_task = tokio::spawn(async move { accept_async(server_io).await.unwrap() });

    let (mut client_read, mut client_write) = split(client_io);
    client_write.write_all(&client_handshake_request()).await.unwrap();
    let response = read_http_response(&mut client_read).await;
    assert!(response.starts_with("HTTP/1.1 101"));

    let server_conn = server_task.await.unwrap();
    (client_read, client_write, server_conn)
}

/// Spawns a task that echoes every message the server receives back to the client, and
/// returns its write handle so the test can also send out-of-band pings etc. from the server
/// side if needed.
fn spawn_echo(mut server_conn: beacon_ws::WebSocketConnection<DuplexStream>) {
    tokio::spawn(async move {
        while let Some(result) = server_conn.recv().await {
            match result {
                Ok(message) => {
                    let _ = server_conn.send(message).await;
                }
                Err(_) => break,
            }
        }
    });
}

#[tokio::test]
async fn hello_message_round_trips_through_the_server() {
    let (mut client_read, mut client_write, server_conn) = open_pair().await;
    spawn_echo(server_conn);

    let frame = Frame::new(true, OpCode::Text, b"hello".to_vec());
    client_write.write_all(&encode(&frame, Some(MASK_KEY))).await.unwrap();

    let mut buf = BytesMut::new();
    let decoded = read_one_frame(&mut client_read, &mut buf).await;
    assert!(!decoded.masked, "server-to-client frames must not be masked");
    assert_eq!(decoded.frame.opcode, OpCode::Text);
    assert_eq!(decoded.frame.payload, b"hello");
}

#[tokio::test]
async fn large_binary_message_round_trips_unfragmented() {
    let (mut client_read, mut client_write, server_conn) = open_pair().await;
    spawn_echo(server_conn);

    let payload = vec![0xABu8; 200_000];
    let frame = Frame::new(true, OpCode::Binary, payload.clone());
    client_write.write_all(&encode(&frame, Some(MASK_KEY))).await.unwrap();

    let mut buf = BytesMut::new();
    let decoded = read_one_frame(&mut client_read, &mut buf).await;
    assert_eq!(decoded.frame.opcode, OpCode::Binary);
    assert_eq!(decoded.frame.payload, payload);
}

#[tokio::test]
async fn three_fragment_text_message_reassembles_before_echo() {
    let (mut client_read, mut client_write, server_conn) = open_pair().await;
    spawn_echo(server_conn);

    for (fin, opcode, chunk) in [
        (false, OpCode::Text, b"he".as_slice()),
        (false, OpCode::Continuation, b"ll".as_slice()),
        (true, OpCode::Continuation, b"o".as_slice()),
    ] {
        let frame = Frame::new(fin, opcode, chunk.to_vec());
        client_write.write_all(&encode(&frame, Some(MASK_KEY))).await.unwrap();
    }

    let mut buf = BytesMut::new();
    let decoded = read_one_frame(&mut client_read, &mut buf).await;
    assert_eq!(decoded.frame.opcode, OpCode::Text);
    assert_eq!(decoded.frame.payload, b"hello");
    assert!(decoded.frame.fin);
}

#[tokio::test]
async fn ping_mid_stream_gets_an_immediate_pong_and_does_not_disturb_messages() {
    let (mut client_read, mut client_write, server_conn) = open_pair().await;
    spawn_echo(server_conn);

    let ping = Frame::ping(b"are-you-there".to_vec());
    client_write.write_all(&encode(&ping, Some(MASK_KEY))).await.unwrap();

    let mut buf = BytesMut::new();
    let pong = read_one_frame(&mut client_read, &mut buf).await;
    assert_eq!(pong.frame.opcode, OpCode::Pong);
    assert_eq!(pong.frame.payload, b"are-you-there");

    let text = Frame::new(true, OpCode::Text, b"still here".to_vec());
    client_write.write_all(&encode(&text, Some(MASK_KEY))).await.unwrap();
    let echoed = read_one_frame(&mut client_read, &mut buf).await;
    assert_eq!(echoed.frame.payload, b"still here");
}

#[tokio::test]
async fn rsv1_set_without_an_extension_closes_the_connection_with_protocol_error() {
    let (mut client_read, mut client_write, server_conn) = open_pair().await;
    spawn_echo(server_conn);

    // fin=1, rsv1=1, opcode=Text, masked, len=0.
    let bad_header = [0b1100_0001u8, 0b1000_0000u8];
    client_write.write_all(&bad_header).await.unwrap();
    client_write.write_all(&MASK_KEY).await.unwrap();

    let mut buf = BytesMut::new();
    let close = read_one_frame(&mut client_read, &mut buf).await;
    assert_eq!(close.frame.opcode, OpCode::Close);
    let status = u16::from_be_bytes([close.frame.payload[0], close.frame.payload[1]]);
    assert_eq!(status, CloseCode::PROTOCOL_ERROR.0);
}

#[tokio::test]
async fn close_frame_with_invalid_utf8_reason_remaps_status_to_protocol_error() {
    let (mut client_read, mut client_write, server_conn) = open_pair().await;
    spawn_echo(server_conn);

    // status 1000 (NORMAL) followed by an invalid UTF-8 reason.
    let payload = vec![0x03, 0xE8, 0xFF, 0xFE];
    let close = Frame::close(payload);
    client_write.write_all(&encode(&close, Some(MASK_KEY))).await.unwrap();

    let mut buf = BytesMut::new();
    let reply = read_one_frame(&mut client_read, &mut buf).await;
    assert_eq!(reply.frame.opcode, OpCode::Close);
    let status = u16::from_be_bytes([reply.frame.payload[0], reply.frame.payload[1]]);
    assert_eq!(status, CloseCode::PROTOCOL_ERROR.0);
}

#[tokio::test]
async fn normal_close_handshake_completes_from_the_server_side() {
    let (mut client_read, mut client_write, server_conn) = open_pair().await;
    spawn_echo(server_conn);

    let close = Frame::close(Vec::new());
    client_write.write_all(&encode(&close, Some(MASK_KEY))).await.unwrap();

    let mut buf = BytesMut::new();
    let reply = read_one_frame(&mut client_read, &mut buf).await;
    assert_eq!(reply.frame.opcode, OpCode::Close);
    assert!(reply.frame.payload.is_empty());
}

#[tokio::test]
async fn unmasked_client_frame_is_rejected() {
    let (mut client_read, mut client_write, server_conn) = open_pair().await;
    spawn_echo(server_conn);

    let frame = Frame::new(true, OpCode::Text, b"no mask".to_vec());
    client_write.write_all(&encode(&frame, None)).await.unwrap();

    let mut buf = BytesMut::new();
    let reply = read_one_frame(&mut client_read, &mut buf).await;
    assert_eq!(reply.frame.opcode, OpCode::Close);
    let status = u16::from_be_bytes([reply.frame.payload[0], reply.frame.payload[1]]);
    assert_eq!(status, CloseCode::PROTOCOL_ERROR.0);
}

#[tokio::test]
async fn send_fragment_api_produces_correctly_marked_wire_frames() {
    let (mut client_read, mut client_write, server_conn) = open_pair().await;
    let (mut reader, writer) = server_conn.split();

    tokio::spawn(async move {
        if let Some(Ok(_)) = reader.recv().await {
            writer.send_fragment_start(Message::Text("fir".into()), false).await.unwrap();
            writer.send_fragment(b"st-".to_vec(), false).await.unwrap();
            writer.send_fragment_end(b"part".to_vec(), true).await.unwrap();
        }
    });

    let frame = Frame::new(true, OpCode::Text, b"go".to_vec());
    client_write.write_all(&encode(&frame, Some(MASK_KEY))).await.unwrap();

    let mut buf = BytesMut::new();
    let f1 = read_one_frame(&mut client_read, &mut buf).await;
    assert!(!f1.frame.fin);
    assert_eq!(f1.frame.opcode, OpCode::Text);
    let f2 = read_one_frame(&mut client_read, &mut buf).await;
    assert!(!f2.frame.fin);
    assert_eq!(f2.frame.opcode, OpCode::Continuation);
    let f3 = read_one_frame(&mut client_read, &mut buf).await;
    assert!(f3.frame.fin);
    assert_eq!(f3.frame.opcode, OpCode::Continuation);
    assert_eq!([f1.frame.payload, f2.frame.payload, f3.frame.payload].concat(), b"first-part");
}
