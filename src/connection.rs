//! The connection facade (spec §4.5): binds the frame codec, the close state machine and the
//! message assembler together over one transport, and exposes the small surface applications
//! actually call — `send`, `recv`, `ping`, `close` — plus a `split` for handing the write half
//! to a different task than the one driving `recv`.

use std::sync::atomic::AtomicU8;
use std::sync::Arc;

use tokio::io::{split, AsyncRead, AsyncWrite, ReadHalf, WriteHalf};

use crate::close::{CloseCode, CloseInfo};
use crate::config::WebSocketConfig;
use crate::error::{Error, RecvResult};
use crate::message::Message;
use crate::split::{WSReader, WSWriter};

/// Which side of the handshake this connection played. Controls masking direction (spec §5.3:
/// client frames are masked, server frames are not) and whether an unmasked frame is a
/// protocol error (servers reject them; see spec §4 open question on masking enforcement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

pub(crate) const PHASE_OPEN: u8 = 0;
pub(crate) const PHASE_CLOSING: u8 = 1;
pub(crate) const PHASE_CLOSED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Open,
    Closing,
    Closed,
}

impl Phase {
    pub(crate) fn from_u8(byte: u8) -> Phase {
        match byte {
            PHASE_OPEN => Phase::Open,
            PHASE_CLOSING => Phase::Closing,
            _ => Phase::Closed,
        }
    }
}

/// An open WebSocket connection, already past the opening handshake. Constructed only by
/// `handshake::accept_async`/`handshake::connect_async` (and their `_with_config` variants).
pub struct WebSocketConnection<T> {
    reader: WSReader<T>,
    writer: WSWriter<T>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> WebSocketConnection<T> {
    pub(crate) fn new(role: Role, transport: T, config: WebSocketConfig) -> Self {
        let (read_half, write_half): (ReadHalf<T>, WriteHalf<T>) = split(transport);
        let phase = Arc::new(AtomicU8::new(PHASE_OPEN));
        let writer = WSWriter::new(write_half, role, phase.clone());
        let reader = WSReader::new(read_half, writer.clone(), phase, role, config);
        WebSocketConnection { reader, writer }
    }

    /// Sends `message` as a single unfragmented data frame.
    pub async fn send(&self, message: impl Into<Message>) -> Result<(), Error> {
        self.writer.send(message.into(), false).await
    }

    /// Like `send`, but forces the underlying transport to flush before returning.
    pub async fn send_flush(&self, message: impl Into<Message>) -> Result<(), Error> {
        self.writer.send(message.into(), true).await
    }

    /// Begins a fragmented message: a data frame with `fin = 0`. Must be followed by zero or
    /// more `send_fragment` calls and exactly one `send_fragment_end`.
    pub async fn send_fragment_start(&self, message: impl Into<Message>) -> Result<(), Error> {
        self.writer.send_fragment_start(message.into(), false).await
    }

    /// A continuation fragment with `fin = 0`.
    pub async fn send_fragment(&self, data: Vec<u8>) -> Result<(), Error> {
        self.writer.send_fragment(data, false).await
    }

    /// The final continuation fragment, with `fin = 1`, closing out the fragmented message.
    pub async fn send_fragment_end(&self, data: Vec<u8>) -> Result<(), Error> {
        self.writer.send_fragment_end(data, true).await
    }

    /// Sends a PING control frame. The peer is expected to reply with a PONG carrying the
    /// same payload; this crate does not wait for it.
    pub async fn ping(&self, payload: Vec<u8>) -> Result<(), Error> {
        self.writer.ping(payload, true).await
    }

    /// Starts the closing handshake with `status`/`reason`. A no-op if a close is already in
    /// progress or finished (spec invariant: a second `close()` call never sends a second
    /// CLOSE frame).
    pub async fn close(&self, status: CloseCode, reason: impl Into<String>) -> Result<(), Error> {
        self.writer.close(CloseInfo::new(status, reason)).await
    }

    /// `close` with a normal (1000, empty reason) status.
    pub async fn close_normal(&self) -> Result<(), Error> {
        self.writer.close(CloseInfo::normal()).await
    }

    /// Waits for the next complete application message. Returns `None` once the connection
    /// has finished closing (cleanly or by error) — a second call after `None` also returns
    /// `None`. Ping/pong/close frames are absorbed internally and never surface here.
    pub async fn recv(&mut self) -> Option<RecvResult> {
        self.reader.recv().await
    }

    /// The status/reason the connection finally closed with, once known.
    pub fn final_status(&self) -> Option<&CloseInfo> {
        self.reader.final_status()
    }

    /// Splits the connection into an independent reader and writer, so the read loop can run
    /// on one task while the writer is handed to code that sends on a different one (the
    /// shape the server accept harness needs).
    pub fn split(self) -> (WSReader<T>, WSWriter<T>) {
        (self.reader, self.writer)
    }
}
