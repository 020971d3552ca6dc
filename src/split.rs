//! `WSReader`/`WSWriter`: the connection facade split into independent halves (spec §4.5,
//! "a reader loop and a writer handle may live on different tasks"). Both sides share one
//! `Phase` atomic so a close observed on either end is visible to the other without a lock.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;

use crate::close::{encode_close_payload, parse_close_payload, CloseInfo};
use crate::config::WebSocketConfig;
use crate::connection::{Phase, Role, PHASE_CLOSED, PHASE_CLOSING, PHASE_OPEN};
use crate::error::{Error, RecvResult};
use crate::frame::{decode, encode, Frame, OpCode};
use crate::message::Message;
use crate::utils::generate_mask_key;

/// The write half of a connection. Cheaply `Clone`: every clone shares the same underlying
/// socket behind a mutex, so a reader task can hold one to send PONG/CLOSE replies while an
/// application task holds another to send data.
pub struct WSWriter<T> {
    write_half: Arc<Mutex<WriteHalf<T>>>,
    role: Role,
    phase: Arc<AtomicU8>,
}

impl<T> Clone for WSWriter<T> {
    fn clone(&self) -> Self {
        WSWriter { write_half: self.write_half.clone(), role: self.role, phase: self.phase.clone() }
    }
}

impl<T: AsyncWrite + Unpin> WSWriter<T> {
    pub(crate) fn new(write_half: WriteHalf<T>, role: Role, phase: Arc<AtomicU8>) -> Self {
        WSWriter { write_half: Arc::new(Mutex::new(write_half)), role, phase }
    }

    async fn write_frame(&self, frame: Frame, require_open: bool, flush: bool) -> Result<(), Error> {
        let phase = Phase::from_u8(self.phase.load(Ordering::SeqCst));
        if phase == Phase::Closed {
            return Err(Error::ConnectionClosed);
        }
        if require_open && phase != Phase::Open {
            return Err(Error::NotOpen);
        }

        let mask_key = match self.role {
            Role::Client => Some(generate_mask_key()),
            Role::Server => None,
        };
        let bytes = encode(&frame, mask_key);

        let mut socket = self.write_half.lock().await;
        socket.write_all(&bytes).await?;
        if flush {
            socket.flush().await?;
        }
        Ok(())
    }

    pub async fn send(&self, message: Message, flush: bool) -> Result<(), Error> {
        self.write_frame(Frame::new(true, message.opcode(), message.into_bytes()), true, flush).await
    }

    pub async fn send_fragment_start(&self, message: Message, flush: bool) -> Result<(), Error> {
        self.write_frame(Frame::new(false, message.opcode(), message.into_bytes()), true, flush).await
    }

    pub async fn send_fragment(&self, data: Vec<u8>, flush: bool) -> Result<(), Error> {
        self.write_frame(Frame::new(false, OpCode::Continuation, data), true, flush).await
    }

    pub async fn send_fragment_end(&self, data: Vec<u8>, flush: bool) -> Result<(), Error> {
        self.write_frame(Frame::new(true, OpCode::Continuation, data), true, flush).await
    }

    pub async fn ping(&self, payload: Vec<u8>, flush: bool) -> Result<(), Error> {
        self.write_frame(Frame::ping(payload), true, flush).await
    }

    pub(crate) async fn pong(&self, payload: Vec<u8>) -> Result<(), Error> {
        self.write_frame(Frame::pong(payload), false, true).await
    }

    /// Caller-initiated close: sends a CLOSE frame and moves the connection to `Closing`.
    /// A no-op if the connection is not currently `Open` (already closing, or closed).
    pub async fn close(&self, info: CloseInfo) -> Result<(), Error> {
        let transitioned = self
            .phase
            .compare_exchange(PHASE_OPEN, PHASE_CLOSING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if !transitioned {
            return Ok(());
        }
        self.write_frame(Frame::close(encode_close_payload(&info)), false, true).await
    }

    /// Echoes a CLOSE frame back to the peer in response to one we just received. Unlike
    /// `close`, this does not gate on phase — the reader has already done the compare-and-swap
    /// before calling this.
    pub(crate) async fn echo_close(&self, info: &CloseInfo) -> Result<(), Error> {
        self.write_frame(Frame::close(encode_close_payload(info)), false, true).await
    }
}

/// The read half of a connection: owns the incoming byte buffer, the frame decoder and the
/// fragment assembler, and auto-replies to PING/CLOSE via its `WSWriter` clone.
pub struct WSReader<T> {
    read_half: ReadHalf<T>,
    recv_buf: BytesMut,
    assembler: crate::assembler::MessageAssembler,
    writer: WSWriter<T>,
    phase: Arc<AtomicU8>,
    role: Role,
    config: WebSocketConfig,
    final_status: Option<CloseInfo>,
}

impl<T: AsyncRead + Unpin> WSReader<T> {
    pub(crate) fn new(
        read_half: ReadHalf<T>,
        writer: WSWriter<T>,
        phase: Arc<AtomicU8>,
        role: Role,
        config: WebSocketConfig,
    ) -> Self {
        WSReader {
            read_half,
            recv_buf: BytesMut::new(),
            assembler: crate::assembler::MessageAssembler::new(config.max_payload),
            writer,
            phase,
            role,
            config,
            final_status: None,
        }
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> WSReader<T> {
    async fn read_decoded_frame(&mut self) -> Result<crate::frame::DecodedFrame, Error> {
        loop {
            if let Some(decoded) = decode(&self.recv_buf, self.config.max_payload)? {
                self.recv_buf.advance(decoded.consumed);
                return Ok(decoded);
            }
            let n = self.read_half.read_buf(&mut self.recv_buf).await?;
            if n == 0 {
                return Err(Error::Io {
                    source: std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "peer closed the connection without a closing handshake",
                    ),
                });
            }
        }
    }

    /// One step of the receive loop: reads exactly one wire frame and either returns a
    /// completed application message, or `None` when the frame was a control frame (or an
    /// in-progress fragment) that the caller should just loop past.
    async fn recv_step(&mut self) -> Result<Option<Message>, Error> {
        let decoded = self.read_decoded_frame().await?;
        if self.role == Role::Server && !decoded.masked {
            return Err(Error::UnmaskedClientFrame);
        }
        let frame = decoded.frame;

        match frame.opcode {
            OpCode::Ping => {
                self.writer.pong(frame.payload).await?;
                Ok(None)
            }
            OpCode::Pong => Ok(None),
            OpCode::Close => {
                let info = parse_close_payload(&frame.payload);
                // Gate on Open -> Closing, not Open -> Closed: the echo still has to go out
                // over `write_frame`, which refuses to write at all once phase is `Closed`.
                let need_echo = self
                    .phase
                    .compare_exchange(PHASE_OPEN, PHASE_CLOSING, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok();
                let echo_result =
                    if need_echo { self.writer.echo_close(&info).await } else { Ok(()) };
                self.phase.store(PHASE_CLOSED, Ordering::SeqCst);
                self.final_status = Some(info);
                echo_result?;
                Ok(None)
            }
            OpCode::Text | OpCode::Binary | OpCode::Continuation => self.assembler.push(frame),
        }
    }

    /// Waits for the next application message. See `WebSocketConnection::recv` for the
    /// end-of-stream contract this implements.
    pub async fn recv(&mut self) -> Option<RecvResult> {
        loop {
            if Phase::from_u8(self.phase.load(Ordering::SeqCst)) == Phase::Closed {
                return None;
            }
            match self.recv_step().await {
                Ok(Some(message)) => return Some(Ok(message)),
                Ok(None) => continue,
                Err(e) => {
                    // `recv_step` may already have finalized (e.g. the CLOSE arm above ran and
                    // its own echo failed, propagating the write error here): don't clobber the
                    // close info it recorded or send a second CLOSE frame in that case.
                    if self.final_status.is_none() {
                        let info = CloseInfo::new(e.close_code(), e.to_string());
                        let need_echo = self
                            .phase
                            .compare_exchange(PHASE_OPEN, PHASE_CLOSING, Ordering::SeqCst, Ordering::SeqCst)
                            .is_ok();
                        if need_echo {
                            if let Err(write_err) = self.writer.echo_close(&info).await {
                                log::warn!("failed to send closing CLOSE frame: {write_err}");
                            }
                        }
                        self.final_status = Some(info);
                    }
                    self.phase.store(PHASE_CLOSED, Ordering::SeqCst);
                    return Some(Err(e));
                }
            }
        }
    }

    pub fn final_status(&self) -> Option<&CloseInfo> {
        self.final_status.as_ref()
    }

    pub fn writer(&self) -> WSWriter<T> {
        self.writer.clone()
    }
}
