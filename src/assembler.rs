//! Fragmentation reassembly (spec §4.3). Receives data and continuation frames — control
//! frames never reach this component, they are fully handled by the interleave layer before
//! the assembler sees anything — and emits a completed `Message` once a sequence finishes.

use crate::error::Error;
use crate::frame::{Frame, OpCode};
use crate::message::Message;

/// Incremental UTF-8 validator for fragmented text. Keeps only the trailing incomplete
/// multi-byte sequence (at most 3 bytes) between pushes, so a very large fragmented text
/// message never requires buffering both the encoded bytes and the decoded string twice.
#[derive(Debug, Default)]
struct Utf8Streamer {
    text: String,
    pending: Vec<u8>,
}

impl Utf8Streamer {
    fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(valid) => {
                self.text.push_str(valid);
                self.pending.clear();
                Ok(())
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                let valid = std::str::from_utf8(&self.pending[..valid_up_to])
                    .expect("prefix up to valid_up_to is valid UTF-8 by construction");
                self.text.push_str(valid);
                match e.error_len() {
                    // `None` means the tail is an incomplete (not invalid) sequence —
                    // acceptable mid-stream, to be completed by the next fragment.
                    None => {
                        self.pending.drain(..valid_up_to);
                        Ok(())
                    }
                    Some(_) => Err(Error::InvalidUtf8Payload),
                }
            }
        }
    }

    fn finish(self) -> Result<String, Error> {
        if !self.pending.is_empty() {
            return Err(Error::InvalidUtf8Payload);
        }
        Ok(self.text)
    }
}

#[derive(Debug)]
enum Reassembly {
    Idle,
    Text { decoder: Utf8Streamer, len: usize },
    Binary { buf: Vec<u8> },
}

/// Owns the in-progress fragmented message, if any, for one connection direction.
#[derive(Debug)]
pub struct MessageAssembler {
    state: Reassembly,
    max_payload: usize,
}

impl MessageAssembler {
    pub fn new(max_payload: usize) -> Self {
        MessageAssembler { state: Reassembly::Idle, max_payload }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, Reassembly::Idle)
    }

    /// Feeds one data or continuation frame (never a control frame) into the assembler.
    /// Returns `Some(message)` once a full message has been reassembled.
    pub fn push(&mut self, frame: Frame) -> Result<Option<Message>, Error> {
        match frame.opcode {
            OpCode::Text | OpCode::Binary => self.push_data(frame),
            OpCode::Continuation => self.push_continuation(frame),
            _ => unreachable!("control frames must be handled before reaching the assembler"),
        }
    }

    fn push_data(&mut self, frame: Frame) -> Result<Option<Message>, Error> {
        if !self.is_idle() {
            return Err(Error::FragmentationProtocolError);
        }

        if frame.fin {
            return self.finish_unfragmented(frame).map(Some);
        }

        let len = frame.payload.len();
        self.check_bound(len)?;

        self.state = match frame.opcode {
            OpCode::Text => {
                let mut decoder = Utf8Streamer::new();
                decoder.push(&frame.payload)?;
                Reassembly::Text { decoder, len }
            }
            OpCode::Binary => Reassembly::Binary { buf: frame.payload },
            _ => unreachable!(),
        };
        Ok(None)
    }

    fn push_continuation(&mut self, frame: Frame) -> Result<Option<Message>, Error> {
        match std::mem::replace(&mut self.state, Reassembly::Idle) {
            Reassembly::Idle => Err(Error::InvalidContinuation),
            Reassembly::Text { mut decoder, len } => {
                let new_len = len + frame.payload.len();
                self.check_bound(new_len)?;
                decoder.push(&frame.payload)?;
                if frame.fin {
                    Ok(Some(Message::Text(decoder.finish()?)))
                } else {
                    self.state = Reassembly::Text { decoder, len: new_len };
                    Ok(None)
                }
            }
            Reassembly::Binary { mut buf } => {
                buf.extend_from_slice(&frame.payload);
                self.check_bound(buf.len())?;
                if frame.fin {
                    Ok(Some(Message::Binary(buf)))
                } else {
                    self.state = Reassembly::Binary { buf };
                    Ok(None)
                }
            }
        }
    }

    fn finish_unfragmented(&mut self, frame: Frame) -> Result<Message, Error> {
        self.check_bound(frame.payload.len())?;
        match frame.opcode {
            OpCode::Text => {
                let text = String::from_utf8(frame.payload).map_err(|_| Error::InvalidUtf8Payload)?;
                Ok(Message::Text(text))
            }
            OpCode::Binary => Ok(Message::Binary(frame.payload)),
            _ => unreachable!(),
        }
    }

    fn check_bound(&self, cumulative_len: usize) -> Result<(), Error> {
        if cumulative_len > self.max_payload {
            Err(Error::PayloadTooLarge(cumulative_len as u64, self.max_payload))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(fin: bool, opcode: OpCode, payload: &[u8]) -> Frame {
        Frame::new(fin, opcode, payload.to_vec())
    }

    #[test]
    fn three_fragment_text_message_reassembles_exactly() {
        let mut assembler = MessageAssembler::new(1024);
        assert!(assembler.push(frame(false, OpCode::Text, b"he")).unwrap().is_none());
        assert!(assembler.push(frame(false, OpCode::Continuation, b"ll")).unwrap().is_none());
        let msg = assembler.push(frame(true, OpCode::Continuation, b"o")).unwrap();
        assert_eq!(msg, Some(Message::Text("hello".to_string())));
        assert!(assembler.is_idle());
    }

    #[test]
    fn arbitrary_byte_splits_of_utf8_reassemble_to_the_original() {
        let s = "héllo wörld 🎉 — rust";
        let bytes = s.as_bytes();
        for split in 0..=bytes.len() {
            let mut assembler = MessageAssembler::new(1 << 20);
            assembler.push(frame(false, OpCode::Text, &bytes[..split])).unwrap();
            let msg = assembler
                .push(frame(true, OpCode::Continuation, &bytes[split..]))
                .unwrap()
                .unwrap();
            assert_eq!(msg, Message::Text(s.to_string()));
        }
    }

    #[test]
    fn invalid_utf8_fails_even_when_split_mid_codepoint() {
        let mut assembler = MessageAssembler::new(1024);
        // 0xC0 0x80 is an overlong (invalid) encoding, not merely incomplete.
        let result = assembler.push(frame(true, OpCode::Text, &[0xC0, 0x80]));
        assert!(matches!(result, Err(Error::InvalidUtf8Payload)));
    }

    #[test]
    fn binary_reassembly_concatenates_fragments() {
        let mut assembler = MessageAssembler::new(1024);
        assembler.push(frame(false, OpCode::Binary, &[1, 2, 3])).unwrap();
        let msg = assembler
            .push(frame(true, OpCode::Continuation, &[4, 5]))
            .unwrap()
            .unwrap();
        assert_eq!(msg, Message::Binary(vec![1, 2, 3, 4, 5]));
    }

    #[test]
    fn cumulative_bound_triggers_before_delivery() {
        let mut assembler = MessageAssembler::new(4);
        assembler.push(frame(false, OpCode::Binary, &[1, 2, 3])).unwrap();
        let result = assembler.push(frame(true, OpCode::Continuation, &[4, 5]));
        assert!(matches!(result, Err(Error::PayloadTooLarge(5, 4))));
    }

    #[test]
    fn continuation_without_start_is_rejected() {
        let mut assembler = MessageAssembler::new(1024);
        let result = assembler.push(frame(true, OpCode::Continuation, b"x"));
        assert!(matches!(result, Err(Error::InvalidContinuation)));
    }

    #[test]
    fn nested_data_frame_while_fragmenting_is_rejected() {
        let mut assembler = MessageAssembler::new(1024);
        assembler.push(frame(false, OpCode::Text, b"a")).unwrap();
        let result = assembler.push(frame(true, OpCode::Binary, b"b"));
        assert!(matches!(result, Err(Error::FragmentationProtocolError)));
    }
}
