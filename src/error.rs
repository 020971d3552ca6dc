use std::io;
use std::string::FromUtf8Error;
use thiserror::Error;
use tokio::sync::mpsc::error::SendError;
use tokio::time::error::Elapsed;
use url::ParseError;

use crate::close::CloseCode;
use crate::message::Message;

/// Every fallible operation in the crate returns this type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("{source}")]
    Timeout {
        #[from]
        source: Elapsed,
    },

    #[error("{source}")]
    Utf8 {
        #[from]
        source: FromUtf8Error,
    },

    #[error("{source}")]
    UrlParse {
        #[from]
        source: ParseError,
    },

    #[error("{source}")]
    HttpParse {
        #[from]
        source: httparse::Error,
    },

    #[error("channel closed while forwarding a message")]
    ChannelClosed,

    // --- Handshake errors -------------------------------------------------
    #[error("incomplete HTTP request")]
    IncompleteHttpRequest,

    #[error("Sec-WebSocket-Key header missing from the request")]
    MissingSecWebSocketKey,

    #[error("Upgrade: websocket header missing or malformed")]
    MissingUpgradeHeader,

    #[error("Connection: Upgrade header missing or malformed")]
    MissingConnectionHeader,

    #[error("Host header missing from the request")]
    MissingHostHeader,

    #[error("handshake response had no Sec-WebSocket-Accept header")]
    MissingAcceptHeader,

    #[error("Sec-WebSocket-Accept value did not match the expected digest")]
    InvalidAcceptKey,

    #[error("handshake header block exceeded the {0}-byte limit")]
    HeaderTooLarge(usize),

    #[error("unsupported URL scheme for a websocket endpoint")]
    InvalidScheme,

    #[error("websocket URL has no host")]
    MissingHost,

    #[error("host is not a valid TLS server name")]
    InvalidTlsServerName,

    // --- Framing errors -----------------------------------------------------
    #[error("RSV bits must be zero")]
    RsvNotZero,

    #[error("unknown or reserved opcode")]
    UnknownOpcode,

    #[error("control frames must not be fragmented")]
    ControlFrameFragmented,

    #[error("control frame payload exceeds 125 bytes")]
    ControlFramePayloadTooLarge,

    #[error("frame payload of {0} bytes exceeds the {1}-byte limit")]
    PayloadTooLarge(u64, usize),

    #[error("client frame was not masked")]
    UnmaskedClientFrame,

    // --- Fragmentation / assembly errors -------------------------------------
    #[error("frame arrived with fin=0 or fin=1 while no fragmented message is in progress")]
    FragmentationProtocolError,

    #[error("continuation frame received with no fragmented message in progress")]
    InvalidContinuation,

    #[error("text payload was not valid UTF-8")]
    InvalidUtf8Payload,

    // --- Connection state errors ---------------------------------------------
    #[error("connection is already closed")]
    ConnectionClosed,

    #[error("send requested while the handshake has not completed")]
    NotOpen,
}

impl<T> From<SendError<T>> for Error {
    fn from(_: SendError<T>) -> Self {
        Error::ChannelClosed
    }
}

impl Error {
    /// Maps a protocol-level error to the close code it must be reported with (spec §7).
    /// Errors that are never surfaced on the wire (I/O, timeouts not tied to framing) fall
    /// back to 1002, which is also what the core uses for "fault of unknown shape".
    pub fn close_code(&self) -> CloseCode {
        match self {
            Error::PayloadTooLarge(_, _) | Error::HeaderTooLarge(_) => CloseCode::MESSAGE_TOO_BIG,
            _ => CloseCode::PROTOCOL_ERROR,
        }
    }
}

/// Returned by `WebSocketConnection::recv` to distinguish "connection ended" from
/// "message delivered" without needing a second call to inspect final status.
pub type RecvResult = Result<Message, Error>;
