//! Close status codes and the wire encoding of the CLOSE frame body (RFC 6455 §7.4).

use std::fmt;

/// A close status code. Plain newtype rather than an enum: most values in the valid ranges
/// (3000-3999, 4000-4999) are reserved for extensions and applications, not individually
/// named, so an enum would have to carry a catch-all variant anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseCode(pub u16);

impl CloseCode {
    pub const NORMAL: CloseCode = CloseCode(1000);
    pub const GOING_AWAY: CloseCode = CloseCode(1001);
    pub const PROTOCOL_ERROR: CloseCode = CloseCode(1002);
    pub const UNSUPPORTED_DATA: CloseCode = CloseCode(1003);
    pub const INVALID_PAYLOAD: CloseCode = CloseCode(1007);
    pub const POLICY_VIOLATION: CloseCode = CloseCode(1008);
    pub const MESSAGE_TOO_BIG: CloseCode = CloseCode(1009);
    pub const MANDATORY_EXTENSION: CloseCode = CloseCode(1010);
    pub const INTERNAL_ERROR: CloseCode = CloseCode(1011);

    /// The set of codes a peer may legally put on the wire (spec §3, data model).
    pub fn is_valid(self) -> bool {
        matches!(
            self.0,
            1000 | 1001 | 1002 | 1003 | 1007 | 1008 | 1009 | 1010 | 1011
        ) || (3000..=3999).contains(&self.0)
            || (4000..=4999).contains(&self.0)
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The resolved outcome of a closing handshake: the status code and human-readable reason,
/// already remapped per spec rules if the peer sent something invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub status: CloseCode,
    pub reason: String,
}

impl CloseInfo {
    pub fn normal() -> Self {
        CloseInfo { status: CloseCode::NORMAL, reason: String::new() }
    }

    pub fn new(status: CloseCode, reason: impl Into<String>) -> Self {
        CloseInfo { status, reason: into_bounded_reason(reason.into()) }
    }
}

/// Reason text on the wire is capped at 123 bytes (125-byte control frame payload minus the
/// 2-byte status code). Truncates on a UTF-8 char boundary rather than splitting a codepoint.
fn into_bounded_reason(reason: String) -> String {
    const MAX_REASON_BYTES: usize = 123;
    if reason.len() <= MAX_REASON_BYTES {
        return reason;
    }
    let mut end = MAX_REASON_BYTES;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    reason[..end].to_string()
}

/// Parses a CLOSE frame payload per spec §4.4, remapping invalid status codes and
/// non-UTF-8 reasons to 1002 rather than rejecting the frame outright — a close frame is
/// terminal either way, so there is nothing to recover by erroring here.
pub fn parse_close_payload(payload: &[u8]) -> CloseInfo {
    match payload.len() {
        0 => CloseInfo::normal(),
        1 => CloseInfo::new(CloseCode::PROTOCOL_ERROR, ""),
        _ => {
            let status = CloseCode(u16::from_be_bytes([payload[0], payload[1]]));
            if !status.is_valid() {
                return CloseInfo::new(CloseCode::PROTOCOL_ERROR, "");
            }
            match std::str::from_utf8(&payload[2..]) {
                Ok(reason) => CloseInfo::new(status, reason),
                Err(_) => CloseInfo::new(CloseCode::PROTOCOL_ERROR, ""),
            }
        }
    }
}

/// Encodes `(status, reason)` into a CLOSE frame payload.
pub fn encode_close_payload(info: &CloseInfo) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + info.reason.len());
    payload.extend_from_slice(&info.status.0.to_be_bytes());
    payload.extend_from_slice(info.reason.as_bytes());
    payload
}
