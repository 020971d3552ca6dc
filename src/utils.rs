use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use rand::Rng;
use sha1::{Digest, Sha1};

pub(crate) const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// `base64(SHA1(key + GUID))` — the accept digest exchanged during the opening handshake
/// (spec §6).
pub(crate) fn accept_digest(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(GUID.as_bytes());
    BASE64_STANDARD.encode(hasher.finalize())
}

/// A fresh `Sec-WebSocket-Key`: base64 of 16 random bytes.
pub(crate) fn generate_websocket_key() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    BASE64_STANDARD.encode(bytes)
}

/// A fresh 4-byte frame masking key.
pub(crate) fn generate_mask_key() -> [u8; 4] {
    let mut rng = rand::rng();
    rng.random()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_digest_matches_known_rfc_example() {
        // RFC 6455 §1.3 worked example.
        assert_eq!(accept_digest("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn mutating_any_byte_of_the_digest_fails_verification() {
        let key = generate_websocket_key();
        let digest = accept_digest(&key);
        let mut mutated = digest.clone();
        // Flip the first character; base64 alphabet guarantees this changes the string.
        let first = mutated.chars().next().unwrap();
        let replacement = if first == 'A' { 'B' } else { 'A' };
        mutated.replace_range(0..1, &replacement.to_string());
        assert_ne!(mutated, digest);
    }
}
