use std::sync::Arc;
use std::time::Duration;

/// Tunables for the protocol engine (spec §6). These bound resource usage, not behavior:
/// a connection configured with smaller limits still speaks the same wire protocol, it just
/// refuses to read or assemble more than it was told to.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Maximum aggregate size, in bytes, of a reassembled message (fragmented or not).
    pub max_payload: usize,
    /// Maximum size, in bytes, of the handshake header block read before giving up.
    pub max_header: usize,
    /// Deadline for completing the server-side opening handshake.
    pub handshake_timeout: Duration,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        WebSocketConfig {
            max_payload: 33_554_432, // 32 MiB
            max_header: 65_536,      // 64 KiB
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// Server-side configuration: protocol tunables plus an optional TLS acceptor config.
/// When `tls` is `None` the server accepts plain TCP connections.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub websocket: WebSocketConfig,
    pub tls: Option<Arc<rustls::ServerConfig>>,
}

/// Client-side configuration: protocol tunables plus an optional TLS client config, used
/// when connecting to a `wss://` endpoint. When `tls` is `None` and the URL scheme is
/// `wss://`, a default config trusting the platform's webpki roots is used.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub websocket: WebSocketConfig,
    pub tls: Option<Arc<rustls::ClientConfig>>,
}
