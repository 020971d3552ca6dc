//! The opening handshake (spec §4.2, §6): client-side request construction plus response
//! validation, and server-side request validation plus response construction. Both directions
//! share the accept-key digest from `utils::accept_digest`.
//!
//! Design note: verification checks the digest computed from the *request's own* key against
//! the accept value the peer sent back — never the raw key against itself, which is the bug
//! the original implementation carried (comparing the wrong variable let a server accept a
//! response that never actually echoed the right digest).

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::{TlsAcceptor, TlsConnector};

use crate::config::{ClientConfig, ServerConfig};
use crate::connection::{Role, WebSocketConnection};
use crate::error::Error;
use crate::request::{construct_client_request, read_request, read_response, Headers};
use crate::stream::WsStream;
use crate::utils::{accept_digest, generate_websocket_key};

fn header_has_token(headers: &Headers, name: &str, token: &str) -> bool {
    headers
        .get(name)
        .map(|value| value.split(',').any(|part| part.trim().eq_ignore_ascii_case(token)))
        .unwrap_or(false)
}

fn switching_protocols_response(accept_key: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept_key}\r\n\
         \r\n"
    )
}

fn bad_request_response(reason: &str) -> String {
    format!(
        "HTTP/1.1 400 Bad Request\r\n\
         Connection: close\r\n\
         Content-Length: {len}\r\n\
         \r\n\
         {reason}",
        len = reason.len()
    )
}

/// Validates an opening request against spec §4.2 and returns the digest to send back, or the
/// error (and its matching 400 response body) to report instead.
fn validate_opening_request(headers: &Headers) -> Result<String, Error> {
    if !header_has_token(headers, "Upgrade", "websocket") {
        return Err(Error::MissingUpgradeHeader);
    }
    if !header_has_token(headers, "Connection", "Upgrade") {
        return Err(Error::MissingConnectionHeader);
    }
    if headers.get("Host").is_none() {
        return Err(Error::MissingHostHeader);
    }
    let key = headers.get("Sec-WebSocket-Key").ok_or(Error::MissingSecWebSocketKey)?;
    Ok(accept_digest(key))
}

/// Accepts a server-side handshake over an already-connected transport, using the default
/// `WebSocketConfig`.
pub async fn accept_async<T>(transport: T) -> Result<WebSocketConnection<T>, Error>
where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    accept_async_with_config(transport, ServerConfig::default()).await
}

/// Accepts a server-side handshake, enforcing `config.websocket.max_header` and
/// `config.websocket.handshake_timeout` while reading the request. `config.tls` is ignored
/// here — TLS is expected to already be terminated by the caller (see `server::start_server`,
/// which does this before calling in).
pub async fn accept_async_with_config<T>(
    mut transport: T,
    config: ServerConfig,
) -> Result<WebSocketConnection<T>, Error>
where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let ws_config = config.websocket;
    let request =
        read_request(&mut transport, ws_config.max_header, ws_config.handshake_timeout).await?;

    match validate_opening_request(&request.headers) {
        Ok(accept_key) => {
            let response = switching_protocols_response(&accept_key);
            transport.write_all(response.as_bytes()).await?;
            transport.flush().await?;
            Ok(WebSocketConnection::new(Role::Server, transport, ws_config))
        }
        Err(err) => {
            let response = bad_request_response(&err.to_string());
            let _ = transport.write_all(response.as_bytes()).await;
            let _ = transport.flush().await;
            Err(err)
        }
    }
}

/// Wraps a freshly-accepted TCP connection in TLS (when `config.tls` is set) and then performs
/// the server handshake. Used by `server::start_server`.
pub(crate) async fn accept_tcp_with_config(
    stream: TcpStream,
    config: ServerConfig,
) -> Result<WebSocketConnection<WsStream>, Error> {
    let transport = match &config.tls {
        Some(tls_config) => {
            let acceptor = TlsAcceptor::from(tls_config.clone());
            let tls_stream = acceptor.accept(stream).await?;
            WsStream::Tls(tokio_rustls::TlsStream::from(tls_stream))
        }
        None => WsStream::Plain(stream),
    };
    accept_async_with_config(transport, config).await
}

/// Connects to `ws_url`/`wss_url` and performs the client-side handshake, using the default
/// `ClientConfig`.
pub async fn connect_async(ws_url: &str) -> Result<WebSocketConnection<WsStream>, Error> {
    connect_async_with_config(ws_url, ClientConfig::default()).await
}

/// Connects to `ws_url`/`wss_url` and performs the client-side handshake under `config`.
/// Opens the TCP connection itself (unlike `accept_async_with_config`, which is handed an
/// already-open transport) since the client is the one choosing where to dial.
pub async fn connect_async_with_config(
    ws_url: &str,
    config: ClientConfig,
) -> Result<WebSocketConnection<WsStream>, Error> {
    let ws_config = config.websocket;
    let key = generate_websocket_key();
    let client_request = construct_client_request(ws_url, &key)?;

    let tcp = TcpStream::connect(&client_request.host_with_port).await?;
    let mut transport = if client_request.use_tls {
        let tls_config = match config.tls {
            Some(tls_config) => tls_config,
            None => Arc::new(default_client_tls_config()),
        };
        let connector = TlsConnector::from(tls_config);
        let host = client_request
            .host_with_port
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(&client_request.host_with_port)
            .to_string();
        let server_name =
            pki_types::ServerName::try_from(host).map_err(|_| Error::InvalidTlsServerName)?;
        let tls_stream = connector.connect(server_name, tcp).await?;
        WsStream::Tls(tokio_rustls::TlsStream::from(tls_stream))
    } else {
        WsStream::Plain(tcp)
    };

    transport.write_all(client_request.request_text.as_bytes()).await?;
    transport.flush().await?;

    let response = read_response(&mut transport, ws_config.max_header, ws_config.handshake_timeout).await?;
    if response.status != 101 {
        return Err(Error::InvalidAcceptKey);
    }
    let accept = response.headers.get("Sec-WebSocket-Accept").ok_or(Error::MissingAcceptHeader)?;
    if accept != accept_digest(&client_request.key) {
        return Err(Error::InvalidAcceptKey);
    }

    Ok(WebSocketConnection::new(Role::Client, transport, ws_config))
}

fn default_client_tls_config() -> rustls::ClientConfig {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    rustls::ClientConfig::builder().with_root_certificates(roots).with_no_client_auth()
}
