//! HTTP/1.1 plumbing for the opening handshake (spec §4.2): constructing the client's GET
//! request, and reading/parsing the header block for both roles with `httparse`.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;
use url::Url;

use crate::error::Error;

/// A parsed HTTP header block: request/status line already consumed, headers available by
/// case-insensitive lookup (RFC 6455 handshake headers are conventionally capitalized
/// differently by different clients).
#[derive(Debug)]
pub(crate) struct Headers(Vec<(String, String)>);

impl Headers {
    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Reads bytes from `reader` until `httparse` reports a complete header block, bounded by
/// `max_header` bytes and `deadline`. Returns the raw bytes (header block only — no body,
/// which the handshake never has) so the caller picks the right `httparse` parser
/// (`Request` for the server role, `Response` for the client role).
async fn read_header_block<T: AsyncRead + Unpin>(
    reader: &mut T,
    max_header: usize,
    deadline: Duration,
    is_complete: impl Fn(&[u8]) -> bool,
) -> Result<Vec<u8>, Error> {
    let read = async {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                return Err(Error::IncompleteHttpRequest);
            }
            buf.extend_from_slice(&chunk[..n]);
            if buf.len() > max_header {
                return Err(Error::HeaderTooLarge(max_header));
            }
            if is_complete(&buf) {
                return Ok(buf);
            }
        }
    };

    timeout(deadline, read).await?
}

fn request_is_complete(buf: &[u8]) -> bool {
    let mut header_storage = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut header_storage);
    matches!(req.parse(buf), Ok(httparse::Status::Complete(_)))
}

fn response_is_complete(buf: &[u8]) -> bool {
    let mut header_storage = [httparse::EMPTY_HEADER; 64];
    let mut resp = httparse::Response::new(&mut header_storage);
    matches!(resp.parse(buf), Ok(httparse::Status::Complete(_)))
}

pub(crate) struct ParsedRequest {
    pub(crate) path: String,
    pub(crate) headers: Headers,
}

pub(crate) async fn read_request<T: AsyncRead + Unpin>(
    reader: &mut T,
    max_header: usize,
    deadline: Duration,
) -> Result<ParsedRequest, Error> {
    let buf = read_header_block(reader, max_header, deadline, request_is_complete).await?;

    let mut header_storage = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut header_storage);
    req.parse(&buf)?;

    let path = req.path.ok_or(Error::IncompleteHttpRequest)?.to_string();
    let headers = req
        .headers
        .iter()
        .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
        .collect();

    Ok(ParsedRequest { path, headers: Headers(headers) })
}

pub(crate) struct ParsedResponse {
    pub(crate) status: u16,
    pub(crate) headers: Headers,
}

pub(crate) async fn read_response<T: AsyncRead + Unpin>(
    reader: &mut T,
    max_header: usize,
    deadline: Duration,
) -> Result<ParsedResponse, Error> {
    let buf = read_header_block(reader, max_header, deadline, response_is_complete).await?;

    let mut header_storage = [httparse::EMPTY_HEADER; 64];
    let mut resp = httparse::Response::new(&mut header_storage);
    resp.parse(&buf)?;

    let status = resp.code.ok_or(Error::IncompleteHttpRequest)?;
    let headers = resp
        .headers
        .iter()
        .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
        .collect();

    Ok(ParsedResponse { status, headers: Headers(headers) })
}

/// Everything needed to open the TCP connection and send the client's handshake request.
pub(crate) struct ClientRequest {
    pub(crate) request_text: String,
    pub(crate) host_with_port: String,
    pub(crate) key: String,
    pub(crate) use_tls: bool,
}

/// Builds the GET request line and headers for a client handshake (spec §4.2), parsing the
/// `ws://`/`wss://` URL for host, port, path and query.
pub(crate) fn construct_client_request(ws_url: &str, key: &str) -> Result<ClientRequest, Error> {
    let parsed = Url::parse(ws_url)?;

    let (default_port, use_tls) = match parsed.scheme() {
        "ws" => (80u16, false),
        "wss" => (443u16, true),
        _ => return Err(Error::InvalidScheme),
    };

    let host = parsed.host_str().ok_or(Error::MissingHost)?;
    let port = parsed.port().unwrap_or(default_port);
    let host_with_port = format!("{}:{}", host, port);

    let host_header = match parsed.port() {
        Some(p) => format!("{}:{}", host, p),
        None => host.to_string(),
    };

    let path = match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    };

    let request_text = format!(
        "GET {path} HTTP/1.1\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Host: {host_header}\r\n\
         Origin: file://\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n"
    );

    Ok(ClientRequest { request_text, host_with_port, key: key.to_string(), use_tls })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_request_includes_expected_headers() {
        let req = construct_client_request("ws://localhost:8080/chat?x=1", "abc==").unwrap();
        assert_eq!(req.host_with_port, "localhost:8080");
        assert!(req.request_text.starts_with("GET /chat?x=1 HTTP/1.1"));
        assert!(req.request_text.contains("Host: localhost:8080"));
        assert!(req.request_text.contains("Sec-WebSocket-Key: abc=="));
        assert!(!req.use_tls);
    }

    #[test]
    fn wss_scheme_selects_tls_and_default_port_443() {
        let req = construct_client_request("wss://example.com/", "key").unwrap();
        assert_eq!(req.host_with_port, "example.com:443");
        assert!(req.use_tls);
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let result = construct_client_request("ftp://example.com", "key");
        assert!(matches!(result, Err(Error::InvalidScheme)));
    }

    #[test]
    fn missing_host_is_rejected() {
        let result = construct_client_request("ws:///path", "key");
        assert!(matches!(result, Err(Error::MissingHost)));
    }
}
