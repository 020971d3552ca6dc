//! An async RFC 6455 WebSocket protocol engine, for clients and servers.
//!
//! Built on tokio: a TCP or TLS transport in, a stream of already-assembled `Message`s out.
//! Handles the opening handshake, frame masking, fragmentation and the closing handshake;
//! leaves everything above the wire protocol — routing, auth, extensions — to the caller.
//!
//! ```no_run
//! use beacon_ws::handshake::connect_async;
//! use beacon_ws::message::Message;
//!
//! # async fn run() -> Result<(), beacon_ws::error::Error> {
//! let mut conn = connect_async("ws://localhost:8080/").await?;
//! conn.send(Message::Text("hello".into())).await?;
//! while let Some(message) = conn.recv().await {
//!     println!("{:?}", message?);
//! }
//! # Ok(())
//! # }
//! ```

mod assembler;
pub mod broadcaster;
pub mod close;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod frame;
pub mod handshake;
pub mod message;
mod request;
pub mod server;
pub mod split;
mod stream;
mod utils;

pub use connection::{Role, WebSocketConnection};
pub use error::Error;
pub use message::Message;
pub use stream::WsStream;
