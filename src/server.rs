//! A ready-to-use accept loop (spec §4.5 supplement): binds a `TcpListener`, performs the
//! opening handshake (optionally under TLS) for every inbound connection, and publishes an
//! `EventStream` so applications drive one stream instead of juggling tasks themselves.

use std::io;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::event::{Event, EventStream, ID};
use crate::handshake::accept_tcp_with_config;

/// Binds `0.0.0.0:{port}` and starts accepting connections with the default `ServerConfig`.
pub async fn start_server(port: u16) -> io::Result<EventStream> {
    start_server_with_config(port, ServerConfig::default()).await
}

/// Binds `0.0.0.0:{port}` and starts accepting connections under `config`. The returned
/// `EventStream` yields a `NewClient` (carrying the write half) followed by a `NewMessage` per
/// received message, and finally a `Disconnect` or `Error` once the connection ends.
pub async fn start_server_with_config(port: u16, config: ServerConfig) -> io::Result<EventStream> {
    let listener = TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    let (tx, rx) = mpsc::channel(1024);

    tokio::spawn(async move {
        loop {
            let id: ID = Uuid::new_v4();
            let (stream, _addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    let _ = tx.send(Event::Error(id, err.into())).await;
                    continue;
                }
            };

            let tx = tx.clone();
            let config = config.clone();
            tokio::spawn(async move {
                let connection = match accept_tcp_with_config(stream, config).await {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = tx.send(Event::Error(id, err)).await;
                        return;
                    }
                };

                let (mut reader, writer) = connection.split();
                if tx.send(Event::NewClient(id, writer)).await.is_err() {
                    return;
                }

                while let Some(result) = reader.recv().await {
                    match result {
                        Ok(message) => {
                            if tx.send(Event::NewMessage(id, message)).await.is_err() {
                                return;
                            }
                        }
                        Err(err) => {
                            let _ = tx.send(Event::Error(id, err)).await;
                            break;
                        }
                    }
                }
                let _ = tx.send(Event::Disconnect(id)).await;
            });
        }
    });

    Ok(EventStream::new(rx))
}
