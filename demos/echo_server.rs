//! Minimal echo server: every message a client sends comes straight back to it.

use beacon_ws::event::{Event, ID};
use beacon_ws::server::start_server;
use beacon_ws::split::WSWriter;
use beacon_ws::WsStream;
use futures::StreamExt;
use log::*;
use std::collections::HashMap;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let port = 9002;
    let mut events = start_server(port).await?;
    info!("Listening on 0.0.0.0:{port}");

    let mut clients: HashMap<ID, WSWriter<WsStream>> = HashMap::new();
    while let Some(event) = events.next().await {
        match event {
            Event::NewClient(id, writer) => {
                info!("New client {id} connected");
                clients.insert(id, writer);
            }
            Event::NewMessage(id, message) => {
                if let Some(writer) = clients.get(&id) {
                    if writer.send(message, false).await.is_err() {
                        warn!("Failed to echo message back to {id}");
                    }
                }
            }
            Event::Disconnect(id) => {
                info!("Client {id} disconnected");
                clients.remove(&id);
            }
            Event::Error(id, err) => {
                error!("Error on connection {id}: {err}");
                clients.remove(&id);
            }
        }
    }

    Ok(())
}
