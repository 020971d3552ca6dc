//! A chat-room style server: every message a client sends is fanned out to every other
//! connected client via `Broadcaster`, instead of being echoed back to its sender.

use beacon_ws::broadcaster::Broadcaster;
use beacon_ws::event::Event;
use beacon_ws::server::start_server;
use futures::StreamExt;
use log::*;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let port = 9004;
    let mut events = start_server(port).await?;
    let broadcaster = Broadcaster::new();
    info!("Listening on 0.0.0.0:{port}");

    while let Some(event) = events.next().await {
        match event {
            Event::NewClient(id, writer) => {
                info!("New client {id} connected, {} now online", broadcaster.len().await + 1);
                broadcaster.add(id, writer).await;
            }
            Event::NewMessage(id, message) => {
                let failed = broadcaster.broadcast(message, Some(id)).await;
                for failed_id in failed {
                    warn!("Dropping unreachable client {failed_id}");
                    broadcaster.remove(failed_id).await;
                }
            }
            Event::Disconnect(id) => {
                broadcaster.remove(id).await;
                info!("Client {id} disconnected, {} remain", broadcaster.len().await);
            }
            Event::Error(id, err) => {
                error!("Error on connection {id}: {err}");
                broadcaster.remove(id).await;
            }
        }
    }

    Ok(())
}
