//! A registry of connected clients' write handles, replacing a raw shared `HashMap` with an
//! explicit component that owns the add/remove/broadcast operations (spec §4.5 supplement /
//! redesign: the original kept a process-wide map of client writers with no single owner).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::Error;
use crate::event::ID;
use crate::message::Message;
use crate::split::WSWriter;
use crate::stream::WsStream;

/// Fans a message out to every registered connection. Cheap to `Clone` (an `Arc` inside) so
/// it can be shared across the per-connection tasks spawned by `server::start_server`.
#[derive(Clone, Default)]
pub struct Broadcaster {
    clients: Arc<RwLock<HashMap<ID, WSWriter<WsStream>>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Broadcaster::default()
    }

    pub async fn add(&self, id: ID, writer: WSWriter<WsStream>) {
        self.clients.write().await.insert(id, writer);
    }

    pub async fn remove(&self, id: ID) {
        self.clients.write().await.remove(&id);
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sends `message` to one connection by id. Errors if the id is not registered or the
    /// send itself fails; does not remove the client on failure, callers should also handle
    /// `Event::Disconnect`/`Event::Error` to keep the registry accurate.
    pub async fn send_to(&self, id: ID, message: impl Into<Message>) -> Result<(), Error> {
        let writer = self.clients.read().await.get(&id).cloned().ok_or(Error::ConnectionClosed)?;
        writer.send(message.into(), false).await
    }

    /// Sends `message` to every registered connection except `exclude` (pass `None` to reach
    /// everyone). Collects and returns the ids whose send failed rather than aborting the
    /// whole broadcast on the first error.
    pub async fn broadcast(&self, message: impl Into<Message>, exclude: Option<ID>) -> Vec<ID> {
        let message = message.into();
        let clients = self.clients.read().await;
        let mut failed = Vec::new();
        for (id, writer) in clients.iter() {
            if Some(*id) == exclude {
                continue;
            }
            if writer.send(message.clone(), false).await.is_err() {
                failed.push(*id);
            }
        }
        failed
    }
}
