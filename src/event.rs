//! The server accept harness's notification channel (spec §4.5 supplement: a ready-made
//! multi-connection server loop). Each accepted connection gets a `uuid` identity; callers
//! drive an `EventStream` instead of juggling per-connection tasks themselves.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::Receiver;
use uuid::Uuid;

use crate::error::Error;
use crate::message::Message;
use crate::split::WSWriter;
use crate::stream::WsStream;

pub type ID = Uuid;

/// One notification out of `server::start_server`. `NewClient` carries the writer half so the
/// application can reply or register it with a `Broadcaster`; the reader half is driven
/// internally and surfaces as `NewMessage`/`Error`/`Disconnect`.
pub enum Event {
    NewClient(ID, WSWriter<WsStream>),
    NewMessage(ID, Message),
    Disconnect(ID),
    Error(ID, Error),
}

/// Wraps the `mpsc::Receiver<Event>` in a `Stream`, so callers use `StreamExt` combinators
/// instead of an explicit `recv().await` loop.
pub struct EventStream {
    receiver: Receiver<Event>,
}

impl EventStream {
    pub(crate) fn new(receiver: Receiver<Event>) -> Self {
        EventStream { receiver }
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver).poll_recv(cx)
    }
}
