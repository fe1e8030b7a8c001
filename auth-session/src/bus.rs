//! The ordered event bus shared by every producer and subscriber of a store.
//!
//! Producers enqueue into a single unbounded channel drained by the reducer
//! task, so the enqueue order *is* the total event order. After an event has
//! been applied to the session state it is fanned out two ways:
//! - to every [`EventFeed`] registered for its kind, losslessly. Actors that
//!   must serve every request read from a feed.
//! - to every [`EventStream`] through a bounded broadcast. Observers that fall
//!   behind skip events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError, error::TryRecvError},
    mpsc, oneshot,
};
use tokio_util::sync::CancellationToken;

use crate::{
    errors::{Error, Result},
    event::{EventKind, SessionEvent},
    session_log,
};

/// An event on its way to the reducer, with an optional "applied" notification.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub(crate) event: SessionEvent,
    pub(crate) applied: Option<oneshot::Sender<()>>,
}

type Feeds = Arc<Mutex<Vec<(EventKind, flume::Sender<SessionEvent>)>>>;

/// Cheap, cloneable handle for emitting and observing session events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<Envelope>,
    events: broadcast::Sender<SessionEvent>,
    feeds: Feeds,
    closed: CancellationToken,
}

impl EventBus {
    /// Create a bus and the receiving end the reducer task drains.
    pub(crate) fn new(capacity: usize) -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _rx) = broadcast::channel(capacity);
        let bus = Self {
            tx,
            events,
            feeds: Feeds::default(),
            closed: CancellationToken::new(),
        };
        (bus, rx)
    }

    /// Enqueue an event without waiting for it to be applied.
    ///
    /// # Errors
    /// Returns [`Error::Closed`] if the store was shut down.
    pub fn dispatch(&self, event: SessionEvent) -> Result<()> {
        self.tx
            .send(Envelope {
                event,
                applied: None,
            })
            .map_err(|_err| Error::Closed)
    }

    /// Enqueue an event and wait until the reducer has applied it.
    ///
    /// Actors use this for their own emissions, so that anything they read
    /// from the session state afterwards already reflects the event.
    ///
    /// # Errors
    /// Returns [`Error::Closed`] if the store was shut down before the event was applied.
    pub async fn put(&self, event: SessionEvent) -> Result<()> {
        let (applied, done) = oneshot::channel();
        self.tx
            .send(Envelope {
                event,
                applied: Some(applied),
            })
            .map_err(|_err| Error::Closed)?;
        done.await.map_err(|_err| Error::Closed)
    }

    /// Observe every event applied from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            rx: self.events.subscribe(),
            closed: self.closed.clone(),
        }
    }

    /// Receive every applied event of `kind`, without loss, from now on.
    ///
    /// Unlike [`Self::subscribe`] the feed is unbounded, so a consumer that
    /// is busy for a while still sees every event once it catches up.
    #[must_use]
    pub fn feed(&self, kind: EventKind) -> EventFeed {
        let (tx, rx) = flume::unbounded();
        if !self.closed.is_cancelled() {
            self.lock_feeds().push((kind, tx));
        }
        EventFeed { kind, rx }
    }

    fn lock_feeds(&self) -> MutexGuard<'_, Vec<(EventKind, flume::Sender<SessionEvent>)>> {
        self.feeds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fan an applied event out to feeds and subscribers. Called by the reducer task only.
    pub(crate) fn publish(&self, event: SessionEvent) {
        let kind = event.kind();
        // Feeds whose consumer is gone are pruned on the way.
        self.lock_feeds()
            .retain(|(wanted, tx)| *wanted != kind || tx.send(event.clone()).is_ok());
        // No active subscribers is expected before anyone subscribed.
        let _ = self.events.send(event);
    }

    /// End every open [`EventStream`] and [`EventFeed`] once it has drained what it buffered.
    pub(crate) fn close(&self) {
        self.closed.cancel();
        self.lock_feeds().clear();
    }

    /// Whether the store behind this bus was shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }
}

/// A subscriber's view of the bus: every event after it was applied, in order.
#[derive(Debug)]
pub struct EventStream {
    rx: broadcast::Receiver<SessionEvent>,
    closed: CancellationToken,
}

impl EventStream {
    /// Wait for the next event. Returns `None` once the store is shut down.
    ///
    /// A subscriber that falls more than the bus capacity behind skips the
    /// oldest events and logs a warning.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            tokio::select! {
                biased;
                received = self.rx.recv() => match received {
                    Ok(event) => return Some(event),
                    Err(RecvError::Lagged(skipped)) => {
                        session_log!(warn, "Event subscriber lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => return None,
                },
                () = self.closed.cancelled() => return None,
            }
        }
    }

    /// Wait for the next event of the given kind, discarding others.
    pub async fn next_of(&mut self, kind: EventKind) -> Option<SessionEvent> {
        loop {
            let event = self.recv().await?;
            if event.kind() == kind {
                return Some(event);
            }
        }
    }

    /// Take an already buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    session_log!(warn, "Event subscriber lagged, skipped {} events", skipped);
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Adapt into a [`Stream`] for use with `futures_util::StreamExt` combinators.
    pub fn into_stream(self) -> impl Stream<Item = SessionEvent> + Send {
        futures_util::stream::unfold(self, |mut events| async move {
            events.recv().await.map(|event| (event, events))
        })
    }
}

/// A lossless, single-kind view of the bus. See [`EventBus::feed`].
#[derive(Debug)]
pub struct EventFeed {
    kind: EventKind,
    rx: flume::Receiver<SessionEvent>,
}

impl EventFeed {
    /// The kind this feed carries.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Wait for the next event. Returns `None` once the store is shut down
    /// and everything buffered was taken.
    pub async fn recv(&self) -> Option<SessionEvent> {
        self.rx.recv_async().await.ok()
    }
}
