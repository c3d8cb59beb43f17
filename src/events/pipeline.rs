//! Bounded FIFO channel between engine invocations and a single consumer.
//!
//! Producers block when the channel is full, so a slow display throttles
//! fast downloads instead of losing progress. The consumer always drains,
//! which keeps that backpressure from turning into a deadlock. Dropping
//! the last [`EventSender`] closes the channel and ends the consumer.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::{DownloadId, LifecycleEvent};

/// Receives lifecycle events in arrival order.
///
/// Implementations run on the consumer task and must not block for long:
/// every producer waits on them once the channel is full.
pub trait EventSink: Send {
    /// Announces a download before any of its events arrive.
    fn register(&mut self, _id: DownloadId, _url: &str) {}

    /// Handles one event.
    fn handle(&mut self, event: LifecycleEvent);

    /// Called once after the channel closes.
    fn finish(&mut self) {}
}

impl EventSink for Vec<LifecycleEvent> {
    fn handle(&mut self, event: LifecycleEvent) {
        self.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn register(&mut self, id: DownloadId, url: &str) {
        (**self).register(id, url);
    }

    fn handle(&mut self, event: LifecycleEvent) {
        (**self).handle(event);
    }

    fn finish(&mut self) {
        (**self).finish();
    }
}

/// Producer handle, cloned into every engine invocation.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<LifecycleEvent>,
}

impl EventSender {
    /// Sends an event, waiting for capacity if the channel is full.
    ///
    /// A consumer that has already gone away never fails a download; the
    /// event is dropped.
    pub async fn send(&self, event: LifecycleEvent) {
        trace!(id = %event.id(), "sending lifecycle event");
        if let Err(mpsc::error::SendError(event)) = self.tx.send(event).await {
            debug!(id = %event.id(), "event consumer closed; dropping event");
        }
    }

    /// Remaining free slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

/// Consumer handle. Exactly one exists per pipeline.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<LifecycleEvent>,
}

impl EventReceiver {
    /// Waits for the next event; `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<LifecycleEvent> {
        self.rx.recv().await
    }
}

/// Creates a pipeline with room for `capacity` in-flight events (at least 1).
#[must_use]
pub fn pipeline(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender { tx }, EventReceiver { rx })
}

/// Spawns the consumer task.
///
/// Each event is forwarded to `sink` synchronously, in FIFO order. The
/// task ends when the channel closes and hands the sink back.
pub fn spawn_consumer<S>(mut receiver: EventReceiver, mut sink: S) -> JoinHandle<S>
where
    S: EventSink + 'static,
{
    tokio::spawn(async move {
        let mut forwarded: u64 = 0;
        while let Some(event) = receiver.recv().await {
            sink.handle(event);
            forwarded += 1;
        }
        sink.finish();
        debug!(events = forwarded, "event pipeline closed");
        sink
    })
}
