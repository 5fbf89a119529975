// src/event.rs
//! Notification sink for registry lifecycle events.

use tokio::sync::mpsc;

use crate::monitor::ExitReason;
use crate::worker::WorkerHandle;

/// Events the coordinator publishes for external observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Created {
        name: String,
        handle: WorkerHandle,
    },
    Died {
        name: String,
        handle: WorkerHandle,
        reason: ExitReason,
    },
}

/// Publishing half handed to the coordinator.
///
/// `publish` is a blocking hand-off: it completes only once the event has
/// been accepted downstream, never dropping it. The coordinator relies on
/// this so an observer that has seen a `Died` event is guaranteed the cache
/// delete already happened.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Event>,
}

impl EventSink {
    pub async fn publish(&self, event: Event) {
        // The observer dropping its stream is its own choice; the ordering
        // contract only concerns observers that are still listening.
        let _ = self.tx.send(event).await;
    }
}

/// Consuming half held by an observer.
pub struct EventStream {
    rx: mpsc::Receiver<Event>,
}

impl EventStream {
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Create a sink/stream pair with the given hand-off capacity.
pub fn channel(capacity: usize) -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSink { tx }, EventStream { rx })
}
