// src/coordinator.rs
//! The coordinator: single serialized authority over the cache table.
//!
//! One tokio task owns all mutation: creates, watch bookkeeping, and
//! crash-driven eviction. Requests arrive over an mpsc inbox and are answered
//! through oneshot replies; down signals arrive over a second channel and are
//! preferred over requests, the same way a mailbox prefers system messages
//! over user payloads. Because there is exactly one writer, the table needs
//! no locking discipline beyond its own atomic per-entry publish.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{RegistryError, SpawnError};
use crate::event::{Event, EventSink};
use crate::monitor::{down_channel, DownReceiver, DownSender, DownSignal, MonitorId};
use crate::table::TableRef;
use crate::worker::{WorkerFactory, WorkerHandle};

const REQUEST_CAPACITY: usize = 64;

enum Request {
    Create {
        name: String,
        reply: oneshot::Sender<Result<WorkerHandle, SpawnError>>,
    },
}

/// Translates a down signal (which carries a monitor id, not a name) back
/// into the entry to evict.
struct WatchEntry {
    name: String,
    handle: WorkerHandle,
}

/// Client side of the coordinator. Cloneable; all clones feed the same
/// serialized task.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Request>,
}

impl CoordinatorHandle {
    /// Register `name`, spawning a worker if none is registered.
    ///
    /// Idempotent: if the name is already registered the existing handle is
    /// returned and nothing is spawned. On success the cache write is already
    /// visible — a lookup on any thread after this returns finds the handle.
    pub async fn create(&self, name: &str) -> Result<WorkerHandle, RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request::Create {
                name: name.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| RegistryError::CoordinatorUnavailable)?;
        let outcome = reply_rx
            .await
            .map_err(|_| RegistryError::CoordinatorUnavailable)?;
        outcome.map_err(RegistryError::Spawn)
    }
}

/// The serialized coordinator task state.
pub struct Coordinator {
    table: TableRef,
    factory: Box<dyn WorkerFactory>,
    events: EventSink,
    watches: HashMap<MonitorId, WatchEntry>,
    down_tx: DownSender,
}

impl Coordinator {
    /// Construct a coordinator over `table` and start its task.
    ///
    /// The table may already hold entries from a previous coordinator
    /// incarnation: every inherited entry gets a fresh watch before the loop
    /// starts, and a watch on an already-dead worker fires immediately, so
    /// inherited corpses are evicted without further stimulus.
    pub fn spawn(
        table: TableRef,
        factory: Box<dyn WorkerFactory>,
        events: EventSink,
    ) -> CoordinatorHandle {
        let (req_tx, req_rx) = mpsc::channel(REQUEST_CAPACITY);
        let (down_tx, down_rx) = down_channel();

        let mut coordinator = Coordinator {
            table,
            factory,
            events,
            watches: HashMap::new(),
            down_tx,
        };
        coordinator.reattach();

        tokio::spawn(coordinator.run(req_rx, down_rx));

        CoordinatorHandle { tx: req_tx }
    }

    /// Re-register a watch for every entry inherited from a prior incarnation.
    fn reattach(&mut self) {
        let mut inherited = Vec::new();
        self.table.for_each(|name, handle| {
            inherited.push((name.to_string(), handle.clone()));
        });
        for (name, handle) in inherited {
            debug!(name = %name, pid = handle.pid(), "reattaching inherited entry");
            let monitor = handle.watch(&self.down_tx);
            self.watches.insert(monitor, WatchEntry { name, handle });
        }
    }

    async fn run(mut self, mut req_rx: mpsc::Receiver<Request>, mut down_rx: DownReceiver) {
        loop {
            tokio::select! {
                biased;
                Some(signal) = down_rx.recv() => {
                    self.handle_down(signal).await;
                }
                req = req_rx.recv() => {
                    match req {
                        Some(Request::Create { name, reply }) => {
                            self.handle_create(name, reply).await;
                        }
                        // Every handle dropped: the coordinator retires. The
                        // table stays with its owner.
                        None => break,
                    }
                }
            }
        }
        debug!(watches = self.watches.len(), "coordinator stopped");
    }

    async fn handle_create(
        &mut self,
        name: String,
        reply: oneshot::Sender<Result<WorkerHandle, SpawnError>>,
    ) {
        if let Some(existing) = self.table.lookup(&name) {
            debug!(name = %name, pid = existing.pid(), "create hit existing entry");
            let _ = reply.send(Ok(existing));
            return;
        }

        let handle = match self.factory.spawn(&name) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(name = %name, error = %err, "worker spawn failed");
                let _ = reply.send(Err(err));
                return;
            }
        };

        let monitor = handle.watch(&self.down_tx);
        self.watches.insert(
            monitor,
            WatchEntry {
                name: name.clone(),
                handle: handle.clone(),
            },
        );
        // The write must land before the caller sees the reply: the table is
        // the only path lookups take, so "create returned" has to imply
        // "lookup finds it".
        self.table.insert(name.clone(), handle.clone());
        debug!(name = %name, pid = handle.pid(), "worker registered");

        self.events
            .publish(Event::Created {
                name,
                handle: handle.clone(),
            })
            .await;
        let _ = reply.send(Ok(handle));
    }

    async fn handle_down(&mut self, signal: DownSignal) {
        let Some(entry) = self.watches.remove(&signal.monitor) else {
            // Stray signal for a watch we no longer track. Not an error.
            return;
        };

        // Delete-then-notify: by the time an observer sees the died event,
        // the entry is already gone from the table.
        self.table.delete(&entry.name);
        debug!(name = %entry.name, pid = entry.handle.pid(), reason = ?signal.reason, "worker died, entry evicted");

        self.events
            .publish(Event::Died {
                name: entry.name,
                handle: entry.handle,
                reason: signal.reason,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event;
    use crate::monitor::{ExitLatch, ExitReason};
    use crate::pid;
    use crate::table::CacheTable;
    use std::sync::Arc;

    struct LatchFactory;

    impl WorkerFactory for LatchFactory {
        fn spawn(&mut self, _name: &str) -> Result<WorkerHandle, SpawnError> {
            Ok(WorkerHandle::new(pid::next(), Arc::new(ExitLatch::new())))
        }
    }

    struct FailingFactory;

    impl WorkerFactory for FailingFactory {
        fn spawn(&mut self, _name: &str) -> Result<WorkerHandle, SpawnError> {
            Err(SpawnError::ResourcesExhausted)
        }
    }

    #[tokio::test]
    async fn spawn_failure_leaves_no_trace() {
        let table = CacheTable::shared();
        let (sink, mut stream) = event::channel(8);
        let coord = Coordinator::spawn(table.clone(), Box::new(FailingFactory), sink);

        let err = coord.create("shopping").await.unwrap_err();
        assert_eq!(
            err,
            RegistryError::Spawn(SpawnError::ResourcesExhausted)
        );
        assert!(table.is_empty());

        // No created event was published either.
        drop(coord);
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn create_is_visible_before_reply() {
        let table = CacheTable::shared();
        let (sink, _stream) = event::channel(8);
        let coord = Coordinator::spawn(table.clone(), Box::new(LatchFactory), sink);

        let handle = coord.create("shopping").await.unwrap();
        assert_eq!(crate::table::lookup(&table, "shopping"), Some(handle));
    }

    #[tokio::test]
    async fn stray_down_signal_is_a_no_op() {
        let table = CacheTable::shared();
        let (sink, mut stream) = event::channel(8);
        let (req_tx, req_rx) = mpsc::channel(REQUEST_CAPACITY);
        let (down_tx, down_rx) = down_channel();
        let coordinator = Coordinator {
            table: table.clone(),
            factory: Box::new(LatchFactory),
            events: sink,
            watches: HashMap::new(),
            down_tx: down_tx.clone(),
        };
        tokio::spawn(coordinator.run(req_rx, down_rx));
        let coord = CoordinatorHandle { tx: req_tx };

        let shopping = coord.create("shopping").await.unwrap();

        // A signal whose monitor id was never registered with this
        // coordinator: it must be swallowed without touching anything.
        let (scratch_tx, _scratch_rx) = down_channel();
        let stray = ExitLatch::new().watch(&scratch_tx);
        down_tx
            .send(DownSignal {
                monitor: stray,
                reason: ExitReason::Killed,
            })
            .unwrap();

        // The coordinator keeps serving and the entry is untouched.
        let pantry = coord.create("pantry").await.unwrap();
        assert_eq!(table.lookup("shopping"), Some(shopping.clone()));
        assert_eq!(table.len(), 2);

        // Only the two created events were published, never a died event.
        drop(coord);
        assert_eq!(
            stream.recv().await,
            Some(Event::Created {
                name: "shopping".into(),
                handle: shopping,
            })
        );
        assert_eq!(
            stream.recv().await,
            Some(Event::Created {
                name: "pantry".into(),
                handle: pantry,
            })
        );
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn dead_coordinator_reports_unavailable() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let coord = CoordinatorHandle { tx };

        let err = coord.create("shopping").await.unwrap_err();
        assert_eq!(err, RegistryError::CoordinatorUnavailable);
    }
}
