// src/bucket.rs
//! Reference worker: a key-value bucket actor, plus a factory for it.
//!
//! The registry itself is agnostic about what a worker is; this is the
//! concrete worker the demo and the integration tests run against. Each
//! bucket is one tokio task holding a private map, driven by a command
//! channel, with its exit latch tripped on the way out.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::SpawnError;
use crate::monitor::{down_channel, DownReceiver, ExitLatch, ExitReason};
use crate::pid::{self, Pid};
use crate::worker::{WorkerFactory, WorkerHandle};

enum Command {
    Put {
        key: String,
        value: String,
    },
    Get {
        key: String,
        reply: oneshot::Sender<Option<String>>,
    },
    Stop,
    Crash(ExitReason),
}

/// Client side of one bucket.
#[derive(Clone)]
pub struct BucketClient {
    tx: mpsc::UnboundedSender<Command>,
}

impl BucketClient {
    pub fn put(&self, key: &str, value: &str) {
        let _ = self.tx.send(Command::Put {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Get {
                key: key.to_string(),
                reply: reply_tx,
            })
            .ok()?;
        reply_rx.await.ok().flatten()
    }

    /// Ask the bucket to stop cleanly; its latch trips with `Normal`.
    pub fn stop(&self) {
        let _ = self.tx.send(Command::Stop);
    }

    /// Make the bucket die with the given reason, as a crash would.
    pub fn crash(&self, reason: ExitReason) {
        let _ = self.tx.send(Command::Crash(reason));
    }
}

/// Spawn a bucket task. Returns the opaque handle the registry deals in and
/// the client the bucket's users talk through.
pub fn spawn(name: &str) -> (WorkerHandle, BucketClient) {
    let latch = Arc::new(ExitLatch::new());
    let (tx, rx) = mpsc::unbounded_channel();

    // Watch our own latch so an external kill stops the task too.
    let (down_tx, down_rx) = down_channel();
    latch.watch(&down_tx);

    let worker_pid = pid::next();
    debug!(name = %name, pid = worker_pid, "bucket spawned");
    tokio::spawn(run(rx, latch.clone(), down_rx));

    (WorkerHandle::new(worker_pid, latch), BucketClient { tx })
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<Command>,
    latch: Arc<ExitLatch>,
    mut down_rx: DownReceiver,
) {
    let mut entries: HashMap<String, String> = HashMap::new();
    loop {
        tokio::select! {
            biased;
            // Killed from outside; the latch has already tripped.
            _ = down_rx.recv() => return,
            cmd = rx.recv() => match cmd {
                Some(Command::Put { key, value }) => {
                    entries.insert(key, value);
                }
                Some(Command::Get { key, reply }) => {
                    let _ = reply.send(entries.get(&key).cloned());
                }
                Some(Command::Crash(reason)) => {
                    latch.trip(reason);
                    return;
                }
                Some(Command::Stop) | None => {
                    latch.trip(ExitReason::Normal);
                    return;
                }
            }
        }
    }
}

/// Looks up bucket clients by pid. Cloneable; the factory and its users share
/// one directory.
#[derive(Clone, Default)]
pub struct BucketDirectory {
    inner: Arc<Mutex<HashMap<Pid, BucketClient>>>,
}

impl BucketDirectory {
    pub fn get(&self, pid: Pid) -> Option<BucketClient> {
        self.inner.lock().get(&pid).cloned()
    }
}

/// `WorkerFactory` spawning buckets. An optional limit on total spawns lets
/// callers exercise resource exhaustion.
pub struct BucketFactory {
    directory: BucketDirectory,
    spawned: usize,
    limit: Option<usize>,
}

impl BucketFactory {
    pub fn new() -> Self {
        Self {
            directory: BucketDirectory::default(),
            spawned: 0,
            limit: None,
        }
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    pub fn directory(&self) -> BucketDirectory {
        self.directory.clone()
    }
}

impl Default for BucketFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerFactory for BucketFactory {
    fn spawn(&mut self, name: &str) -> Result<WorkerHandle, SpawnError> {
        if let Some(limit) = self.limit {
            if self.spawned >= limit {
                return Err(SpawnError::ResourcesExhausted);
            }
        }
        let (handle, client) = spawn(name);
        self.spawned += 1;
        self.directory.inner.lock().insert(handle.pid(), client);
        Ok(handle)
    }
}
