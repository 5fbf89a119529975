// src/worker.rs
//! Worker handles and the factory seam the coordinator spawns through.

use std::fmt;
use std::sync::Arc;

use crate::error::SpawnError;
use crate::monitor::{DownSender, ExitLatch, ExitReason, MonitorId};
use crate::pid::Pid;

/// Opaque reference to a running worker.
///
/// Cheap to clone; equality is by pid. A handle is only meaningful while the
/// worker is alive, and `is_alive` / `watch` report through the worker's exit
/// latch.
#[derive(Clone)]
pub struct WorkerHandle {
    pid: Pid,
    latch: Arc<ExitLatch>,
}

impl WorkerHandle {
    pub fn new(pid: Pid, latch: Arc<ExitLatch>) -> Self {
        Self { pid, latch }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Register for a single down signal on `tx` when this worker dies.
    /// Fires immediately if the worker is already dead.
    pub fn watch(&self, tx: &DownSender) -> MonitorId {
        self.latch.watch(tx)
    }

    pub fn is_alive(&self) -> bool {
        self.latch.exited().is_none()
    }

    /// Forcibly mark the worker dead. The worker task observes its own latch
    /// and stops; every watcher gets a `Killed` signal.
    pub fn kill(&self) {
        self.latch.trip(ExitReason::Killed);
    }
}

impl PartialEq for WorkerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.pid == other.pid
    }
}

impl Eq for WorkerHandle {}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("pid", &self.pid)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Spawns workers on behalf of the coordinator.
///
/// A failed spawn is returned to the Create caller untouched; retrying is the
/// caller's business, the coordinator never retries internally.
pub trait WorkerFactory: Send + 'static {
    fn spawn(&mut self, name: &str) -> Result<WorkerHandle, SpawnError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::down_channel;
    use crate::pid;

    #[tokio::test]
    async fn kill_trips_watchers() {
        let handle = WorkerHandle::new(pid::next(), Arc::new(ExitLatch::new()));
        assert!(handle.is_alive());

        let (tx, mut rx) = down_channel();
        handle.watch(&tx);
        handle.kill();

        assert!(!handle.is_alive());
        let sig = rx.recv().await.unwrap();
        assert_eq!(sig.reason, ExitReason::Killed);
    }

    #[test]
    fn equality_is_by_pid() {
        let p = pid::next();
        let a = WorkerHandle::new(p, Arc::new(ExitLatch::new()));
        let b = a.clone();
        let c = WorkerHandle::new(pid::next(), Arc::new(ExitLatch::new()));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
