// src/monitor.rs
//! Liveness monitoring: per-worker exit latches and down-signal delivery.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Why a worker stopped being usable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitReason {
    Normal,
    Panic,
    Killed,
    Other(String),
}

/// Identifies one watch registration. A latch may be watched many times;
/// each registration gets its own id and its own (single) down signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MonitorId(u64);

static NEXT_MONITOR: AtomicU64 = AtomicU64::new(1);

impl MonitorId {
    fn next() -> Self {
        MonitorId(NEXT_MONITOR.fetch_add(1, Ordering::Relaxed))
    }
}

/// Delivered to whoever registered a watch, once, when the worker dies.
#[derive(Clone, Debug)]
pub struct DownSignal {
    pub monitor: MonitorId,
    pub reason: ExitReason,
}

/// Sender half used for down-signal delivery.
pub type DownSender = mpsc::UnboundedSender<DownSignal>;

/// Receiver half feeding a serialized consumer loop.
pub type DownReceiver = mpsc::UnboundedReceiver<DownSignal>;

/// Create a down-signal channel.
pub fn down_channel() -> (DownSender, DownReceiver) {
    mpsc::unbounded_channel()
}

struct LatchState {
    exited: Option<ExitReason>,
    watchers: Vec<(MonitorId, DownSender)>,
}

/// One-shot death latch shared between a worker task and its handle.
///
/// `trip` fires every registered watcher exactly once; the first reason wins
/// and later trips are no-ops. Watch registrations made after the trip are
/// fired immediately, so a watcher can never miss a death that already
/// happened.
pub struct ExitLatch {
    state: Mutex<LatchState>,
}

impl ExitLatch {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LatchState {
                exited: None,
                watchers: Vec::new(),
            }),
        }
    }

    /// Mark the worker dead and notify all watchers.
    pub fn trip(&self, reason: ExitReason) {
        let watchers = {
            let mut state = self.state.lock();
            if state.exited.is_some() {
                return;
            }
            state.exited = Some(reason.clone());
            std::mem::take(&mut state.watchers)
        };
        for (monitor, tx) in watchers {
            // Receiver may be gone (coordinator stopped); nothing to do then.
            let _ = tx.send(DownSignal {
                monitor,
                reason: reason.clone(),
            });
        }
    }

    /// Register a watcher. If the latch has already tripped, the signal is
    /// delivered before this returns.
    pub fn watch(&self, tx: &DownSender) -> MonitorId {
        let monitor = MonitorId::next();
        let fired = {
            let mut state = self.state.lock();
            match &state.exited {
                Some(reason) => Some(reason.clone()),
                None => {
                    state.watchers.push((monitor, tx.clone()));
                    None
                }
            }
        };
        if let Some(reason) = fired {
            let _ = tx.send(DownSignal { monitor, reason });
        }
        monitor
    }

    /// The reason the worker exited, if it has.
    pub fn exited(&self) -> Option<ExitReason> {
        self.state.lock().exited.clone()
    }
}

impl Default for ExitLatch {
    fn default() -> Self {
        Self::new()
    }
}
