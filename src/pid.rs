// src/pid.rs
//! Process-wide worker identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque numeric id of a running worker. Unique for the lifetime of the host
/// process; never reused.
pub type Pid = u64;

static NEXT_PID: AtomicU64 = AtomicU64::new(1);

/// Allocate a fresh pid.
pub fn next() -> Pid {
    NEXT_PID.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pids_are_unique_and_increasing() {
        let a = next();
        let b = next();
        assert!(b > a);
    }
}
