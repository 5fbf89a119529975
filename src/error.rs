// src/error.rs
//! Error taxonomy of the registry surface.

use thiserror::Error;

/// Worker creation failed. Surfaced to the Create caller as the failure of
/// the whole call; the coordinator performs no cache mutation and registers
/// no watch when this happens.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("worker resources exhausted")]
    ResourcesExhausted,
    #[error("worker spawn failed: {0}")]
    Failed(String),
}

/// Failure of a call made through a `CoordinatorHandle`.
///
/// A lookup miss is not an error anywhere in this crate; it is an ordinary
/// `None`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    /// The coordinator task is gone. The caller may construct a replacement
    /// against the same table reference and retry.
    #[error("coordinator unavailable")]
    CoordinatorUnavailable,
}
