// src/lib.rs
//! Charon — a concurrent name registry with a shared read cache and
//! crash-driven eviction.
//!
//! A single coordinator task serializes every mutation (create, evict on
//! death) against a table that arbitrarily many readers resolve names from
//! without ever contacting the coordinator. The table is owned outside the
//! coordinator, so a replacement coordinator can be spawned against a table
//! that still carries entries from its crashed predecessor.

pub mod bucket;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod monitor;
pub mod pid;
pub mod table;
pub mod worker;

pub use coordinator::{Coordinator, CoordinatorHandle};
pub use error::{RegistryError, SpawnError};
pub use event::{Event, EventSink, EventStream};
pub use monitor::ExitReason;
pub use table::{lookup, CacheTable, TableRef};
pub use worker::{WorkerFactory, WorkerHandle};
