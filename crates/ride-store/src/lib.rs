//! The durable-store trait and the distributed-lock abstraction (`spec.md`
//! §3, §5, §6), plus `RideEngine`, the only component allowed to write
//! `Ride` state.

pub mod db;
pub mod engine;
pub mod lock;

pub use db::{MemRideStore, RideStore};
pub use engine::RideEngine;
pub use lock::{InMemoryLockStore, LockStore};
