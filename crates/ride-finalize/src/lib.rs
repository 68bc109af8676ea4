//! The Earnings Finalizer (`spec.md` §4.7): fare recomputation, hybrid
//! wallet/gateway reconciliation, and the idempotent `AdminEarnings` write.

mod finalizer;
mod gateway;

pub use finalizer::Finalizer;
pub use gateway::{Gateway, NullGateway};
