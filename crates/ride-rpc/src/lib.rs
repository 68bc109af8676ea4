//! The wire surface: a jsonrpsee JSON-RPC API plus a raw WebSocket frame
//! bridge, both thin adapters over a single `RideService`.

mod api;
mod context;
mod error;
mod handler;
mod server;
mod service;
mod types;

pub use api::{RideApiClient, RideApiServer};
pub use context::RideContext;
pub use error::to_rpc_error;
pub use handler::RideConnectionHandler;
pub use server::RideRpcServer;
pub use service::RideService;
pub use types::*;
