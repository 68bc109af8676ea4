//! The Event Bus / Room Router (`spec.md` §4.8): room membership,
//! cross-instance fan-out, reconnection rejoin, authorization, and the
//! `axum` WebSocket transport.

pub mod bus;
pub mod connection;
pub mod transport;

pub use bus::{Bus, RoomEvent};
pub use connection::{ConnectionId, ConnectionIdentity};
pub use transport::{serve_connection, ConnectionHandler, PING_INTERVAL, PONG_TIMEOUT};
