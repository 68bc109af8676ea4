//! The raw-frame WebSocket gateway: one `axum` route per identity kind,
//! each upgrading into `ride_events::transport::serve_connection`. This is
//! the transport real mobile/web clients speak; the jsonrpsee surface in
//! `main.rs` is the second, query-capable transport over the same
//! `RideContext`.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use ride_core::{DriverId, UserId};
use ride_events::{serve_connection, ConnectionIdentity};
use ride_rpc::{RideConnectionHandler, RideContext, RideService};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
struct SocketQuery {
    socket_id: String,
}

pub fn router(ctx: RideContext) -> Router {
    Router::new()
        .route("/ws/rider/:user_id", get(rider_upgrade))
        .route("/ws/driver/:driver_id", get(driver_upgrade))
        .route("/ws/admin", get(admin_upgrade))
        .with_state(ctx)
}

async fn rider_upgrade(
    ws: WebSocketUpgrade,
    Path(user_id): Path<UserId>,
    Query(query): Query<SocketQuery>,
    State(ctx): State<RideContext>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let handler = Arc::new(RideConnectionHandler::new(RideService::new(ctx.clone()), ctx.bus.clone()));
        serve_connection(socket, ctx.bus.clone(), ConnectionIdentity::Rider(user_id), query.socket_id, handler).await;
    })
}

async fn driver_upgrade(
    ws: WebSocketUpgrade,
    Path(driver_id): Path<DriverId>,
    Query(query): Query<SocketQuery>,
    State(ctx): State<RideContext>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let handler = Arc::new(RideConnectionHandler::new(RideService::new(ctx.clone()), ctx.bus.clone()));
        serve_connection(socket, ctx.bus.clone(), ConnectionIdentity::Driver(driver_id), query.socket_id, handler).await;
    })
}

async fn admin_upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<SocketQuery>,
    State(ctx): State<RideContext>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let handler = Arc::new(RideConnectionHandler::new(RideService::new(ctx.clone()), ctx.bus.clone()));
        serve_connection(socket, ctx.bus.clone(), ConnectionIdentity::Admin, query.socket_id, handler).await;
    })
}
