//! `ride-node`: wires every crate in the workspace into one long-lived
//! process — the durable store, the dispatch pipeline and its worker pool,
//! the auto-cancel sweeper, the event bus, and both wire transports
//! (jsonrpsee JSON-RPC and the raw-frame WebSocket gateway).

use std::net::SocketAddr;

use clap::Parser;
use ride_node::{build_context, ws, Config};
use ride_rpc::RideRpcServer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::parse();
    let ctx = build_context(&config).await?;

    let rpc_addr: SocketAddr = config.rpc_bind_addr.parse()?;
    let rpc_handle = RideRpcServer::new(ctx.clone()).start(rpc_addr).await?;

    let ws_addr: SocketAddr = config.ws_bind_addr.parse()?;
    let ws_router = ws::router(ctx);
    let listener = tokio::net::TcpListener::bind(ws_addr).await?;
    info!(%ws_addr, "ride websocket gateway listening");

    let ws_server = axum::serve(listener, ws_router);

    tokio::select! {
        result = ws_server => {
            if let Err(err) = result {
                tracing::error!(?err, "websocket gateway exited with an error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    rpc_handle.stop()?;
    Ok(())
}
