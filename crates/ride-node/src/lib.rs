//! The assembly wiring for the `ride-node` binary, split out as a library
//! target so integration tests can build the same `RideContext` an
//! in-process node would run, without going over the network.

pub mod config;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use ride_arbiter::Arbiter;
use ride_dispatch::{DispatchPipeline, Sweeper};
use ride_events::Bus;
use ride_finalize::{Finalizer, NullGateway};
use ride_presence::PresenceRegistry;
use ride_rpc::RideContext;
use ride_store::{InMemoryLockStore, MemRideStore, RideEngine, RideStore};

pub use config::Config;

/// Builds a fully wired node (store, engine, presence, dispatch pipeline +
/// worker pool, sweeper, finalizer, bus) and starts its background tasks,
/// returning the `RideContext` both wire transports are built over.
pub async fn build_context(config: &Config) -> anyhow::Result<RideContext> {
    let store: Arc<dyn RideStore> = Arc::new(MemRideStore::new());
    let locks = Arc::new(InMemoryLockStore::new());
    let engine = Arc::new(RideEngine::new(store.clone(), locks.clone()));
    let presence = Arc::new(PresenceRegistry::new(store.clone(), Duration::from_secs(config.driver_presence_ttl_sec)));
    let arbiter = Arc::new(Arbiter::new(locks));
    let bus = Arc::new(Bus::new(store.clone()));

    ride_genesis::bootstrap(&store, config.settings())?;

    let dispatch = DispatchPipeline::spawn(engine.clone(), presence.clone(), arbiter.clone(), bus.clone(), config.dispatch_config());
    Sweeper::spawn(dispatch.clone());

    let gateway: Arc<dyn ride_finalize::Gateway> = Arc::new(NullGateway);
    let finalizer = Arc::new(Finalizer::new(store.clone(), gateway, bus.clone()));

    Ok(RideContext { engine, bus, dispatch, presence, finalizer })
}
