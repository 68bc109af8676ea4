//! `RideContext`: the Arc bundle every orchestration method closes over.
//! Assembled once by `ride-node` at startup and cloned cheaply into both
//! the jsonrpsee server and the raw-frame `ConnectionHandler`.

use ride_dispatch::DispatchPipeline;
use ride_events::Bus;
use ride_finalize::Finalizer;
use ride_presence::PresenceRegistry;
use ride_store::RideEngine;
use std::sync::Arc;

#[derive(Clone)]
pub struct RideContext {
    pub engine: Arc<RideEngine>,
    pub bus: Arc<Bus>,
    pub dispatch: Arc<DispatchPipeline>,
    pub presence: Arc<PresenceRegistry>,
    pub finalizer: Arc<Finalizer>,
}
