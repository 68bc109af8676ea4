//! The Dispatch engine (`spec.md` §4.1, §4.4, §4.5): candidate gathering,
//! the worker-pool-backed job queue, the progressive-radius Matcher, the
//! rejection cascade, and the Auto-Cancel Sweeper.

mod acceptance;
mod candidates;
mod config;
mod pipeline;
mod rejection;
mod sweeper;

pub use candidates::gather_candidates;
pub use config::DispatchConfig;
pub use pipeline::DispatchPipeline;
pub use sweeper::Sweeper;
