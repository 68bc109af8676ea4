pub mod haversine;
pub mod matcher;

pub use haversine::distance_km;
pub use matcher::{booking_type_eligible, progressive_search, select_candidates, CandidateInput, ScoredCandidate};
