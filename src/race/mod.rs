pub mod engine;
pub mod snapshot;

pub use engine::Race;
pub use snapshot::RaceSnapshot;
