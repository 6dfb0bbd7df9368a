pub mod expansion;
pub mod generation;
pub mod journey;
pub mod snapshot;

pub use expansion::{fallback_suggestions, Expansion, ExpansionController};
pub use generation::GenerationPipeline;
pub use journey::Journey;
pub use snapshot::MemorySnapshotStore;
