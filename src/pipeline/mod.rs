//! Pipeline orchestration.

pub mod coordinator;
pub mod timings;

pub use coordinator::PipelineCoordinator;
pub use timings::StageTimings;
