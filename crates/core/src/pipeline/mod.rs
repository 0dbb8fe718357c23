// Pipeline model - authoring API over JSON records

pub mod context;
pub mod executor;
pub mod graph;

// Re-exports
pub use context::PipelineContext;
pub use executor::{run_stages, Evaluation, SourceReader};
pub use graph::{PCollection, PipelineGraph, Stage, StageKind, TransformFn};
