// Domain Layer - identities, options and job state

pub mod error;
pub mod job;
pub mod options;
pub mod task;

// Re-exports
pub use error::DomainError;
pub use job::{BackendJobId, JobRun, JobState, Record};
pub use options::PipelineOptions;
pub use task::{TaskId, TestId};
