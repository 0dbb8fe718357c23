// Application Layer - the operator and its test-mode collaborators

pub mod constants;
pub mod job_spec;
pub mod mock_registry;
pub mod operator;


// Re-exports
pub use constants::JOB_ID_META_KEY;
pub use job_spec::{JobSpec, JobSpecBuilder, PipelineJobSpec};
pub use job_test::JobTest;
pub use mock_registry::{JobTestFactory, MockRegistry};
pub use operator::{ExecutionMode, PipelineOperator};
