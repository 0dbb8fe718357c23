// pipetask Core - Pipeline operator, ports and test harness
// NO infrastructure dependencies: backends live in the infra crates

pub mod application;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod port;

pub use application::{ExecutionMode, JobSpec, JobTest, MockRegistry, PipelineOperator};
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
