// pipetask Infrastructure - Local Adapters
// Implements: ExecutionBackend (in-process), tracing setup

pub mod jsonl;
pub mod local_backend;
pub mod telemetry;

pub use local_backend::{LocalBackend, LocalJobHandle};
pub use telemetry::init_tracing;
