// Port Layer - Interfaces for external collaborators

pub mod execution_backend;
pub mod id_provider; // For deterministic testing
pub mod listener;
pub mod time_provider;

// Re-exports
pub use execution_backend::{ExecutionBackend, ExecutionError, JobHandle};
pub use id_provider::IdProvider;
pub use listener::{NoopListener, OperationListener, TracingListener};
pub use time_provider::TimeProvider;
