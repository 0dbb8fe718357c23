// Operation Listener Port
// Scheduler-side sink for informational key/value metadata about a task

use crate::domain::TaskId;
use tracing::info;

/// Listener the scheduler hands to the operator for each task execution
pub trait OperationListener: Send + Sync {
    /// Report a piece of metadata. Best effort: never fails the task.
    fn meta(&self, task_id: &TaskId, key: &str, value: &str);
}

/// Listener that forwards metadata to the log
pub struct TracingListener;

impl OperationListener for TracingListener {
    fn meta(&self, task_id: &TaskId, key: &str, value: &str) {
        info!(task_id = %task_id, key = %key, value = %value, "Task metadata");
    }
}

/// Listener that drops everything
pub struct NoopListener;

impl OperationListener for NoopListener {
    fn meta(&self, _task_id: &TaskId, _key: &str, _value: &str) {}
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::port::execution_backend::mocks::EventLog;
    use std::sync::Mutex;

    /// A single recorded `meta` call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct MetaCall {
        pub task_id: TaskId,
        pub key: String,
        pub value: String,
    }

    /// Listener recording every call, optionally into a shared event log
    #[derive(Default)]
    pub struct RecordingListener {
        calls: Mutex<Vec<MetaCall>>,
        log: Option<EventLog>,
    }

    impl RecordingListener {
        pub fn new() -> Self {
            Self::default()
        }
        pub fn with_log(log: EventLog) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                log: Some(log),
            }
        }
        pub fn calls(&self) -> Vec<MetaCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl OperationListener for RecordingListener {
        fn meta(&self, task_id: &TaskId, key: &str, value: &str) {
            if let Some(log) = &self.log {
                log.lock().unwrap().push(format!("meta:{}", key));
            }
            self.calls.lock().unwrap().push(MetaCall {
                task_id: task_id.clone(),
                key: key.to_string(),
                value: value.to_string(),
            });
        }
    }
}
