// Execution Backend Port
// Abstraction over whatever runs a pipeline graph: a managed runner, the local
// in-process runner, or the scripted test harness

use crate::domain::{BackendJobId, JobRun, JobState, PipelineOptions, Record};
use crate::pipeline::PipelineGraph;
use async_trait::async_trait;
use thiserror::Error;

/// Execution errors
///
/// Everything in here is converted into the job specification's failure
/// outcome by the operator; none of it aborts the task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Pipeline build failed: {0}")]
    Build(String),

    #[error("Submit failed: {0}")]
    Submit(String),

    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Job terminated abnormally: {0}")]
    Aborted(String),

    #[error("Transform '{stage}' failed: {message}")]
    Transform { stage: String, message: String },

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Result extraction failed: {0}")]
    Extraction(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Test harness error: {0}")]
    Harness(String),
}

impl ExecutionError {
    /// Wrap a user callback error, keeping its whole context chain
    pub fn build(err: anyhow::Error) -> Self {
        ExecutionError::Build(format!("{:#}", err))
    }

    pub fn extraction(err: anyhow::Error) -> Self {
        ExecutionError::Extraction(format!("{:#}", err))
    }
}

/// Handle on a submitted job
#[async_trait]
pub trait JobHandle: Send + Sync {
    /// Identifier assigned by the backend, when it exposes one
    fn backend_job_id(&self) -> Option<BackendJobId>;

    fn state(&self) -> JobState;

    /// Block until the job reaches a terminal state
    ///
    /// # Errors
    /// - ExecutionError::JobFailed / Transform / SourceNotFound if the job failed
    /// - ExecutionError::Aborted if the job terminated abnormally
    async fn wait_until_finish(&mut self) -> Result<JobState, ExecutionError>;

    /// Artefacts of the run, available once the job is done
    fn run(&self) -> Option<&JobRun>;

    /// Materialised records of a sink
    fn output(&self, sink: &str) -> Result<&[Record], ExecutionError> {
        let run = self
            .run()
            .ok_or_else(|| ExecutionError::Extraction("job has not finished".to_string()))?;
        run.output(sink)
            .ok_or_else(|| ExecutionError::Extraction(format!("no output for sink '{}'", sink)))
    }

    /// Elements produced by a stage
    fn stage_count(&self, stage: &str) -> Option<u64> {
        self.run().and_then(|run| run.stage_counts.get(stage).copied())
    }
}

/// Execution Backend trait
///
/// Implementations:
/// - LocalBackend (infra-local): runs the graph on a tokio task
/// - HarnessBackend: runs the graph against scripted test inputs
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Short runner name, for logs
    fn name(&self) -> &str;

    /// Submit a graph for execution
    ///
    /// # Errors
    /// - ExecutionError::Submit if the backend refuses the job
    async fn submit(
        &self,
        graph: PipelineGraph,
        options: &PipelineOptions,
    ) -> Result<Box<dyn JobHandle>, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Shared, ordered log of calls made against mocks
    pub type EventLog = Arc<Mutex<Vec<String>>>;

    pub fn event_log() -> EventLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    /// Mock backend behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Submit and finish successfully with the given run
        Succeed {
            job_id: Option<BackendJobId>,
            run: JobRun,
        },
        /// Refuse the submission
        FailSubmit(String),
        /// Accept the job, then fail while awaiting it
        FailAwait {
            job_id: Option<BackendJobId>,
            message: String,
        },
        /// Accept the job, then terminate abnormally
        Abort(String),
        /// Accept the job, which ends up cancelled
        Cancel,
    }

    /// Mock Execution Backend for testing
    pub struct MockBackend {
        behavior: MockBehavior,
        submit_count: Arc<Mutex<usize>>,
        await_count: Arc<Mutex<usize>>,
        last_graph: Arc<Mutex<Option<PipelineGraph>>>,
        log: EventLog,
    }

    impl MockBackend {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                submit_count: Arc::new(Mutex::new(0)),
                await_count: Arc::new(Mutex::new(0)),
                last_graph: Arc::new(Mutex::new(None)),
                log: event_log(),
            }
        }
        pub fn new_success(job_id: Option<&str>, run: JobRun) -> Self {
            Self::new(MockBehavior::Succeed {
                job_id: job_id.map(str::to_string),
                run,
            })
        }
        pub fn new_submit_failure(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::FailSubmit(message.into()))
        }
        pub fn with_log(mut self, log: EventLog) -> Self {
            self.log = log;
            self
        }
        pub fn submit_count(&self) -> usize {
            *self.submit_count.lock().unwrap()
        }
        pub fn await_count(&self) -> usize {
            *self.await_count.lock().unwrap()
        }
        pub fn last_graph(&self) -> Option<PipelineGraph> {
            self.last_graph.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExecutionBackend for MockBackend {
        fn name(&self) -> &str {
            "mock"
        }

        async fn submit(
            &self,
            graph: PipelineGraph,
            _options: &PipelineOptions,
        ) -> Result<Box<dyn JobHandle>, ExecutionError> {
            *self.submit_count.lock().unwrap() += 1;
            *self.last_graph.lock().unwrap() = Some(graph);
            self.log.lock().unwrap().push("submit".to_string());

            if let MockBehavior::FailSubmit(msg) = &self.behavior {
                return Err(ExecutionError::Submit(msg.clone()));
            }
            Ok(Box::new(MockJobHandle {
                behavior: self.behavior.clone(),
                state: JobState::Running,
                run: None,
                await_count: Arc::clone(&self.await_count),
                log: Arc::clone(&self.log),
            }))
        }
    }

    /// Job handle produced by [`MockBackend`]
    pub struct MockJobHandle {
        behavior: MockBehavior,
        state: JobState,
        run: Option<JobRun>,
        await_count: Arc<Mutex<usize>>,
        log: EventLog,
    }

    #[async_trait]
    impl JobHandle for MockJobHandle {
        fn backend_job_id(&self) -> Option<BackendJobId> {
            match &self.behavior {
                MockBehavior::Succeed { job_id, .. } | MockBehavior::FailAwait { job_id, .. } => {
                    job_id.clone()
                }
                _ => None,
            }
        }

        fn state(&self) -> JobState {
            self.state
        }

        async fn wait_until_finish(&mut self) -> Result<JobState, ExecutionError> {
            *self.await_count.lock().unwrap() += 1;
            self.log.lock().unwrap().push("await".to_string());

            match &self.behavior {
                MockBehavior::Succeed { run, .. } => {
                    self.state = JobState::Done;
                    self.run = Some(run.clone());
                    Ok(JobState::Done)
                }
                MockBehavior::FailAwait { message, .. } => {
                    self.state = JobState::Failed;
                    Err(ExecutionError::JobFailed(message.clone()))
                }
                MockBehavior::Abort(message) => {
                    self.state = JobState::Failed;
                    Err(ExecutionError::Aborted(message.clone()))
                }
                MockBehavior::Cancel => {
                    self.state = JobState::Cancelled;
                    Ok(JobState::Cancelled)
                }
                MockBehavior::FailSubmit(_) => unreachable!("submit never hands out this handle"),
            }
        }

        fn run(&self) -> Option<&JobRun> {
            self.run.as_ref()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::*;
    use super::*;
    use serde_json::json;

    fn run_with_output() -> JobRun {
        let mut run = JobRun::default();
        run.outputs.insert("out".to_string(), vec![json!("a"), json!("b")]);
        run.stage_counts.insert("read:in".to_string(), 2);
        run
    }

    #[tokio::test]
    async fn test_output_requires_finished_job() {
        let backend = MockBackend::new_success(None, run_with_output());
        let mut handle = backend
            .submit(PipelineGraph::default(), &PipelineOptions::default())
            .await
            .unwrap();

        let err = handle.output("out").unwrap_err();
        assert!(err.to_string().contains("has not finished"));

        assert_eq!(handle.wait_until_finish().await.unwrap(), JobState::Done);
        assert_eq!(handle.output("out").unwrap().len(), 2);
        assert_eq!(handle.stage_count("read:in"), Some(2));
        assert!(handle.output("other").is_err());
    }

    #[tokio::test]
    async fn test_submit_failure() {
        let backend = MockBackend::new_submit_failure("quota exceeded");
        let result = backend
            .submit(PipelineGraph::default(), &PipelineOptions::default())
            .await;

        assert_eq!(
            result.err(),
            Some(ExecutionError::Submit("quota exceeded".to_string()))
        );
        assert_eq!(backend.submit_count(), 1);
    }

    #[test]
    fn test_wrapped_anyhow_keeps_context() {
        let err = anyhow::anyhow!("disk full").context("writing sink");
        assert_eq!(
            ExecutionError::extraction(err).to_string(),
            "Result extraction failed: writing sink: disk full"
        );
    }
}
