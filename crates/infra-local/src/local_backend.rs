// Local execution backend
// Runs pipeline graphs in-process on a tokio task, reading in-memory datasets
// or JSON-lines files and writing `file://` sinks back to disk

use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::jsonl::{file_path, read_jsonl, write_jsonl};
use pipetask_core::domain::{BackendJobId, JobRun, JobState, PipelineOptions, Record};
use pipetask_core::pipeline::{run_stages, PipelineGraph, SourceReader};
use pipetask_core::port::{ExecutionBackend, ExecutionError, IdProvider, JobHandle, TimeProvider};

/// Prefix of the job ids handed out by this backend
pub const LOCAL_JOB_ID_PREFIX: &str = "local-";

/// Local execution backend
pub struct LocalBackend {
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    datasets: HashMap<String, Vec<Record>>,
}

impl LocalBackend {
    /// Create a new local backend
    ///
    /// # Arguments
    /// * `id_provider` - Source of job ids (`local-<id>`)
    /// * `time_provider` - Clock for run timestamps
    ///
    /// # Example
    /// ```ignore
    /// let backend = LocalBackend::new(Arc::new(UuidProvider), Arc::new(SystemTimeProvider))
    ///     .with_dataset("lines", vec![json!("a b")]);
    /// ```
    pub fn new(id_provider: Arc<dyn IdProvider>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            id_provider,
            time_provider,
            datasets: HashMap::new(),
        }
    }

    /// Serve `records` to reads of `name`, ahead of any file lookup
    pub fn with_dataset(mut self, name: impl Into<String>, records: Vec<Record>) -> Self {
        self.datasets.insert(name.into(), records);
        self
    }

    /// Spawn the job and hand back its concrete handle
    pub fn start(
        &self,
        graph: PipelineGraph,
        options: &PipelineOptions,
    ) -> Result<LocalJobHandle, ExecutionError> {
        graph.validate()?;

        let job_id = format!("{}{}", LOCAL_JOB_ID_PREFIX, self.id_provider.generate_id());
        let reader = LocalSourceReader {
            datasets: self.datasets.clone(),
        };
        let time_provider = Arc::clone(&self.time_provider);

        info!(
            job_id = %job_id,
            job_name = %options.job_name,
            stages = graph.stages().len(),
            "Starting local job"
        );

        let task = tokio::task::spawn(async move {
            let started_at = time_provider.now_millis();
            let evaluation = run_stages(&graph, &reader).await?;
            for (sink, records) in &evaluation.outputs {
                if let Some(path) = file_path(sink) {
                    write_jsonl(path, records).await?;
                }
            }
            Ok(evaluation.into_run(started_at, time_provider.now_millis()))
        });

        Ok(LocalJobHandle {
            job_id,
            task: Some(task),
            state: JobState::Running,
            run: None,
            error: None,
        })
    }
}

#[async_trait]
impl ExecutionBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn submit(
        &self,
        graph: PipelineGraph,
        options: &PipelineOptions,
    ) -> Result<Box<dyn JobHandle>, ExecutionError> {
        Ok(Box::new(self.start(graph, options)?))
    }
}

struct LocalSourceReader {
    datasets: HashMap<String, Vec<Record>>,
}

#[async_trait]
impl SourceReader for LocalSourceReader {
    async fn read(&self, source: &str) -> Result<Vec<Record>, ExecutionError> {
        if let Some(records) = self.datasets.get(source) {
            return Ok(records.clone());
        }
        match file_path(source) {
            Some(path) => read_jsonl(path).await,
            None => Err(ExecutionError::SourceNotFound(source.to_string())),
        }
    }
}

/// Handle on a job running on the local backend.
///
/// Dropping the handle of an unfinished job aborts it.
pub struct LocalJobHandle {
    job_id: BackendJobId,
    task: Option<JoinHandle<Result<JobRun, ExecutionError>>>,
    state: JobState,
    run: Option<JobRun>,
    error: Option<ExecutionError>,
}

impl LocalJobHandle {
    /// Abort the job. Has no effect once the job has finished.
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            info!(job_id = %self.job_id, "Cancelling local job");
            task.abort();
        }
    }

    fn settle(&mut self, to: JobState) -> Result<(), ExecutionError> {
        self.state = self
            .state
            .finish(to)
            .map_err(|e| ExecutionError::JobFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl JobHandle for LocalJobHandle {
    fn backend_job_id(&self) -> Option<BackendJobId> {
        Some(self.job_id.clone())
    }

    fn state(&self) -> JobState {
        self.state
    }

    async fn wait_until_finish(&mut self) -> Result<JobState, ExecutionError> {
        if let Some(task) = self.task.as_mut() {
            let joined = task.await;
            self.task = None;
            match joined {
                Ok(Ok(run)) => {
                    info!(
                        job_id = %self.job_id,
                        duration_ms = run.duration_ms(),
                        "Local job done"
                    );
                    self.settle(JobState::Done)?;
                    self.run = Some(run);
                }
                Ok(Err(e)) => {
                    error!(job_id = %self.job_id, error = %e, "Local job failed");
                    self.settle(JobState::Failed)?;
                    self.error = Some(e);
                }
                Err(join_err) => {
                    let (state, reason) = if join_err.is_panic() {
                        let msg = panic_message(join_err.into_panic());
                        (JobState::Failed, format!("job panicked: {}", msg))
                    } else {
                        (JobState::Cancelled, "job was cancelled".to_string())
                    };
                    error!(job_id = %self.job_id, reason = %reason, "Local job terminated");
                    self.settle(state)?;
                    self.error = Some(ExecutionError::Aborted(reason));
                }
            }
        }

        match (self.state, &self.error) {
            (JobState::Done, _) => Ok(JobState::Done),
            (_, Some(e)) => Err(e.clone()),
            (state, None) => Err(ExecutionError::JobFailed(format!("job in state {}", state))),
        }
    }

    fn run(&self) -> Option<&JobRun> {
        self.run.as_ref()
    }
}

impl Drop for LocalJobHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
