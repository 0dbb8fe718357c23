// Pipeline Operator - runs a job specification to exactly one outcome

use crate::application::constants::JOB_ID_META_KEY;
use crate::application::job_spec::{JobSpec, JobSpecBuilder};
use crate::application::job_test::JobTest;
use crate::application::mock_registry::MockRegistry;
use crate::domain::{JobState, PipelineOptions, TaskId};
use crate::error::{AppError, Result};
use crate::pipeline::PipelineContext;
use crate::port::{ExecutionBackend, ExecutionError, OperationListener};
use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// How a task is executed, decided by the caller at each `perform`
#[derive(Debug, Clone)]
pub enum ExecutionMode {
    /// Submit to the operator's execution backend
    Production,
    /// Serve mocks registered for the current test run
    Test(Arc<MockRegistry>),
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Production => write!(f, "PRODUCTION"),
            ExecutionMode::Test(_) => write!(f, "TEST"),
        }
    }
}

/// Bridges the scheduler's task contract and the pipeline job lifecycle.
///
/// Past validation every job failure (submit, await, extraction, harness
/// teardown) becomes `spec.failure(..)`. Only a malformed specification or a
/// missing/invalid test mock is returned as `Err`. Nothing is retried.
pub struct PipelineOperator {
    backend: Arc<dyn ExecutionBackend>,
}

impl PipelineOperator {
    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        Self { backend }
    }

    /// Provider state for a task: a builder for its job specification
    pub fn provide(task_id: impl Into<TaskId>) -> JobSpecBuilder {
        JobSpecBuilder::new(task_id)
    }

    /// Run `spec` to completion and shape the outcome through it
    ///
    /// # Errors
    /// - AppError::Validation if `spec.validate()` fails
    /// - AppError::Domain if the spec has no options and the `PIPETASK_*`
    ///   environment holds invalid ones
    /// - AppError::MockNotConfigured if test mode has no mock for the task
    /// - AppError::MockTypeMismatch if the literal mock has the wrong type
    /// - AppError::InvalidState if a scripted test does not yield a genuine
    ///   test context for the task
    pub async fn perform<S>(
        &self,
        spec: &S,
        listener: &dyn OperationListener,
        mode: &ExecutionMode,
    ) -> Result<S::Output>
    where
        S: JobSpec,
        S::Raw: Clone + Send + Sync + 'static,
    {
        spec.validate()?;

        info!(task_id = %spec.task_id(), mode = %mode, "Performing pipeline task");

        match mode {
            ExecutionMode::Production => self.perform_production(spec, listener).await,
            ExecutionMode::Test(mocks) => self.perform_test(spec, listener, mocks).await,
        }
    }

    async fn perform_production<S>(
        &self,
        spec: &S,
        listener: &dyn OperationListener,
    ) -> Result<S::Output>
    where
        S: JobSpec,
    {
        let options = resolve_options(spec, PipelineOptions::from_env)?;
        let mut ctx = PipelineContext::new(options, Arc::clone(&self.backend));

        let outcome = execute(spec, &mut ctx, listener).await;
        Ok(finish(spec, outcome))
    }

    async fn perform_test<S>(
        &self,
        spec: &S,
        listener: &dyn OperationListener,
        mocks: &MockRegistry,
    ) -> Result<S::Output>
    where
        S: JobSpec,
        S::Raw: Clone + Send + Sync + 'static,
    {
        let task_id = spec.task_id();

        if let Some(literal) = mocks.lookup_literal(task_id) {
            let raw = literal
                .downcast_ref::<S::Raw>()
                .cloned()
                .ok_or_else(|| AppError::MockTypeMismatch {
                    task_id: task_id.clone(),
                    expected: type_name::<S::Raw>(),
                })?;
            info!(task_id = %task_id, "Returning mocked literal result");
            return Ok(spec.success(raw));
        }

        let factory = mocks
            .lookup_scripted(task_id)
            .ok_or_else(|| AppError::MockNotConfigured(task_id.clone()))?;

        let options = resolve_options(spec, PipelineOptions::from_env)?;

        let mut test = factory();
        if let Err(e) = test.set_up() {
            return Ok(finish(spec, Err(e)));
        }

        let mut ctx = test_context(task_id, &test, options)?;

        let raw = match execute(spec, &mut ctx, listener).await {
            Ok(raw) => raw,
            // The harness is only torn down after a successful extraction
            Err(e) => return Ok(finish(spec, Err(e))),
        };
        let outcome = test.tear_down().map(|()| raw);
        Ok(finish(spec, outcome))
    }
}

/// Options of the job: the specification's own, else the `PIPETASK_*` environment
pub(super) fn resolve_options<S, F>(spec: &S, from_env: F) -> Result<PipelineOptions>
where
    S: JobSpec,
    F: FnOnce() -> PipelineOptions,
{
    match spec.options() {
        Some(options) => Ok(options.clone()),
        None => {
            let options = from_env();
            options.validate()?;
            Ok(options)
        }
    }
}

/// Build the scripted context and make sure it really is the task's test context
fn test_context(
    task_id: &TaskId,
    test: &JobTest,
    options: PipelineOptions,
) -> Result<PipelineContext> {
    let expected = task_id.test_id();
    let ctx = test.context(options).map_err(|e| {
        AppError::InvalidState(format!("task {}: no test context: {}", task_id, e))
    })?;

    if !ctx.is_test() || ctx.test_id() != Some(&expected) {
        return Err(AppError::InvalidState(format!(
            "task {}: expected test context '{}', got {:?}",
            task_id,
            expected,
            ctx.test_id().map(|id| id.as_str())
        )));
    }
    info!(task_id = %task_id, test_id = %expected, "Running scripted job test");
    Ok(ctx)
}

/// pipeline -> submit -> report job id -> await -> extract
async fn execute<S>(
    spec: &S,
    ctx: &mut PipelineContext,
    listener: &dyn OperationListener,
) -> std::result::Result<S::Raw, ExecutionError>
where
    S: JobSpec,
{
    let task_id = spec.task_id();

    spec.pipeline(ctx).map_err(ExecutionError::build)?;

    let mut handle = ctx.submit().await?;

    let job_id = handle.backend_job_id();
    if let Some(job_id) = &job_id {
        info!(task_id = %task_id, job_id = %job_id, "Pipeline job submitted");
        listener.meta(task_id, JOB_ID_META_KEY, job_id);
    }

    match handle.wait_until_finish().await? {
        JobState::Done => {}
        state => {
            return Err(ExecutionError::JobFailed(format!(
                "job finished in state {}",
                state
            )));
        }
    }
    info!(task_id = %task_id, job_id = ?job_id, "Pipeline job done");

    spec.result(ctx, handle.as_ref()).map_err(ExecutionError::extraction)
}

fn finish<S>(spec: &S, outcome: std::result::Result<S::Raw, ExecutionError>) -> S::Output
where
    S: JobSpec,
{
    match outcome {
        Ok(raw) => {
            info!(task_id = %spec.task_id(), "Pipeline task succeeded");
            spec.success(raw)
        }
        Err(e) => {
            match &e {
                ExecutionError::Build(_) | ExecutionError::Harness(_) => {
                    warn!(task_id = %spec.task_id(), error = %e, "Pipeline task failed")
                }
                _ => error!(task_id = %spec.task_id(), error = %e, "Pipeline task failed"),
            }
            spec.failure(e)
        }
    }
}
