// Job Specification - what the operator runs and how outcomes are shaped

use crate::domain::{PipelineOptions, TaskId};
use crate::error::{AppError, Result};
use crate::pipeline::PipelineContext;
use crate::port::{ExecutionError, JobHandle};

/// Caller-supplied description of a pipeline job.
///
/// `Raw` is what [`JobSpec::result`] extracts from a finished job; `Output`
/// is what the task returns to the scheduler, produced by either
/// [`JobSpec::success`] or [`JobSpec::failure`].
pub trait JobSpec: Send + Sync {
    type Raw;
    type Output;

    fn task_id(&self) -> &TaskId;

    /// Backend options; `None` means the defaults
    fn options(&self) -> Option<&PipelineOptions> {
        None
    }

    /// Fail fast on malformed configuration
    fn validate(&self) -> Result<()>;

    /// Register the computation on `ctx`
    fn pipeline(&self, ctx: &mut PipelineContext) -> anyhow::Result<()>;

    /// Extract the raw result of a finished job
    fn result(&self, ctx: &PipelineContext, handle: &dyn JobHandle) -> anyhow::Result<Self::Raw>;

    fn success(&self, raw: Self::Raw) -> Self::Output;

    fn failure(&self, error: ExecutionError) -> Self::Output;
}

type PipelineFn = Box<dyn Fn(&mut PipelineContext) -> anyhow::Result<()> + Send + Sync>;
type ResultFn<R> =
    Box<dyn Fn(&PipelineContext, &dyn JobHandle) -> anyhow::Result<R> + Send + Sync>;
type SuccessFn<R, T> = Box<dyn Fn(R) -> T + Send + Sync>;
type FailureFn<T> = Box<dyn Fn(ExecutionError) -> T + Send + Sync>;

/// Provider state handed out by `PipelineOperator::provide`.
///
/// # Example
/// ```text
/// let spec = PipelineOperator::provide("word-count")
///     .options(PipelineOptions::from_args(["--jobName=word-count"])?)
///     .pipeline(|ctx| {
///         let lines = ctx.read("lines");
///         ctx.write("out", &lines);
///         Ok(())
///     })
///     .result(|_ctx, handle| Ok(handle.output("out")?.len()))
///     .success(|n| format!("{} lines", n))
///     .failure(|e| format!("failed: {}", e));
/// ```
pub struct JobSpecBuilder {
    task_id: TaskId,
    options: Option<PipelineOptions>,
    pipeline: Option<PipelineFn>,
}

impl JobSpecBuilder {
    pub fn new(task_id: impl Into<TaskId>) -> Self {
        Self {
            task_id: task_id.into(),
            options: None,
            pipeline: None,
        }
    }

    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn pipeline<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut PipelineContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.pipeline = Some(Box::new(f));
        self
    }

    pub fn result<R, F>(self, f: F) -> ResultSpecBuilder<R>
    where
        F: Fn(&PipelineContext, &dyn JobHandle) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        ResultSpecBuilder {
            base: self,
            result: Box::new(f),
        }
    }
}

pub struct ResultSpecBuilder<R> {
    base: JobSpecBuilder,
    result: ResultFn<R>,
}

impl<R> ResultSpecBuilder<R> {
    pub fn success<T, F>(self, f: F) -> OutcomeSpecBuilder<R, T>
    where
        F: Fn(R) -> T + Send + Sync + 'static,
    {
        OutcomeSpecBuilder {
            base: self,
            success: Box::new(f),
        }
    }
}

pub struct OutcomeSpecBuilder<R, T> {
    base: ResultSpecBuilder<R>,
    success: SuccessFn<R, T>,
}

impl<R, T> OutcomeSpecBuilder<R, T> {
    pub fn failure<F>(self, f: F) -> PipelineJobSpec<R, T>
    where
        F: Fn(ExecutionError) -> T + Send + Sync + 'static,
    {
        let ResultSpecBuilder { base, result } = self.base;
        PipelineJobSpec {
            task_id: base.task_id,
            options: base.options,
            pipeline: base.pipeline,
            result,
            success: self.success,
            failure: Box::new(f),
        }
    }
}

/// Closure-backed [`JobSpec`] produced by [`JobSpecBuilder`]
pub struct PipelineJobSpec<R, T> {
    task_id: TaskId,
    options: Option<PipelineOptions>,
    pipeline: Option<PipelineFn>,
    result: ResultFn<R>,
    success: SuccessFn<R, T>,
    failure: FailureFn<T>,
}

impl<R, T> JobSpec for PipelineJobSpec<R, T> {
    type Raw = R;
    type Output = T;

    fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    fn options(&self) -> Option<&PipelineOptions> {
        self.options.as_ref()
    }

    fn validate(&self) -> Result<()> {
        if self.task_id.as_str().trim().is_empty() {
            return Err(AppError::Validation("task id cannot be empty".to_string()));
        }
        if self.pipeline.is_none() {
            return Err(AppError::Validation(format!(
                "task {}: pipeline not set",
                self.task_id
            )));
        }
        if let Some(options) = &self.options {
            options
                .validate()
                .map_err(|e| AppError::Validation(format!("task {}: {}", self.task_id, e)))?;
        }
        Ok(())
    }

    fn pipeline(&self, ctx: &mut PipelineContext) -> anyhow::Result<()> {
        match &self.pipeline {
            Some(f) => f(ctx),
            None => anyhow::bail!("pipeline not set for task {}", self.task_id),
        }
    }

    fn result(&self, ctx: &PipelineContext, handle: &dyn JobHandle) -> anyhow::Result<R> {
        (self.result)(ctx, handle)
    }

    fn success(&self, raw: R) -> T {
        (self.success)(raw)
    }

    fn failure(&self, error: ExecutionError) -> T {
        (self.failure)(error)
    }
}
