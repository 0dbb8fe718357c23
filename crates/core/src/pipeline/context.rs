// Execution context - a constructed, not-yet-submitted pipeline

use crate::domain::{PipelineOptions, Record, TestId};
use crate::pipeline::graph::{PCollection, PipelineGraph, StageKind};
use crate::port::{ExecutionBackend, ExecutionError, JobHandle};
use std::sync::Arc;
use tracing::info;

/// Pipeline under construction, bound to the backend it will be submitted to
pub struct PipelineContext {
    options: PipelineOptions,
    test_id: Option<TestId>,
    backend: Arc<dyn ExecutionBackend>,
    graph: PipelineGraph,
    submitted: bool,
}

impl PipelineContext {
    /// Production context
    pub fn new(options: PipelineOptions, backend: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            options,
            test_id: None,
            backend,
            graph: PipelineGraph::default(),
            submitted: false,
        }
    }

    /// Context of a scripted test run, tagged with its test identifier
    pub fn for_test(
        test_id: TestId,
        options: PipelineOptions,
        backend: Arc<dyn ExecutionBackend>,
    ) -> Self {
        Self {
            test_id: Some(test_id),
            ..Self::new(options, backend)
        }
    }

    pub fn is_test(&self) -> bool {
        self.test_id.is_some()
    }

    pub fn test_id(&self) -> Option<&TestId> {
        self.test_id.as_ref()
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    /// Read every record of `source`. The stage is named `read:<source>`.
    pub fn read(&mut self, source: impl Into<String>) -> PCollection {
        let source = source.into();
        self.graph
            .push(format!("read:{}", source), StageKind::Read { source })
    }

    pub fn map<F>(&mut self, name: impl Into<String>, input: &PCollection, f: F) -> PCollection
    where
        F: Fn(Record) -> anyhow::Result<Record> + Send + Sync + 'static,
    {
        self.transform(name, input, move |r| Ok(vec![f(r)?]))
    }

    pub fn filter<F>(&mut self, name: impl Into<String>, input: &PCollection, f: F) -> PCollection
    where
        F: Fn(&Record) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.transform(name, input, move |r| {
            Ok(if f(&r)? { vec![r] } else { Vec::new() })
        })
    }

    pub fn flat_map<F>(&mut self, name: impl Into<String>, input: &PCollection, f: F) -> PCollection
    where
        F: Fn(Record) -> anyhow::Result<Vec<Record>> + Send + Sync + 'static,
    {
        self.transform(name, input, f)
    }

    /// Materialise `input` into `sink`. The stage is named `write:<sink>`.
    pub fn write(&mut self, sink: impl Into<String>, input: &PCollection) {
        let sink = sink.into();
        let name = format!("write:{}", sink);
        let input = self.graph.input_of(&name, input);
        self.graph.push(name, StageKind::Write { input, sink });
    }

    fn transform<F>(&mut self, name: impl Into<String>, input: &PCollection, f: F) -> PCollection
    where
        F: Fn(Record) -> anyhow::Result<Vec<Record>> + Send + Sync + 'static,
    {
        let name = name.into();
        let input = self.graph.input_of(&name, input);
        self.graph.push(
            name,
            StageKind::Transform {
                input,
                f: Arc::new(f),
            },
        )
    }

    /// Close the context and hand the graph to the backend.
    ///
    /// A context is submitted at most once; later calls fail without touching
    /// the backend.
    pub async fn submit(&mut self) -> Result<Box<dyn JobHandle>, ExecutionError> {
        if self.submitted {
            return Err(ExecutionError::Submit(
                "context has already been submitted".to_string(),
            ));
        }
        self.submitted = true;
        self.graph.validate()?;

        info!(
            runner = %self.backend.name(),
            job_name = %self.options.job_name,
            stages = self.graph.stages().len(),
            test_id = ?self.test_id.as_ref().map(TestId::as_str),
            "Submitting pipeline"
        );
        self.backend.submit(self.graph.clone(), &self.options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobRun, TaskId};
    use crate::port::execution_backend::mocks::MockBackend;
    use serde_json::json;

    #[test]
    fn test_production_context_is_not_test() {
        let backend = Arc::new(MockBackend::new_success(None, JobRun::default()));
        let ctx = PipelineContext::new(PipelineOptions::default(), backend);
        assert!(!ctx.is_test());
        assert!(ctx.test_id().is_none());
    }

    #[test]
    fn test_test_context_is_tagged() {
        let backend = Arc::new(MockBackend::new_success(None, JobRun::default()));
        let test_id = TaskId::new("wc-1").test_id();
        let ctx = PipelineContext::for_test(test_id.clone(), PipelineOptions::default(), backend);
        assert!(ctx.is_test());
        assert_eq!(ctx.test_id(), Some(&test_id));
    }

    #[test]
    fn test_stage_naming() {
        let backend = Arc::new(MockBackend::new_success(None, JobRun::default()));
        let mut ctx = PipelineContext::new(PipelineOptions::default(), backend);
        let input = ctx.read("gs://bucket/in");
        let doubled = ctx.map("double", &input, |r| Ok(json!(r.as_i64().unwrap_or(0) * 2)));
        ctx.write("gs://bucket/out", &doubled);

        let names: Vec<_> = ctx.graph().stages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["read:gs://bucket/in", "double", "write:gs://bucket/out"]
        );
    }

    #[tokio::test]
    async fn test_submit_once() {
        let backend = Arc::new(MockBackend::new_success(None, JobRun::default()));
        let mut ctx = PipelineContext::new(PipelineOptions::default(), backend.clone());
        let input = ctx.read("in");
        ctx.write("out", &input);

        assert!(ctx.submit().await.is_ok());

        let err = ctx.submit().await.err().unwrap();
        assert!(err.to_string().contains("already been submitted"));
        assert_eq!(backend.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_collection_of_another_context_is_rejected() {
        let backend = Arc::new(MockBackend::new_success(None, JobRun::default()));
        let mut first = PipelineContext::new(PipelineOptions::default(), backend.clone());
        let mut second = PipelineContext::new(PipelineOptions::default(), backend.clone());

        let foreign = first.read("a");
        second.read("b");
        second.read("c");
        second.write("out", &foreign);

        let err = second.submit().await.err().unwrap();
        assert_eq!(
            err,
            ExecutionError::Build(
                "stage 'write:out' reads from a collection of another pipeline".to_string()
            )
        );
        assert_eq!(backend.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_pipeline() {
        let backend = Arc::new(MockBackend::new_success(None, JobRun::default()));
        let mut ctx = PipelineContext::new(PipelineOptions::default(), backend.clone());

        let err = ctx.submit().await.err().unwrap();
        assert!(matches!(err, ExecutionError::Build(_)));
        assert_eq!(backend.submit_count(), 0);
    }
}
