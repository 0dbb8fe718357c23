// In-order graph evaluator shared by the local backend and the test harness

use crate::domain::{JobRun, Record};
use crate::pipeline::graph::{PipelineGraph, StageKind};
use crate::port::ExecutionError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

/// Where `Read` stages get their records from
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn read(&self, source: &str) -> Result<Vec<Record>, ExecutionError>;
}

/// Sink outputs and element counts of one evaluation
#[derive(Debug, Default)]
pub struct Evaluation {
    pub outputs: BTreeMap<String, Vec<Record>>,
    pub stage_counts: BTreeMap<String, u64>,
}

impl Evaluation {
    pub fn into_run(self, started_at: i64, finished_at: i64) -> JobRun {
        JobRun {
            outputs: self.outputs,
            stage_counts: self.stage_counts,
            started_at,
            finished_at,
        }
    }
}

/// Evaluate every stage of `graph` in registration order.
///
/// The first failing transform stops the run; partial sink outputs are dropped.
pub async fn run_stages(
    graph: &PipelineGraph,
    reader: &dyn SourceReader,
) -> Result<Evaluation, ExecutionError> {
    graph.validate()?;

    let mut collections: Vec<Vec<Record>> = Vec::with_capacity(graph.stages().len());
    let mut evaluation = Evaluation::default();

    for stage in graph.stages() {
        let produced = match &stage.kind {
            StageKind::Read { source } => reader.read(source).await?,
            StageKind::Transform { input, f } => {
                let mut out = Vec::new();
                for record in collections[*input].iter().cloned() {
                    let records = f(record).map_err(|e| ExecutionError::Transform {
                        stage: stage.name.clone(),
                        message: format!("{:#}", e),
                    })?;
                    out.extend(records);
                }
                out
            }
            StageKind::Write { input, sink } => {
                let records = collections[*input].clone();
                evaluation
                    .outputs
                    .entry(sink.clone())
                    .or_default()
                    .extend(records.iter().cloned());
                records
            }
        };

        debug!(stage = %stage.name, elements = produced.len(), "Stage evaluated");
        evaluation
            .stage_counts
            .insert(stage.name.clone(), produced.len() as u64);
        collections.push(produced);
    }

    Ok(evaluation)
}
