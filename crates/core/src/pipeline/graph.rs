// Pipeline graph - the stages a job specification registers on a context

use crate::domain::Record;
use crate::port::ExecutionError;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Element-wise transform; every stage kind is normalised to one-to-many
pub type TransformFn = Arc<dyn Fn(Record) -> anyhow::Result<Vec<Record>> + Send + Sync>;

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Handle on the output of a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PCollection {
    pub(crate) graph: u64,
    pub(crate) stage: usize,
    name: String,
}

impl PCollection {
    /// Name of the stage producing this collection
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone)]
pub enum StageKind {
    Read { source: String },
    Transform { input: usize, f: TransformFn },
    Write { input: usize, sink: String },
}

#[derive(Clone)]
pub struct Stage {
    pub name: String,
    pub kind: StageKind,
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StageKind::Read { source } => write!(f, "Read({} <- {})", self.name, source),
            StageKind::Transform { input, .. } => {
                write!(f, "Transform({} <- #{})", self.name, input)
            }
            StageKind::Write { input, sink } => {
                write!(f, "Write({} <- #{} -> {})", self.name, input, sink)
            }
        }
    }
}

/// Stages in registration order. Inputs always refer to earlier stages, so
/// registration order is a valid evaluation order.
///
/// Every graph has its own id; collections produced by another graph are
/// recorded at registration and rejected by [`PipelineGraph::validate`].
#[derive(Clone, Debug)]
pub struct PipelineGraph {
    id: u64,
    stages: Vec<Stage>,
    foreign_inputs: Vec<String>,
}

impl Default for PipelineGraph {
    fn default() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            stages: Vec::new(),
            foreign_inputs: Vec::new(),
        }
    }
}

impl PipelineGraph {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub(crate) fn push(&mut self, name: String, kind: StageKind) -> PCollection {
        self.stages.push(Stage {
            name: name.clone(),
            kind,
        });
        PCollection {
            graph: self.id,
            stage: self.stages.len() - 1,
            name,
        }
    }

    /// Stage index `consumer` reads from
    pub(crate) fn input_of(&mut self, consumer: &str, input: &PCollection) -> usize {
        if input.graph != self.id {
            self.foreign_inputs.push(consumer.to_string());
        }
        input.stage
    }

    /// Reject graphs a backend cannot run
    pub fn validate(&self) -> Result<(), ExecutionError> {
        if self.stages.is_empty() {
            return Err(ExecutionError::Build("pipeline has no stages".to_string()));
        }
        if let Some(stage) = self.foreign_inputs.first() {
            return Err(ExecutionError::Build(format!(
                "stage '{}' reads from a collection of another pipeline",
                stage
            )));
        }

        let mut names = HashSet::new();
        for (idx, stage) in self.stages.iter().enumerate() {
            if !names.insert(stage.name.as_str()) {
                return Err(ExecutionError::Build(format!(
                    "duplicate stage name '{}'",
                    stage.name
                )));
            }
            let input = match &stage.kind {
                StageKind::Read { .. } => None,
                StageKind::Transform { input, .. } | StageKind::Write { input, .. } => Some(*input),
            };
            if let Some(input) = input {
                if input >= idx {
                    return Err(ExecutionError::Build(format!(
                        "stage '{}' reads from a later stage",
                        stage.name
                    )));
                }
                if matches!(self.stages[input].kind, StageKind::Write { .. }) {
                    return Err(ExecutionError::Build(format!(
                        "stage '{}' reads from write stage '{}'",
                        stage.name, self.stages[input].name
                    )));
                }
            }
        }
        Ok(())
    }
}
