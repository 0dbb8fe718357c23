//! Shared fixtures for the end-to-end tests

use pipetask_core::application::PipelineJobSpec;
use pipetask_core::port::ExecutionError;
use pipetask_core::PipelineOperator;
use serde_json::json;
use std::collections::BTreeMap;

pub type WordCounts = BTreeMap<String, u64>;

/// What a word-count task hands back to the scheduler
#[derive(Debug, PartialEq)]
pub enum TaskOutcome {
    Counted(WordCounts),
    Failed(ExecutionError),
}

/// Split every line of `source` into lowercase words written to `sink`;
/// the result counts the words found in `sink`
pub fn word_count_spec(
    task_id: &str,
    source: &str,
    sink: &str,
) -> PipelineJobSpec<WordCounts, TaskOutcome> {
    let source = source.to_string();
    let sink = sink.to_string();
    let result_sink = sink.clone();

    PipelineOperator::provide(task_id)
        .pipeline(move |ctx| {
            let lines = ctx.read(source.clone());
            let words = ctx.flat_map("split_words", &lines, |line| {
                let line = line
                    .as_str()
                    .ok_or_else(|| anyhow::anyhow!("expected a string line, got {}", line))?;
                Ok(line
                    .split_whitespace()
                    .map(|w| json!(w.to_lowercase()))
                    .collect())
            });
            ctx.write(sink.clone(), &words);
            Ok(())
        })
        .result(move |_ctx, handle| {
            let mut counts = WordCounts::new();
            for word in handle.output(&result_sink)? {
                let word = word
                    .as_str()
                    .ok_or_else(|| anyhow::anyhow!("non-string word {}", word))?;
                *counts.entry(word.to_string()).or_default() += 1;
            }
            Ok(counts)
        })
        .success(TaskOutcome::Counted)
        .failure(TaskOutcome::Failed)
}

pub fn counts(pairs: &[(&str, u64)]) -> WordCounts {
    pairs.iter().map(|(w, n)| (w.to_string(), *n)).collect()
}
