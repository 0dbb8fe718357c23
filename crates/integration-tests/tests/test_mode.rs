//! End-to-end: the same task specification under test mode

use pipetask_core::domain::TaskId;
use pipetask_core::port::id_provider::UuidProvider;
use pipetask_core::port::listener::mocks::RecordingListener;
use pipetask_core::port::time_provider::SystemTimeProvider;
use pipetask_core::port::{ExecutionError, TracingListener};
use pipetask_core::{AppError, ExecutionMode, MockRegistry, PipelineOperator};
use pipetask_infra_local::{init_tracing, LocalBackend};
use pipetask_integration_tests::{counts, word_count_spec, TaskOutcome};
use serde_json::json;
use std::sync::Arc;

/// Production backend with no data: any test reaching it would fail
fn operator() -> PipelineOperator {
    PipelineOperator::new(Arc::new(LocalBackend::new(
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
    )))
}

#[tokio::test]
async fn test_one_registry_serves_several_tasks() {
    let registry = Arc::new(MockRegistry::new());
    registry.set_literal_result("upstream-count", counts(&[("cached", 1)]));
    registry.set_scripted_test("daily-word-count", |t| {
        t.input("gs://logs/lines", vec![json!("a b a")]).output("gs://out/words", |words| {
            anyhow::ensure!(words.len() == 3, "expected 3 words, got {}", words.len());
            Ok(())
        })
    });
    let mode = ExecutionMode::Test(Arc::clone(&registry));
    let operator = operator();
    let listener = RecordingListener::new();

    let upstream = word_count_spec("upstream-count", "gs://logs/lines", "gs://out/words");
    let daily = word_count_spec("daily-word-count", "gs://logs/lines", "gs://out/words");

    assert_eq!(
        operator.perform(&upstream, &listener, &mode).await.unwrap(),
        TaskOutcome::Counted(counts(&[("cached", 1)]))
    );
    assert_eq!(
        operator.perform(&daily, &listener, &mode).await.unwrap(),
        TaskOutcome::Counted(counts(&[("a", 2), ("b", 1)]))
    );
    assert!(listener.calls().is_empty());
}

#[tokio::test]
async fn test_scripted_test_is_fresh_per_perform() {
    let registry = Arc::new(MockRegistry::new());
    registry.set_scripted_test("rerun", |t| t.input("lines", vec![json!("x")]));
    let mode = ExecutionMode::Test(registry);
    let operator = operator();
    let spec = word_count_spec("rerun", "lines", "words");

    for _ in 0..2 {
        let outcome = operator
            .perform(&spec, &RecordingListener::new(), &mode)
            .await
            .unwrap();
        assert_eq!(outcome, TaskOutcome::Counted(counts(&[("x", 1)])));
    }
}

#[tokio::test]
async fn test_unused_scripted_input_fails_the_task() {
    let registry = Arc::new(MockRegistry::new());
    registry.set_scripted_test("sloppy", |t| {
        t.input("lines", vec![json!("x")])
            .input("forgotten", vec![json!("y")])
    });
    let spec = word_count_spec("sloppy", "lines", "words");

    let outcome = operator()
        .perform(&spec, &RecordingListener::new(), &ExecutionMode::Test(registry))
        .await
        .unwrap();

    match outcome {
        TaskOutcome::Failed(ExecutionError::Harness(msg)) => {
            assert!(msg.contains("sloppy: unused test inputs: forgotten"))
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_setup_is_fatal() {
    let registry = Arc::new(MockRegistry::new());
    registry.set_literal_result("other-task", counts(&[]));
    let spec = word_count_spec("forgotten-task", "lines", "words");

    let err = operator()
        .perform(&spec, &RecordingListener::new(), &ExecutionMode::Test(registry))
        .await
        .unwrap_err();

    match err {
        AppError::MockNotConfigured(task_id) => {
            assert_eq!(task_id, TaskId::new("forgotten-task"))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_cleared_mock_is_no_longer_served() {
    let registry = Arc::new(MockRegistry::new());
    registry.set_literal_result("flaky", counts(&[("z", 9)]));
    registry.clear(&TaskId::new("flaky"));
    let spec = word_count_spec("flaky", "lines", "words");

    let result = operator()
        .perform(&spec, &RecordingListener::new(), &ExecutionMode::Test(registry))
        .await;

    assert!(matches!(result, Err(AppError::MockNotConfigured(_))));
}

#[tokio::test]
async fn test_literal_result_with_tracing_listener() {
    // Another test binary may already own the global subscriber
    let _ = init_tracing();

    let registry = Arc::new(MockRegistry::new());
    registry.set_literal_result("traced", counts(&[("t", 3)]));
    let spec = word_count_spec("traced", "lines", "words");

    let outcome = operator()
        .perform(&spec, &TracingListener, &ExecutionMode::Test(registry))
        .await
        .unwrap();

    assert_eq!(outcome, TaskOutcome::Counted(counts(&[("t", 3)])));
}
