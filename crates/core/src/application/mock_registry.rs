// Mock Registry - per-task test doubles for test-mode execution

use crate::application::job_test::JobTest;
use crate::domain::TaskId;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Literal result of any type, downcast by the operator
pub type LiteralResult = Arc<dyn Any + Send + Sync>;

/// Produces a fresh scripted test on every call
pub type JobTestFactory = Arc<dyn Fn() -> JobTest + Send + Sync>;

/// Test doubles keyed by task identity, scoped to one test run.
///
/// Populated by test setup before any task runs; the operator only reads it.
/// When both kinds are registered for a task, the literal result wins.
#[derive(Default)]
pub struct MockRegistry {
    literals: RwLock<HashMap<TaskId, LiteralResult>>,
    scripted: RwLock<HashMap<TaskId, JobTestFactory>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or overwrite) the result a task returns without running anything
    pub fn set_literal_result<R>(&self, task_id: impl Into<TaskId>, value: R)
    where
        R: Any + Send + Sync,
    {
        self.literals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task_id.into(), Arc::new(value));
    }

    /// Store (or overwrite) a scripted test for a task.
    ///
    /// Every lookup yields a fresh [`JobTest`] named after the task's test id,
    /// then shaped by `configure`.
    pub fn set_scripted_test<F>(&self, task_id: impl Into<TaskId>, configure: F)
    where
        F: Fn(JobTest) -> JobTest + Send + Sync + 'static,
    {
        let task_id = task_id.into();
        let test_id = task_id.test_id();
        let factory: JobTestFactory = Arc::new(move || configure(JobTest::new(test_id.clone())));
        self.set_job_test_factory(task_id, factory);
    }

    /// Store a raw factory. The operator rejects harnesses whose test id does
    /// not match the task's.
    pub fn set_job_test_factory(&self, task_id: impl Into<TaskId>, factory: JobTestFactory) {
        self.scripted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task_id.into(), factory);
    }

    pub fn lookup_literal(&self, task_id: &TaskId) -> Option<LiteralResult> {
        self.literals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(task_id)
            .cloned()
    }

    pub fn lookup_scripted(&self, task_id: &TaskId) -> Option<JobTestFactory> {
        self.scripted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(task_id)
            .cloned()
    }

    /// Forget every mock of a task
    pub fn clear(&self, task_id: &TaskId) {
        self.literals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(task_id);
        self.scripted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(task_id);
    }

    pub fn is_empty(&self) -> bool {
        self.literals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
            && self
                .scripted
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty()
    }
}

impl fmt::Debug for MockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut literals: Vec<String> = self
            .literals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .map(TaskId::to_string)
            .collect();
        let mut scripted: Vec<String> = self
            .scripted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .map(TaskId::to_string)
            .collect();
        literals.sort();
        scripted.sort();
        f.debug_struct("MockRegistry")
            .field("literals", &literals)
            .field("scripted", &scripted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_roundtrip_and_overwrite() {
        let registry = MockRegistry::new();
        let task_id = TaskId::new("count");

        registry.set_literal_result(task_id.clone(), 1u64);
        registry.set_literal_result(task_id.clone(), 2u64);

        let literal = registry.lookup_literal(&task_id).unwrap();
        assert_eq!(literal.downcast_ref::<u64>(), Some(&2));
        assert!(literal.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_scripted_factory_is_fresh_and_named() {
        let registry = MockRegistry::new();
        let task_id = TaskId::new("my-task-1");
        registry.set_scripted_test(task_id.clone(), |t| t.input("in", vec![]));

        let factory = registry.lookup_scripted(&task_id).unwrap();
        let mut first = factory();
        let second = factory();

        assert_eq!(first.test_id().as_str(), "my_task_1");
        first.set_up().unwrap();
        assert!(first.is_set_up());
        assert!(!second.is_set_up());
    }

    #[test]
    fn test_lookup_missing() {
        let registry = MockRegistry::new();
        let task_id = TaskId::new("nothing");
        assert!(registry.lookup_literal(&task_id).is_none());
        assert!(registry.lookup_scripted(&task_id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear() {
        let registry = MockRegistry::new();
        registry.set_literal_result("a", "x".to_string());
        registry.set_scripted_test("a", |t| t);
        assert!(!registry.is_empty());

        registry.clear(&TaskId::new("a"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_debug_lists_task_ids() {
        let registry = MockRegistry::new();
        registry.set_literal_result("b", 1i32);
        registry.set_scripted_test("a", |t| t);

        let debug = format!("{:?}", registry);
        assert_eq!(debug, r#"MockRegistry { literals: ["b"], scripted: ["a"] }"#);
    }
}
