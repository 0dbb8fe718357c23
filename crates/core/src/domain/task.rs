// Task identity and the test identifier derived from it

use serde::{Deserialize, Serialize};
use std::fmt;

/// Task identity handed over by the scheduler (opaque, stringifiable)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier used to tag the scripted test context for this task
    pub fn test_id(&self) -> TestId {
        TestId::derive(self)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Name of a scripted test run.
///
/// The test harness only accepts ASCII alphanumerics and `_`, so every other
/// character of the task identity (hyphens in practice) becomes `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestId(String);

impl TestId {
    /// Derive the test identifier of a task: `my-task-1` -> `my_task_1`
    pub fn derive(task_id: &TaskId) -> Self {
        let name = task_id
            .as_str()
            .chars()
            .map(|c| if Self::is_allowed(c) { c } else { '_' })
            .collect();
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_allowed(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_replaces_hyphens() {
        let task_id = TaskId::new("my-task-1");
        assert_eq!(task_id.test_id().as_str(), "my_task_1");
    }

    #[test]
    fn test_id_replaces_other_disallowed_chars() {
        let task_id = TaskId::new("ingest.daily/2024-01-01");
        assert_eq!(task_id.test_id().as_str(), "ingest_daily_2024_01_01");
    }

    #[test]
    fn test_id_keeps_valid_names() {
        let task_id = TaskId::new("word_count");
        assert_eq!(task_id.test_id().as_str(), "word_count");
    }

    #[test]
    fn test_task_id_display() {
        assert_eq!(TaskId::from("a-b").to_string(), "a-b");
    }
}
