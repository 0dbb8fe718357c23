// Pipeline Options - backend configuration of a job

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Runner used when nothing else is configured
pub const DEFAULT_RUNNER: &str = "local";

/// Job name used when nothing else is configured
pub const DEFAULT_JOB_NAME: &str = "pipetask";

/// Environment variable prefix read by [`PipelineOptions::from_env`]
pub const ENV_PREFIX: &str = "PIPETASK_";

/// Backend options of a pipeline job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOptions {
    pub runner: String,
    pub job_name: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub temp_location: Option<String>,

    /// Runner-specific options not modelled above
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            runner: DEFAULT_RUNNER.to_string(),
            job_name: DEFAULT_JOB_NAME.to_string(),
            project: None,
            region: None,
            temp_location: None,
            extra: BTreeMap::new(),
        }
    }
}

impl PipelineOptions {
    /// Parse `--key=value` arguments on top of the defaults.
    ///
    /// Known keys accept both camelCase and snake_case spellings; anything
    /// else is kept in `extra`.
    ///
    /// # Example
    /// ```text
    /// let opts = PipelineOptions::from_args(["--runner=local", "--jobName=daily-wc"])?;
    /// ```
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        for arg in args {
            let arg = arg.as_ref();
            let body = arg.strip_prefix("--").ok_or_else(|| {
                DomainError::InvalidOption(format!("'{}' must start with '--'", arg))
            })?;
            let (key, value) = body.split_once('=').ok_or_else(|| {
                DomainError::InvalidOption(format!("'{}' must have the form --key=value", arg))
            })?;
            if key.is_empty() {
                return Err(DomainError::InvalidOption(format!("'{}' has an empty key", arg)));
            }
            options.set(key, value);
        }
        Ok(options)
    }

    /// Read `PIPETASK_*` variables from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build options from an arbitrary variable lookup (testable form of `from_env`)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(runner) = var("RUNNER") {
            options.runner = runner;
        }
        if let Some(job_name) = var("JOB_NAME") {
            options.job_name = job_name;
        }
        options.project = var("PROJECT");
        options.region = var("REGION");
        options.temp_location = var("TEMP_LOCATION");
        options
    }

    fn set(&mut self, key: &str, value: &str) {
        match key {
            "runner" => self.runner = value.to_string(),
            "jobName" | "job_name" => self.job_name = value.to_string(),
            "project" => self.project = Some(value.to_string()),
            "region" => self.region = Some(value.to_string()),
            "tempLocation" | "temp_location" => self.temp_location = Some(value.to_string()),
            _ => {
                self.extra.insert(key.to_string(), value.to_string());
            }
        }
    }

    /// Check the options before a context is built from them.
    ///
    /// Job names follow the usual managed-runner rule: lowercase ASCII letters,
    /// digits and hyphens, starting with a letter.
    pub fn validate(&self) -> Result<()> {
        if self.runner.trim().is_empty() {
            return Err(DomainError::ValidationError("runner cannot be empty".to_string()));
        }
        if self.job_name.is_empty() {
            return Err(DomainError::ValidationError("job name cannot be empty".to_string()));
        }
        if !self.job_name.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(DomainError::ValidationError(format!(
                "job name '{}' must start with a lowercase letter",
                self.job_name
            )));
        }
        if !self
            .job_name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(DomainError::ValidationError(format!(
                "job name '{}' may only contain lowercase letters, digits and '-'",
                self.job_name
            )));
        }
        Ok(())
    }
}
