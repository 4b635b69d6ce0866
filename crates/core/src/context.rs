//! Per-invocation context supplied by the host runtime

use crate::{Result, StepError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use vaultstep_secrets::JobScope;

/// Append-only text log of the running job
pub trait LogSink: Send + Sync {
    /// Append one line
    fn println(&self, line: &str);
}

/// Sink that keeps lines in memory
#[derive(Debug, Default)]
pub struct BufferSink {
    lines: Mutex<Vec<String>>,
}

impl BufferSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written so far
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl LogSink for BufferSink {
    fn println(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// Everything the host hands to one step invocation
#[derive(Clone)]
pub struct StepContext {
    env: HashMap<String, String>,
    scope: JobScope,
    sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for StepContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("env", &self.env.len())
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl StepContext {
    /// Start building a context
    #[must_use]
    pub fn builder() -> StepContextBuilder {
        StepContextBuilder::default()
    }

    /// Job environment used for macro expansion
    #[must_use]
    pub const fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Job the step runs in
    #[must_use]
    pub const fn scope(&self) -> &JobScope {
        &self.scope
    }

    /// Write a line to the job log
    pub fn log(&self, line: &str) {
        self.sink.println(line);
    }
}

/// Builder for [`StepContext`]. A job scope and a log sink are required.
#[derive(Default)]
#[must_use]
pub struct StepContextBuilder {
    env: HashMap<String, String>,
    scope: Option<JobScope>,
    sink: Option<Arc<dyn LogSink>>,
}

impl StepContextBuilder {
    /// Replace the job environment
    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Add one environment variable
    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Current job
    pub fn scope(mut self, scope: JobScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Job log
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Finish building
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the job scope or log sink is missing.
    pub fn build(self) -> Result<StepContext> {
        let scope = self
            .scope
            .ok_or_else(|| StepError::configuration("step context requires the current job"))?;
        let sink = self
            .sink
            .ok_or_else(|| StepError::configuration("step context requires a log sink"))?;
        Ok(StepContext {
            env: self.env,
            scope,
            sink,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_scope_and_sink() {
        let err = StepContext::builder()
            .sink(Arc::new(BufferSink::new()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("current job"));

        let err = StepContext::builder()
            .scope(JobScope::new("job", "1"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("log sink"));
    }

    #[test]
    fn log_lines_reach_the_sink() {
        let sink = Arc::new(BufferSink::new());
        let ctx = StepContext::builder()
            .scope(JobScope::new("job", "1"))
            .sink(sink.clone())
            .var("A", "1")
            .build()
            .unwrap();

        ctx.log("first");
        ctx.log("second");
        assert_eq!(sink.lines(), vec!["first", "second"]);
        assert_eq!(ctx.env().get("A").map(String::as_str), Some("1"));
        assert_eq!(ctx.scope().job_name, "job");
    }

    #[test]
    fn debug_hides_environment_values() {
        let ctx = StepContext::builder()
            .scope(JobScope::new("job", "1"))
            .sink(Arc::new(BufferSink::new()))
            .var("TOKEN", "hvs.secret")
            .build()
            .unwrap();
        assert!(!format!("{ctx:?}").contains("hvs.secret"));
    }
}
