//! Pipeline result types

use crate::engine::error::WorkflowError;

/// A step that failed under a continuing pipeline
#[derive(Debug)]
pub struct StepFailure {
    pub step: String,
    pub index: usize,
    pub error: WorkflowError,
}

/// Outcome of a pipeline run
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Number of steps that were invoked
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<StepFailure>,
}

impl PipelineReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Names of the failed steps in invocation order
    pub fn failed_steps(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.step.as_str()).collect()
    }
}
