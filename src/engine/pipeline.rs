//! Pipeline composer - runs executors in order under a failure policy
//!
//! An [`Executor`] is a deferred, run-once unit of work. A [`Pipeline`]
//! invokes its executors strictly one after another:
//!
//! - [`FailurePolicy::Halt`] stops at the first error and returns it
//! - [`FailurePolicy::Continue`] runs every executor and reports failures
//!
//! ```rust
//! use stackflow::engine::{executor, Pipeline};
//!
//! # tokio_test::block_on(async {
//! let report = Pipeline::continuing()
//!     .step("first", executor(|| async { Ok(()) }))
//!     .step("second", executor(|| async { Ok(()) }))
//!     .run()
//!     .await
//!     .unwrap();
//! assert_eq!(report.attempted, 2);
//! # });
//! ```

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{error, info};

use crate::engine::error::WorkflowError;
use crate::engine::result::{PipelineReport, StepFailure};

/// A zero-argument unit of work that completes or fails
pub type Executor = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), WorkflowError>> + Send>;

/// Wrap an async closure as an [`Executor`]
pub fn executor<F, Fut>(f: F) -> Executor
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), WorkflowError>> + Send + 'static,
{
    Box::new(move || f().boxed())
}

/// What a pipeline does when a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop and return the failing step's error
    Halt,
    /// Log the failure and move on to the next step
    Continue,
}

/// A named executor
pub struct Step {
    pub name: String,
    pub run: Executor,
}

impl Step {
    pub fn new(name: impl Into<String>, run: Executor) -> Self {
        Self {
            name: name.into(),
            run,
        }
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

#[derive(Debug)]
pub struct Pipeline {
    policy: FailurePolicy,
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            steps: Vec::new(),
        }
    }

    /// Stop-on-error pipeline
    pub fn halting() -> Self {
        Self::new(FailurePolicy::Halt)
    }

    /// Continue-on-error pipeline
    pub fn continuing() -> Self {
        Self::new(FailurePolicy::Continue)
    }

    pub fn step(mut self, name: impl Into<String>, run: Executor) -> Self {
        self.steps.push(Step::new(name, run));
        self
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn extend(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// Run every step in order.
    ///
    /// Under `Halt` the first error is returned as-is. Under `Continue` this
    /// always returns `Ok` with the failures collected in the report.
    pub async fn run(self) -> Result<PipelineReport, WorkflowError> {
        let total = self.steps.len();
        let mut report = PipelineReport::default();

        for (index, step) in self.steps.into_iter().enumerate() {
            info!(step = %step.name, index = index + 1, total, "Running step");
            report.attempted += 1;

            match (step.run)().await {
                Ok(()) => report.succeeded += 1,
                Err(e) => match self.policy {
                    FailurePolicy::Halt => {
                        error!(step = %step.name, error = %e, "Step failed, halting pipeline");
                        return Err(e);
                    }
                    FailurePolicy::Continue => {
                        error!(step = %step.name, error = %e, "Step failed, continuing");
                        report.failures.push(StepFailure {
                            step: step.name,
                            index,
                            error: e,
                        });
                    }
                },
            }
        }

        Ok(report)
    }
}
