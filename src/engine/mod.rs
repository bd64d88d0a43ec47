//! Orchestration engine
//!
//! This module contains:
//! - `pipeline` - Executor contract and the pipeline composer
//! - `error` - Workflow error types
//! - `result` - Pipeline report types
//! - `tracker` - Stack lifecycle tracker (polling until terminal)

pub mod error;
pub mod pipeline;
pub mod result;
pub mod tracker;

pub use error::WorkflowError;
pub use pipeline::{executor, Executor, FailurePolicy, Pipeline, Step};
pub use result::{PipelineReport, StepFailure};
pub use tracker::{await_healthy, StackTracker, TrackerSettings, DEFAULT_POLL_INTERVAL};
