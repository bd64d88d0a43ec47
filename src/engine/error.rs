//! Workflow error types

use std::time::Duration;

use crate::client::ApiError;
use crate::workflow::config::ConfigError;

/// Errors that can occur while running a workflow step
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Unable to find stack '{name}' {context}")]
    StackNotFound { name: String, context: String },

    #[error("Stack '{name}' ended in failed status {status} {reason}")]
    UnhealthyStatus {
        name: String,
        status: String,
        reason: String,
    },

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid registry credentials: {0}")]
    Credentials(String),

    #[error("Timed out after {waited:?} waiting for stack '{name}'")]
    Timeout { name: String, waited: Duration },

    #[error("Cancelled while waiting for stack '{0}'")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    StepFailed(String),
}

impl WorkflowError {
    pub fn not_found(name: &str, context: impl Into<String>) -> Self {
        WorkflowError::StackNotFound {
            name: name.to_string(),
            context: context.into(),
        }
    }
}
