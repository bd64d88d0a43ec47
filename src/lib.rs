//! # Stackflow
//!
//! Deploy and tear down cloud infrastructure stacks through ordered,
//! idempotent mutation pipelines.
//!
//! ## Features
//!
//! - **Pipelines** - Compose async steps that either halt on the first failure or run to the end
//! - **Lifecycle tracking** - Poll a stack until it settles, with timeout and cancellation
//! - **Deploy** - Register a service's batch job in an existing environment
//! - **Purge** - Tear down services, environments and pipelines in dependency order
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! use stackflow::{Config, Context, DeployWorkflow};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("stackflow.yml")?;
//!     let ctx = Context::http(config, Arc::new(AtomicBool::new(false)))?;
//!
//!     let outcome = DeployWorkflow::new(ctx, "acceptance", None).run().await?;
//!     println!("Deployed {}", outcome.deployed.stack.name);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod engine;
pub mod stack;
pub mod workflow;

// Re-export main types
pub use client::{ApiError, HttpStackClient, UpsertRequest};
pub use engine::{
    await_healthy, executor, Executor, FailurePolicy, Pipeline, PipelineReport, StackTracker,
    Step, StepFailure, TrackerSettings, WorkflowError,
};
pub use stack::{stack_name, Stack, StackStatus, StackType, StatusClass};
pub use workflow::{
    Config, ConfigError, Context, DeployOutcome, DeployWorkflow, EnvValue, PlannedStep, PurgePlan,
    PurgeSummary, PurgeWorkflow,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::{
        RepositoryAuthenticator, RolesetManager, StackDeleter, StackDescriber, StackLister,
        StackUpserter, StackWaiter,
    };
    pub use crate::engine::{executor, Executor, FailurePolicy, Pipeline, WorkflowError};
    pub use crate::stack::{Stack, StackStatus, StackType};
    pub use crate::workflow::{Config, Context, DeployWorkflow, PurgeWorkflow};
}
