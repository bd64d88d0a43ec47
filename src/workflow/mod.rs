//! Workflows
//!
//! This module contains the workflows and what they share:
//! - `config` - Project configuration loaded from `stackflow.yml`
//! - `context` - Collaborators and configuration for one invocation
//! - `deploy` - Deploy a service into an environment
//! - `registry` - Registry credential encoding
//! - `terminate` - Stack and roleset terminators
//! - `purge` - Dependency-ordered teardown of everything the tool created

pub mod config;
pub mod context;
pub mod deploy;
pub mod purge;
pub mod registry;
pub mod terminate;

// Re-export all public types for convenience
pub use config::{resolve_environment, Config, ConfigError, EnvValue, ServiceConfig};
pub use context::Context;
pub use deploy::{DeployOutcome, DeployWorkflow};
pub use purge::{discover, render_table, PlannedStep, PurgePlan, PurgeSummary, PurgeWorkflow};
pub use registry::encode_registry_auth;
