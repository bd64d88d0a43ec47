//! Collaborator contracts for the stack-management API
//!
//! Workflows only ever talk to the remote system through these traits.
//! `http` provides an implementation backed by a JSON endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::error::WorkflowError;
use crate::stack::{Stack, StackType};

pub mod http;
pub mod types;

pub use http::HttpStackClient;
pub use types::{ApiError, UpsertRequest};

/// Creates or updates a named stack; safe to repeat with identical input
#[async_trait]
pub trait StackUpserter: Send + Sync {
    async fn upsert_stack(&self, request: UpsertRequest) -> Result<(), ApiError>;
}

/// Fetches one snapshot of a stack, `None` when it does not exist
#[async_trait]
pub trait StackDescriber: Send + Sync {
    async fn describe_stack(&self, name: &str) -> Result<Option<Stack>, ApiError>;
}

#[async_trait]
impl<T: StackDescriber + ?Sized> StackDescriber for Arc<T> {
    async fn describe_stack(&self, name: &str) -> Result<Option<Stack>, ApiError> {
        (**self).describe_stack(name).await
    }
}

/// Blocks until a stack reaches a terminal status or is confirmed absent
#[async_trait]
pub trait StackWaiter: Send + Sync {
    async fn await_final_status(&self, name: &str) -> Result<Option<Stack>, WorkflowError>;
}

/// Lists current stack snapshots of a type
#[async_trait]
pub trait StackLister: Send + Sync {
    async fn list_stacks(&self, stack_type: StackType) -> Result<Vec<Stack>, ApiError>;
}

/// Requests deletion of a stack; deleting an absent stack is not an error
#[async_trait]
pub trait StackDeleter: Send + Sync {
    async fn delete_stack(&self, name: &str) -> Result<(), ApiError>;
}

/// Manages the permission rolesets workflows run under
#[async_trait]
pub trait RolesetManager: Send + Sync {
    async fn upsert_common_roleset(&self) -> Result<(), ApiError>;

    async fn get_common_roleset(&self) -> Result<HashMap<String, String>, ApiError>;

    async fn upsert_service_roleset(&self, environment: &str, service: &str)
        -> Result<(), ApiError>;

    async fn get_service_roleset(
        &self,
        environment: &str,
        service: &str,
    ) -> Result<HashMap<String, String>, ApiError>;

    async fn delete_environment_roleset(&self, environment: &str) -> Result<(), ApiError>;

    async fn delete_pipeline_roleset(&self, service: &str) -> Result<(), ApiError>;
}

/// Issues registry credentials for an image reference
#[async_trait]
pub trait RepositoryAuthenticator: Send + Sync {
    /// Base64 encoded `username:password`
    async fn authenticate_repository(&self, image: &str) -> Result<String, ApiError>;
}
