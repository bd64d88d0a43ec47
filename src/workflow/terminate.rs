//! Terminators used by the purge plan
//!
//! Each one deletes stacks named by convention and waits for them to go
//! away. A stack that is already absent (or already deleted) is nothing to do.

use tracing::{debug, error, info};

use crate::engine::error::WorkflowError;
use crate::stack::{stack_name, StackStatus, StackType, TAG_ENVIRONMENT};
use crate::workflow::context::Context;

/// Delete `name` and wait until it is gone
pub async fn terminate_stack(ctx: &Context, name: &str) -> Result<(), WorkflowError> {
    let existing = ctx.waiter.await_final_status(name).await?;
    match existing {
        None => {
            debug!("Stack '{}' does not exist, nothing to terminate", name);
            return Ok(());
        }
        Some(stack) if stack.status == StackStatus::DeleteComplete => {
            debug!("Stack '{}' already deleted", name);
            return Ok(());
        }
        Some(_) => {}
    }

    info!("Terminating stack '{}'", name);
    ctx.deleter.delete_stack(name).await?;

    match ctx.waiter.await_final_status(name).await? {
        None => Ok(()),
        Some(stack) if stack.status == StackStatus::DeleteComplete => Ok(()),
        Some(stack) => Err(WorkflowError::UnhealthyStatus {
            name: stack.name,
            status: stack.status.to_string(),
            reason: stack.status_reason,
        }),
    }
}

/// Stack names a deployed service may occupy in one environment
pub fn service_stack_names(namespace: &str, service: &str, environment: &str) -> Vec<String> {
    [StackType::Service, StackType::Batch]
        .into_iter()
        .map(|stack_type| stack_name(namespace, stack_type, &[service, environment]))
        .collect()
}

pub async fn undeploy_service(
    ctx: &Context,
    service: &str,
    environment: &str,
) -> Result<(), WorkflowError> {
    info!("Undeploying service '{}' from '{}'", service, environment);
    for name in service_stack_names(ctx.namespace(), service, environment) {
        terminate_stack(ctx, &name).await?;
    }
    Ok(())
}

/// Terminate every stack of `stack_type` tagged with `environment`
///
/// Keeps going past individual failures and fails afterwards if any occurred.
pub async fn terminate_in_environment(
    ctx: &Context,
    stack_type: StackType,
    environment: &str,
) -> Result<(), WorkflowError> {
    let stacks = ctx.lister.list_stacks(stack_type).await?;
    let names: Vec<String> = stacks
        .into_iter()
        .filter(|stack| stack_type.matches(stack))
        .filter(|stack| stack.tag(TAG_ENVIRONMENT) == Some(environment))
        .map(|stack| stack.name)
        .collect();

    let mut failed = 0;
    for name in &names {
        if let Err(e) = terminate_stack(ctx, name).await {
            error!("Unable to terminate stack '{}': {}", name, e);
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(WorkflowError::StepFailed(format!(
            "{} of {} {} stacks in environment '{}' could not be terminated",
            failed,
            names.len(),
            stack_type,
            environment
        )));
    }
    Ok(())
}

/// Terminate an environment-scoped stack such as `{ns}-vpc-{env}`
pub async fn terminate_environment_stack(
    ctx: &Context,
    stack_type: StackType,
    environment: &str,
) -> Result<(), WorkflowError> {
    let name = stack_name(ctx.namespace(), stack_type, &[environment]);
    terminate_stack(ctx, &name).await
}

pub async fn terminate_environment_roleset(
    ctx: &Context,
    environment: &str,
) -> Result<(), WorkflowError> {
    info!("Deleting roleset for environment '{}'", environment);
    ctx.rolesets.delete_environment_roleset(environment).await?;
    Ok(())
}

pub async fn terminate_pipeline(ctx: &Context, service: &str) -> Result<(), WorkflowError> {
    let name = stack_name(ctx.namespace(), StackType::Pipeline, &[service]);
    terminate_stack(ctx, &name).await
}

pub async fn terminate_pipeline_roleset(ctx: &Context, service: &str) -> Result<(), WorkflowError> {
    info!("Deleting roleset for pipeline '{}'", service);
    ctx.rolesets.delete_pipeline_roleset(service).await?;
    Ok(())
}
